/// Errors raised while building a provider client from configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing provider setting '{0}'")]
    Missing(&'static str),

    #[error("Invalid provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Invalid header value for '{0}'")]
    InvalidHeader(&'static str),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}
