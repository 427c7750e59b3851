/// Validation errors raised while turning caller input into domain types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The amount was missing, malformed or not strictly positive.
    #[error("Invalid amount '{0}': expected a positive decimal number")]
    InvalidAmount(String),

    /// The currency code was missing or malformed.
    #[error("Invalid currency '{0}': expected 3 to 10 ASCII letters or digits")]
    InvalidCurrency(String),

    /// The access duration was zero or negative.
    #[error("Invalid access duration {0}: expected a positive number of hours")]
    InvalidDuration(i64),

    /// The resource id could not be parsed.
    #[error("Invalid resource id '{0}'")]
    InvalidResourceId(String),
}

/// A specialized `Result` type for paywall core operations.
pub type Result<T> = std::result::Result<T, Error>;
