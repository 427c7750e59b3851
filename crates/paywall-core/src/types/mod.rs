mod amount;
mod common;
mod grant;
mod invoice;

pub use amount::*;
pub use common::*;
pub use grant::*;
pub use invoice::*;

pub type AnyJson = serde_json::Value;
