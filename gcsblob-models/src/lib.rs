pub mod config;
pub mod error;
pub mod sign_action;

pub use config::{Config, CredentialsSource, EncryptionKey, StorageClass};
pub use error::Error;
pub use sign_action::SignAction;
