pub mod client;
pub mod credentials;
pub mod error;
pub mod logging;
#[cfg(test)]
pub mod mock_client;
pub mod request;
pub mod stream;

pub use client::{ApiClient, ByteStream};
pub use credentials::{CredentialSource, EnvCredentials, StaticCredentials, API_KEY_NAME};
pub use error::CompletionError;
