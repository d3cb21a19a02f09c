use miette::Diagnostic;
use thiserror::Error;

#[derive(Diagnostic, Debug, Error)]
#[diagnostic()]
pub enum SyncError {
    #[error("network channel is not connected")]
    #[diagnostic(code(sync_error::not_connected))]
    NotConnected,
    #[error("malformed message payload")]
    #[diagnostic(code(sync_error::malformed))]
    Malformed(#[from] serde_json::Error),
    #[error("override sync has {keys} keys but {values} values")]
    #[diagnostic(code(sync_error::length_mismatch))]
    LengthMismatch { keys: usize, values: usize },
    #[error("host channel failed to send: {0}")]
    #[diagnostic(code(sync_error::send))]
    Send(String),
}

#[derive(Diagnostic, Debug, Error)]
#[diagnostic()]
pub enum ConfigError {
    #[error("failed to read client config")]
    #[diagnostic(code(config_error::read))]
    Read(#[source] std::io::Error),
    #[error("failed to parse client config")]
    #[diagnostic(code(config_error::parse))]
    Parse(#[source] serde_json::Error),
    #[error("failed to serialize client config")]
    #[diagnostic(code(config_error::serialize))]
    Serialize(#[source] serde_json::Error),
    #[error("failed to write client config")]
    #[diagnostic(code(config_error::write))]
    Write(#[source] std::io::Error),
}
