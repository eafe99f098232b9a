use thiserror::Error;

/// Failure talking to the energy-certificate registry. The resolver never surfaces these to its
/// callers; each one ends the strategy that raised it.
#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Registry request could not be completed: {0}")]
    Transport(String),
    #[error("Registry responded with status {status}")]
    UnexpectedStatus { status: u16 },
    #[error("Registry payload could not be parsed: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Registry holds no certificate for record key {0}")]
    CertificateNotFound(String),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration could not be parsed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Configuration is invalid: {0}")]
    Invalid(String),
}
