use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid capability name: {0}")]
    InvalidCapabilityName(String),

    #[error("Validation error: {0}")]
    Validation(String),
}
