use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input for {0}: {1}")]
    InvalidInput(String, String),

    #[error("Password hashing failed: {0}")]
    PasswordHash(#[from] bcrypt::BcryptError),
}

impl CoreError {
    pub(crate) fn invalid(field: &str, reason: &str) -> Self {
        CoreError::InvalidInput(field.to_string(), reason.to_string())
    }
}
