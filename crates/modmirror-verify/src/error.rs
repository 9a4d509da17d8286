#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("invalid digest '{input}': expected {expected} hex characters")]
    InvalidLength { input: String, expected: usize },

    #[error("invalid digest '{input}': {source}")]
    InvalidHex {
        input: String,
        #[source]
        source: hex::FromHexError,
    },
}

pub type Result<T> = std::result::Result<T, VerifyError>;
