#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AppError {
    #[error("invalid_input - {0}")]
    InvalidInput(String),
    #[error("invalid_data - {0}")]
    InvalidData(String),
    /// A recurrence descriptor that does not name any known shape.
    #[error("invalid_frequency - {0}")]
    InvalidFrequency(String),
    #[error("io_error - {0}")]
    Io(String),
    /// The ledger backend could not be reached or refused the request.
    #[error("unavailable - {0}")]
    Unavailable(String),
}

impl AppError {
    pub fn invalid_input<M: Into<String>>(message: M) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn invalid_data<M: Into<String>>(message: M) -> Self {
        Self::InvalidData(message.into())
    }

    pub fn invalid_frequency<M: Into<String>>(message: M) -> Self {
        Self::InvalidFrequency(message.into())
    }

    pub fn io<M: Into<String>>(message: M) -> Self {
        Self::Io(message.into())
    }

    pub fn unavailable<M: Into<String>>(message: M) -> Self {
        Self::Unavailable(message.into())
    }

    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::InvalidData(_) => "invalid_data",
            Self::InvalidFrequency(_) => "invalid_frequency",
            Self::Io(_) => "io_error",
            Self::Unavailable(_) => "unavailable",
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Self::InvalidInput(message)
            | Self::InvalidData(message)
            | Self::InvalidFrequency(message)
            | Self::Io(message)
            | Self::Unavailable(message) => message,
        }
    }

    /// Failures a caller may retry by re-issuing the same gesture.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io(_) | Self::Unavailable(_))
    }
}
