use crate::{assets::decode::LogoFetchError, encode::matrix::EncodeError};

/// Convenience result type used across qrbrand.
pub type QrBrandResult<T> = Result<T, QrBrandError>;

/// Top-level error taxonomy used by the rendering and serving APIs.
#[derive(thiserror::Error, Debug)]
pub enum QrBrandError {
    /// The payload exceeds the accepted length.
    #[error("payload too large: {len} characters (max {max})")]
    PayloadTooLarge {
        /// Payload length in characters.
        len: usize,
        /// Maximum accepted length in characters.
        max: usize,
    },

    /// The branding logo could not be obtained for this request.
    #[error("logo unavailable: {0}")]
    LogoUnavailable(#[source] LogoFetchError),

    /// The payload could not be encoded as a QR symbol.
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Invalid or missing configuration.
    #[error("config error: {0}")]
    Config(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl QrBrandError {
    /// Build a [`QrBrandError::PayloadTooLarge`] value.
    pub fn payload_too_large(len: usize, max: usize) -> Self {
        Self::PayloadTooLarge { len, max }
    }

    /// Build a [`QrBrandError::Config`] value.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// HTTP status code this error maps to at the service boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::PayloadTooLarge { .. } | Self::Encode(_) => 400,
            Self::LogoUnavailable(_) | Self::Config(_) | Self::Other(_) => 500,
        }
    }

    /// Client-facing message for the error response body.
    pub fn public_message(&self) -> &'static str {
        match self {
            Self::PayloadTooLarge { .. } => "URL is too long",
            Self::Encode(_) => "URL does not fit in a QR code",
            Self::LogoUnavailable(_) => "Logo image not available",
            Self::Config(_) | Self::Other(_) => "Internal Server Error",
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
