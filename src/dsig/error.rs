use thiserror::Error;

use crate::xml::XmlError;

#[derive(Debug, Error)]
pub enum DsigError {
    #[error("XML processing error: {0}")]
    Xml(#[from] XmlError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] crate::crypto::Error),

    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("missing required element: {0}")]
    MissingElement(String),

    #[error("missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("algorithm disabled by policy: {0}")]
    DisallowedAlgorithm(String),

    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("Invalid data: {0}")]
    Invalid(String),
}
