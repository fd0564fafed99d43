use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::{ErrorKind, Saml2Error};

/// Terminal artifact of one verification.
///
/// On failure only the raw input and the error descriptor are set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Saml2Result {
    is_valid: bool,
    response_raw: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_b64_decoded: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_b64_pretty_format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorDescriptor>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorDescriptor {
    pub kind: ErrorKind,
    pub message: String,
    pub detail: Option<String>,
    pub correlation_id: String,
}

impl ErrorDescriptor {
    pub fn from_error(error: &Saml2Error) -> Self {
        Self {
            kind: error.kind(),
            message: error.to_string(),
            detail: error.detail().map(str::to_owned),
            correlation_id: correlation_id(),
        }
    }
}

impl Saml2Result {
    pub fn success(raw: impl Into<String>, decoded: String, pretty: String) -> Self {
        Self {
            is_valid: true,
            response_raw: raw.into(),
            response_b64_decoded: Some(decoded),
            response_b64_pretty_format: Some(pretty),
            error: None,
        }
    }

    pub fn failure(raw: impl Into<String>, error: &Saml2Error) -> Self {
        Self {
            is_valid: false,
            response_raw: raw.into(),
            response_b64_decoded: None,
            response_b64_pretty_format: None,
            error: Some(ErrorDescriptor::from_error(error)),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn response_raw(&self) -> &str {
        &self.response_raw
    }

    pub fn response_b64_decoded(&self) -> Option<&str> {
        self.response_b64_decoded.as_deref()
    }

    pub fn response_b64_pretty_format(&self) -> Option<&str> {
        self.response_b64_pretty_format.as_deref()
    }

    pub fn error(&self) -> Option<&ErrorDescriptor> {
        self.error.as_ref()
    }
}

/// `<uuid v4>-<epoch millis>`
fn correlation_id() -> String {
    format!("{}-{}", Uuid::new_v4(), Utc::now().timestamp_millis())
}
