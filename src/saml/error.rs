use serde::Serialize;
use thiserror::Error;

use crate::dsig::DsigError;

/// Failure classes reported to callers of the verification pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    #[serde(rename = "CredentialError")]
    Credential,
    #[serde(rename = "DecodeError")]
    Decode,
    #[serde(rename = "ParseError")]
    Parse,
    #[serde(rename = "SignatureMissingError")]
    SignatureMissing,
    #[serde(rename = "SignatureInvalidError")]
    SignatureInvalid,
}

/// Error type of the verification pipeline.
///
/// The display text is the user-facing message; the payload, when present,
/// is the underlying detail.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Saml2Error {
    #[error("certificate required")]
    CertificateRequired,
    #[error("error building credential from certificate")]
    Credential(String),
    #[error("response is not valid base64")]
    Decode(String),
    #[error("response generation failed")]
    Parse(String),
    #[error("no signature found in response")]
    NoSignature,
    #[error("signature missing")]
    SignatureMissing(String),
    #[error("signature validation failed")]
    SignatureInvalid(String),
}

impl Saml2Error {
    pub fn kind(&self) -> ErrorKind {
        use Saml2Error::*;

        match self {
            CertificateRequired | Credential(_) => ErrorKind::Credential,
            Decode(_) => ErrorKind::Decode,
            Parse(_) => ErrorKind::Parse,
            NoSignature | SignatureMissing(_) => ErrorKind::SignatureMissing,
            SignatureInvalid(_) => ErrorKind::SignatureInvalid,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        use Saml2Error::*;

        match self {
            CertificateRequired | NoSignature => None,
            Credential(detail)
            | Decode(detail)
            | Parse(detail)
            | SignatureMissing(detail)
            | SignatureInvalid(detail) => Some(detail),
        }
    }

    /// The same error with its detail replaced. Variants without a detail
    /// are returned unchanged.
    pub fn with_detail(self, detail: impl Into<String>) -> Self {
        use Saml2Error::*;

        let detail = detail.into();
        match self {
            CertificateRequired => CertificateRequired,
            NoSignature => NoSignature,
            Credential(_) => Credential(detail),
            Decode(_) => Decode(detail),
            Parse(_) => Parse(detail),
            SignatureMissing(_) => SignatureMissing(detail),
            SignatureInvalid(_) => SignatureInvalid(detail),
        }
    }
}

impl From<base64::DecodeError> for Saml2Error {
    fn from(error: base64::DecodeError) -> Self {
        Saml2Error::Decode(error.to_string())
    }
}

impl From<DsigError> for Saml2Error {
    fn from(error: DsigError) -> Self {
        Saml2Error::SignatureInvalid(error.to_string())
    }
}

/// Errors raised while binding a parsed tree to the response model.
#[derive(Error, Debug)]
pub enum BindError {
    #[error("root element {0} is not a SAML2 protocol Response")]
    NotAResponse(String),
    #[error("{element} is missing the {attribute} attribute")]
    MissingAttribute {
        element: &'static str,
        attribute: &'static str,
    },
    #[error("invalid signature placement: {0}")]
    Signature(#[from] DsigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds_and_messages() {
        let cases = [
            (Saml2Error::CertificateRequired, ErrorKind::Credential, "certificate required"),
            (Saml2Error::Decode("x".into()), ErrorKind::Decode, "response is not valid base64"),
            (Saml2Error::Parse("x".into()), ErrorKind::Parse, "response generation failed"),
            (Saml2Error::NoSignature, ErrorKind::SignatureMissing, "no signature found in response"),
            (
                Saml2Error::SignatureInvalid("x".into()),
                ErrorKind::SignatureInvalid,
                "signature validation failed",
            ),
        ];
        for (error, kind, message) in cases {
            assert_eq!(error.kind(), kind);
            assert_eq!(error.to_string(), message);
        }
    }

    #[test]
    fn test_with_detail() {
        let error = Saml2Error::SignatureMissing("a".into()).with_detail("b");
        assert_eq!(error.detail(), Some("b"));
        assert_eq!(Saml2Error::NoSignature.with_detail("b").detail(), None);
    }

    #[test]
    fn test_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::SignatureInvalid).unwrap();
        assert_eq!(json, "\"SignatureInvalidError\"");
    }
}
