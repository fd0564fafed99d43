//! SAML2 response signature verification pipeline.
//!
//! `Decode -> (optional) Repair -> Parse -> Walk -> Verify -> Result`
//!
//! Every stage failure is mapped to a [`Saml2Error`] and surfaces as a failed
//! [`Saml2Result`]; nothing escapes [`verify`] as an error.

pub mod decoder;
mod error;
pub mod model;
pub mod parser;
pub mod repair;
mod result;
mod validator;
pub mod verifier;
pub mod walker;

pub use error::{BindError, ErrorKind, Saml2Error};
pub use model::ParsedResponse;
pub use result::{ErrorDescriptor, Saml2Result};
pub use validator::{Saml2Validator, VerificationRequest, verify};
pub use verifier::{VerificationOutcome, VerificationStatus};
pub use walker::{SignatureLocation, SignatureRef};

pub type Result<T> = std::result::Result<T, Saml2Error>;

// Namespaces
pub mod ns {
    pub const PROTOCOL: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
    pub const ASSERTION: &str = "urn:oasis:names:tc:SAML:2.0:assertion";
    pub const XMLENC: &str = "http://www.w3.org/2001/04/xmlenc#";
}
