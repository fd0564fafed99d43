pub mod config;
pub mod credential;
pub mod crypto;
pub mod dsig;
pub mod saml;
pub mod telemetry;
pub mod xml;

#[cfg(test)]
mod test_fixtures;

pub use saml::{Saml2Result, Saml2Validator, VerificationRequest, verify};
