//! Verification credential built from a trusted X.509 certificate.

use openssl::pkey::{PKey, Public};
use x509_parser::pem::parse_x509_pem;
use x509_parser::prelude::*;

use crate::crypto::HashAlg;
use crate::saml::Saml2Error;

const PEM_MARKER: &[u8] = b"-----BEGIN";

/// Public key of a certificate plus the metadata worth logging about it.
#[derive(Debug, Clone)]
pub struct Credential {
    public_key: PKey<Public>,
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    /// Hex SHA-256 of the DER encoding
    pub fingerprint: String,
}

impl Credential {
    /// Build a credential from DER or PEM certificate bytes.
    pub fn from_bytes(certificate: impl AsRef<[u8]>) -> Result<Self, Saml2Error> {
        let bytes = certificate.as_ref();
        if bytes.is_empty() {
            return Err(Saml2Error::CertificateRequired);
        }

        let der = if is_pem(bytes) {
            let (_, pem) =
                parse_x509_pem(bytes).map_err(|e| Saml2Error::Credential(e.to_string()))?;
            pem.contents
        } else {
            bytes.to_vec()
        };
        Self::from_der(&der)
    }

    fn from_der(der: &[u8]) -> Result<Self, Saml2Error> {
        let (_, cert) =
            X509Certificate::from_der(der).map_err(|e| Saml2Error::Credential(e.to_string()))?;

        let public_key = PKey::public_key_from_der(cert.tbs_certificate.subject_pki.raw)
            .map_err(|e| Saml2Error::Credential(e.to_string()))?;
        let fingerprint = HashAlg::Sha256
            .hash(der)
            .map_err(|e| Saml2Error::Credential(e.to_string()))?;

        Ok(Self {
            public_key,
            subject: cert.subject().to_string(),
            issuer: cert.issuer().to_string(),
            serial_number: cert.tbs_certificate.serial.to_string(),
            fingerprint: hex::encode(fingerprint),
        })
    }

    pub fn public_key(&self) -> &PKey<Public> {
        &self.public_key
    }
}

fn is_pem(bytes: &[u8]) -> bool {
    bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .is_some_and(|start| bytes[start..].starts_with(PEM_MARKER))
}
