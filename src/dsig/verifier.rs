use openssl::memcmp;
use openssl::pkey::{Id, PKey, Public};
use tracing::{debug, warn};

use super::c14n::{self, C14nMethod, method_from_uri};
use super::types::{Reference, SignatureElement};
use super::{DsigError, Result, SignedNode, algorithms};
use crate::crypto::{self, HashAlg};

/// Checks the enveloped signature of a [`SignedNode`] against a public key.
///
/// Implementations return `Ok(false)` for a cryptographically invalid
/// signature and an error for a signature they cannot process.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, node: &SignedNode, public_key: &PKey<Public>) -> Result<bool>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyType {
    Rsa,
    Ecdsa,
}

/// XML-DSig verifier restricted to the SAML signature profile: one
/// same-document reference to the signed element.
#[derive(Debug, Clone)]
pub struct XmlDsigVerifier {
    allow_sha1: bool,
}

impl XmlDsigVerifier {
    pub fn new(allow_sha1: bool) -> Self {
        Self { allow_sha1 }
    }

    fn digest_algorithm(&self, uri: &str) -> Result<HashAlg> {
        let hash_alg = match uri {
            algorithms::SHA1 => HashAlg::Sha1,
            algorithms::SHA256 => HashAlg::Sha256,
            algorithms::SHA384 => HashAlg::Sha384,
            algorithms::SHA512 => HashAlg::Sha512,
            _ => return Err(DsigError::UnsupportedAlgorithm(uri.to_owned())),
        };
        self.check_policy(uri, hash_alg)?;
        Ok(hash_alg)
    }

    fn signature_algorithm(&self, uri: &str) -> Result<(KeyType, HashAlg)> {
        let algorithm = match uri {
            algorithms::RSA_SHA1 => (KeyType::Rsa, HashAlg::Sha1),
            algorithms::RSA_SHA256 => (KeyType::Rsa, HashAlg::Sha256),
            algorithms::RSA_SHA384 => (KeyType::Rsa, HashAlg::Sha384),
            algorithms::RSA_SHA512 => (KeyType::Rsa, HashAlg::Sha512),
            algorithms::ECDSA_SHA256 => (KeyType::Ecdsa, HashAlg::Sha256),
            algorithms::ECDSA_SHA384 => (KeyType::Ecdsa, HashAlg::Sha384),
            algorithms::ECDSA_SHA512 => (KeyType::Ecdsa, HashAlg::Sha512),
            _ => return Err(DsigError::UnsupportedAlgorithm(uri.to_owned())),
        };
        self.check_policy(uri, algorithm.1)?;
        Ok(algorithm)
    }

    fn check_policy(&self, uri: &str, hash_alg: HashAlg) -> Result<()> {
        if hash_alg == HashAlg::Sha1 && !self.allow_sha1 {
            return Err(DsigError::DisallowedAlgorithm(uri.to_owned()));
        }
        Ok(())
    }

    /// Recompute the digest of the referenced element and compare it with
    /// `DigestValue`.
    fn check_reference(&self, node: &SignedNode, reference: &Reference) -> Result<bool> {
        check_reference_uri(node, reference)?;

        let mut exclude_signature = false;
        let mut method = C14nMethod::Inclusive;
        let mut inclusive_prefixes: &[String] = &[];
        for transform in &reference.transforms {
            if transform.algorithm == algorithms::ENVELOPED_SIGNATURE {
                exclude_signature = true;
            } else {
                method = method_from_uri(&transform.algorithm)?;
                inclusive_prefixes = &transform.inclusive_prefixes;
            }
        }

        let excluded = if exclude_signature {
            node.signature()
        } else {
            None
        };
        let canonical = c14n::canonicalize(
            node.element(),
            node.inherited(),
            method,
            inclusive_prefixes,
            excluded,
        )?;

        let hash_alg = self.digest_algorithm(&reference.digest_method)?;
        let digest = hash_alg.hash(canonical.as_bytes())?;
        let matches = reference.digest_value.len() == hash_alg.output_size()
            && memcmp::eq(&digest, &reference.digest_value);
        if !matches {
            warn!(
                "Digest mismatch for {}: expected {}, computed {}",
                node.element().local_name(),
                hex::encode(&reference.digest_value),
                hex::encode(&digest)
            );
        }
        Ok(matches)
    }
}

impl Default for XmlDsigVerifier {
    fn default() -> Self {
        Self::new(true)
    }
}

impl SignatureVerifier for XmlDsigVerifier {
    fn verify(&self, node: &SignedNode, public_key: &PKey<Public>) -> Result<bool> {
        let signature_element = node
            .signature()
            .ok_or_else(|| DsigError::MissingElement("Signature".into()))?;
        let signature = SignatureElement::bind(signature_element)?;
        let info = &signature.signed_info;

        let [reference] = info.references.as_slice() else {
            return Err(DsigError::InvalidReference(format!(
                "expected exactly one Reference, found {}",
                info.references.len()
            )));
        };

        // Resolve both algorithms before any digest work so that policy and
        // key-type errors surface even for tampered documents.
        let (key_type, hash_alg) = self.signature_algorithm(&info.signature_method)?;
        check_key_type(public_key, key_type)?;
        let method = method_from_uri(&info.canonicalization_method.algorithm)?;

        if !self.check_reference(node, reference)? {
            return Ok(false);
        }

        let scope = node
            .inherited()
            .nested(node.element())
            .nested(signature_element);
        let canonical_info = c14n::canonicalize(
            signature.signed_info_element,
            &scope,
            method,
            &info.canonicalization_method.inclusive_prefixes,
            None,
        )?;

        let signature_value = match key_type {
            KeyType::Rsa => signature.signature_value,
            KeyType::Ecdsa => crypto::ecdsa_raw_to_der(&signature.signature_value)?,
        };
        let valid = crypto::verify(public_key, hash_alg, canonical_info, signature_value)?;
        debug!(
            "SignatureValue check for {} with {}: {}",
            node.element().local_name(),
            hash_alg,
            if valid { "valid" } else { "invalid" }
        );
        Ok(valid)
    }
}

/// Only same-document references to the signed element itself are accepted.
fn check_reference_uri(node: &SignedNode, reference: &Reference) -> Result<()> {
    let uri = reference.uri.as_deref().unwrap_or("");
    if uri.is_empty() {
        // An empty URI designates the whole document
        if node.is_document_element() {
            return Ok(());
        }
        return Err(DsigError::InvalidReference(format!(
            "empty URI refers to the whole document, not the signed {}",
            node.element().local_name()
        )));
    }
    match (uri.strip_prefix('#'), node.reference_id()) {
        (Some(fragment), Some(id)) if fragment == id => Ok(()),
        _ => Err(DsigError::InvalidReference(format!(
            "URI {uri} does not point at the signed {} (ID {})",
            node.element().local_name(),
            node.reference_id().unwrap_or("absent")
        ))),
    }
}

fn check_key_type(public_key: &PKey<Public>, key_type: KeyType) -> Result<()> {
    let matches = match key_type {
        KeyType::Rsa => public_key.id() == Id::RSA,
        KeyType::Ecdsa => public_key.id() == Id::EC,
    };
    if matches {
        Ok(())
    } else {
        Err(DsigError::Invalid(format!(
            "{key_type:?} signature cannot be checked with a {:?} key",
            public_key.id()
        )))
    }
}
