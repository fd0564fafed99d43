mod errors;

pub use errors::Error;

use errors::CryptoResult;
use openssl::bn::BigNum;
use openssl::ecdsa::EcdsaSig;
use openssl::hash::{Hasher, MessageDigest as Digest};
use openssl::pkey::{PKey, Public};
use openssl::sign::Verifier;
use std::fmt;
use std::sync::OnceLock;

static INIT: OnceLock<()> = OnceLock::new();

/// One-time initialization of the OpenSSL library. Safe to call from any
/// number of threads; only the first call does work.
pub fn ensure_initialized() {
    let _ = INIT.get_or_init(|| {
        openssl::init();
        tracing::debug!("OpenSSL initialized");
    });
}

/// Hash algorithms used by XML signatures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlg {
    /// SHA-1
    Sha1,
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl HashAlg {
    /// Hash the given data with this hash algorithm
    pub fn hash(&self, data: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
        let mut hasher = Hasher::new(self.into())?;
        hasher.update(data.as_ref())?;
        Ok(hasher.finish()?.to_vec())
    }

    /// Get the output size in bytes
    pub fn output_size(self) -> usize {
        match self {
            HashAlg::Sha1 => 20,
            HashAlg::Sha256 => 32,
            HashAlg::Sha384 => 48,
            HashAlg::Sha512 => 64,
        }
    }
}

impl From<&HashAlg> for Digest {
    fn from(hash_alg: &HashAlg) -> Self {
        match hash_alg {
            HashAlg::Sha1 => Digest::sha1(),
            HashAlg::Sha256 => Digest::sha256(),
            HashAlg::Sha384 => Digest::sha384(),
            HashAlg::Sha512 => Digest::sha512(),
        }
    }
}

impl fmt::Display for HashAlg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlg::Sha1 => "SHA-1",
            HashAlg::Sha256 => "SHA-256",
            HashAlg::Sha384 => "SHA-384",
            HashAlg::Sha512 => "SHA-512",
        };
        write!(f, "{name}")
    }
}

/// Verify `signature` over `data` with `public_key`.
///
/// Returns `Ok(false)` when the signature does not match; errors are reserved
/// for keys or signatures OpenSSL cannot process at all.
pub fn verify(
    public_key: &PKey<Public>,
    hash_alg: HashAlg,
    data: impl AsRef<[u8]>,
    signature: impl AsRef<[u8]>,
) -> CryptoResult<bool> {
    let mut verifier = Verifier::new((&hash_alg).into(), public_key)?;
    verifier.update(data.as_ref())?;
    Ok(verifier.verify(signature.as_ref())?)
}

/// Convert an XML-DSig ECDSA signature value (`r || s`, fixed width) to DER.
pub fn ecdsa_raw_to_der(raw: impl AsRef<[u8]>) -> CryptoResult<Vec<u8>> {
    let raw = raw.as_ref();
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(Error::Invalid(format!(
            "ECDSA signature value has odd or zero length: {}",
            raw.len()
        )));
    }
    let (r, s) = raw.split_at(raw.len() / 2);
    let signature = EcdsaSig::from_private_components(BigNum::from_slice(r)?, BigNum::from_slice(s)?)?;
    Ok(signature.to_der()?)
}
