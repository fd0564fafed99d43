use tracing::{debug, warn};

use super::{Saml2Error, SignatureLocation, SignatureRef};
use crate::credential::Credential;
use crate::dsig::SignatureVerifier;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Verified,
    Failed(Saml2Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub location: SignatureLocation,
    pub status: VerificationStatus,
}

impl VerificationOutcome {
    pub fn is_verified(&self) -> bool {
        self.status == VerificationStatus::Verified
    }
}

/// Verify every collected signature in order.
///
/// A failing signature does not stop the others from being checked, so the
/// outcomes always cover every ref.
pub fn verify(
    refs: &[SignatureRef<'_>],
    credential: &Credential,
    verifier: &dyn SignatureVerifier,
) -> Vec<VerificationOutcome> {
    refs.iter()
        .map(|signature_ref| {
            let status = check(signature_ref, credential, verifier);
            match &status {
                VerificationStatus::Verified => {
                    debug!("Signature at {} verified", signature_ref.location)
                }
                VerificationStatus::Failed(e) => warn!(
                    "Signature at {} failed: {e} ({})",
                    signature_ref.location,
                    e.detail().unwrap_or_default()
                ),
            }
            VerificationOutcome {
                location: signature_ref.location,
                status,
            }
        })
        .collect()
}

fn check(
    signature_ref: &SignatureRef<'_>,
    credential: &Credential,
    verifier: &dyn SignatureVerifier,
) -> VerificationStatus {
    let Some(node) = signature_ref.node else {
        return VerificationStatus::Failed(Saml2Error::SignatureMissing(format!(
            "no signature node at {}",
            signature_ref.location
        )));
    };
    match verifier.verify(node, credential.public_key()) {
        Ok(true) => VerificationStatus::Verified,
        Ok(false) => VerificationStatus::Failed(Saml2Error::SignatureInvalid(
            "signature does not match the certificate key".into(),
        )),
        Err(e) => VerificationStatus::Failed(e.into()),
    }
}

/// True when there was at least one signature and all of them verified.
pub fn overall_pass(outcomes: &[VerificationOutcome]) -> bool {
    !outcomes.is_empty() && outcomes.iter().all(VerificationOutcome::is_verified)
}

/// Fold the outcomes into the error to report, if any.
///
/// The first failure decides kind and message; the detail lists every
/// failed location with its reason.
pub fn aggregate(outcomes: &[VerificationOutcome]) -> Option<Saml2Error> {
    if outcomes.is_empty() {
        return Some(Saml2Error::NoSignature);
    }

    let failures: Vec<(SignatureLocation, &Saml2Error)> = outcomes
        .iter()
        .filter_map(|outcome| match &outcome.status {
            VerificationStatus::Failed(e) => Some((outcome.location, e)),
            VerificationStatus::Verified => None,
        })
        .collect();
    let (_, first) = failures.first()?;

    let detail = failures
        .iter()
        .map(|(location, e)| match e.detail() {
            Some(detail) => format!("{location}: {detail}"),
            None => format!("{location}: {e}"),
        })
        .collect::<Vec<_>>()
        .join("; ");
    Some((*first).clone().with_detail(detail))
}
