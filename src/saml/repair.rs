//! Best-effort fix for a signature hoisted out of its assertion.
//!
//! Some identity providers emit the assertion's `ds:Signature` as a sibling
//! of `saml:Assertion` under the response root. [`repair`] moves the first
//! such signature back to the end of the first root-level assertion and
//! leaves every other document untouched.

use tracing::{debug, warn};

use super::ns;
use crate::dsig::ns as dsig_ns;
use crate::xml::{Document, XmlError};

/// Outcome of one repair attempt, kept for logging.
#[derive(Debug, PartialEq, Eq)]
enum Repair {
    Relocated(Vec<u8>),
    Unchanged(&'static str),
}

/// Re-parent a misplaced root-level `Signature` into the first root-level
/// `Assertion`. Returns `decoded` unchanged when there is nothing to repair
/// or the document cannot be repaired.
pub fn repair(decoded: &[u8]) -> Vec<u8> {
    match relocate_signature(decoded) {
        Ok(Repair::Relocated(repaired)) => {
            debug!("Relocated root-level Signature into Assertion");
            repaired
        }
        Ok(Repair::Unchanged(reason)) => {
            debug!("Repair skipped: {reason}");
            decoded.to_vec()
        }
        Err(e) => {
            warn!("Repair skipped, document kept as received: {e}");
            decoded.to_vec()
        }
    }
}

fn relocate_signature(decoded: &[u8]) -> Result<Repair, XmlError> {
    let mut document = Document::parse(decoded)?;
    let root = document.root_mut();

    let Some(signature_index) = root.position_of_child(dsig_ns::DS, "Signature") else {
        return Ok(Repair::Unchanged("no root-level Signature"));
    };
    let already_signed = root
        .find_child(ns::ASSERTION, "Assertion")
        .is_some_and(|assertion| assertion.find_child(dsig_ns::DS, "Signature").is_some());
    if already_signed {
        return Ok(Repair::Unchanged("first Assertion already carries a Signature"));
    }

    let Some(signature) = root.remove_child(signature_index) else {
        return Ok(Repair::Unchanged("Signature could not be detached"));
    };
    let Some(assertion_index) = root.position_of_child(ns::ASSERTION, "Assertion") else {
        // Dropping the detached signature here would lose content
        return Ok(Repair::Unchanged("no root-level Assertion"));
    };
    let Some(assertion) = root.child_element_mut(assertion_index) else {
        return Ok(Repair::Unchanged("no root-level Assertion"));
    };
    assertion.append_child(signature);

    Ok(Repair::Relocated(root.to_xml_string()?.into_bytes()))
}
