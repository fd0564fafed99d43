use std::fmt;

use tracing::{debug, info};

use super::ParsedResponse;
use crate::dsig::SignedNode;

/// Where a signature sits inside a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureLocation {
    Response,
    /// Index into [`ParsedResponse::assertions`]
    Assertion(usize),
}

impl fmt::Display for SignatureLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SignatureLocation::Response => write!(f, "response"),
            SignatureLocation::Assertion(index) => write!(f, "assertion[{index}]"),
        }
    }
}

/// One signature to verify, borrowed from the response it was found in.
#[derive(Debug, Clone, Copy)]
pub struct SignatureRef<'a> {
    pub location: SignatureLocation,
    pub node: Option<&'a SignedNode>,
}

/// Collect the response signature first, then every signed assertion in
/// document order. Unsigned assertions are skipped and encrypted assertions
/// are never walked; an empty result is not an error here.
pub fn collect(response: &ParsedResponse) -> Vec<SignatureRef<'_>> {
    let root = response.signature.as_ref().map(|node| SignatureRef {
        location: SignatureLocation::Response,
        node: Some(node),
    });

    let assertions = response
        .assertions
        .iter()
        .enumerate()
        .filter_map(|(index, assertion)| {
            assertion.signature.as_ref().map(|node| SignatureRef {
                location: SignatureLocation::Assertion(index),
                node: Some(node),
            })
        });

    let refs: Vec<_> = root.into_iter().chain(assertions).collect();

    if !response.encrypted_assertions.is_empty() {
        info!(
            "{} encrypted assertion(s) present, not verified",
            response.encrypted_assertions.len()
        );
    }
    debug!("Collected {} signature(s)", refs.len());
    refs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::saml::parser::parse;
    use crate::test_fixtures::{TestSigner, assertion, response};

    fn locations(refs: &[SignatureRef<'_>]) -> Vec<SignatureLocation> {
        refs.iter().map(|r| r.location).collect()
    }

    #[test]
    fn test_order_and_skipping() {
        let signer = TestSigner::rsa();
        let body = format!(
            "{}{}{}",
            signer.sign(&assertion("_a1", "alice"), "_a1"),
            assertion("_a2", "bob"),
            signer.sign(&assertion("_a3", "carol"), "_a3"),
        );
        let xml = signer.sign(&response(&body), "_r1");
        let parsed = parse(xml.as_bytes()).unwrap();
        let refs = collect(&parsed);

        assert_eq!(
            locations(&refs),
            vec![
                SignatureLocation::Response,
                SignatureLocation::Assertion(0),
                SignatureLocation::Assertion(2),
            ]
        );
        assert!(refs.iter().all(|r| r.node.is_some()));
    }

    #[test]
    fn test_unsigned_response_is_empty() {
        let parsed = parse(response(&assertion("_a1", "alice")).as_bytes()).unwrap();
        assert!(collect(&parsed).is_empty());

        let parsed = parse(response("").as_bytes()).unwrap();
        assert!(collect(&parsed).is_empty());
    }

    #[test]
    fn test_location_display() {
        assert_eq!(SignatureLocation::Response.to_string(), "response");
        assert_eq!(SignatureLocation::Assertion(3).to_string(), "assertion[3]");
    }
}
