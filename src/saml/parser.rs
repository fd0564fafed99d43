use tracing::{debug, warn};

use super::error::BindError;
use super::model::{Assertion, Attribute, EncryptedAssertion, ParsedResponse, Status};
use super::{Result, Saml2Error, ns};
use crate::dsig::SignedNode;
use crate::xml::{Document, Element, Namespaces};

/// Parse decoded response bytes into the response model.
///
/// The XML layer refuses DOCTYPE declarations, so no DTD is read and no
/// entity beyond the predefined ones is expanded.
pub fn parse(bytes: &[u8]) -> Result<ParsedResponse> {
    let document = Document::parse(bytes).map_err(|e| Saml2Error::Parse(e.to_string()))?;
    let response = bind(&document).map_err(|e| Saml2Error::Parse(e.to_string()))?;
    debug!(
        "Parsed response {} with {} assertion(s), {} encrypted",
        response.id,
        response.assertions.len(),
        response.encrypted_assertions.len()
    );
    Ok(response)
}

/// Bind a document rooted at `samlp:Response` to [`ParsedResponse`].
///
/// Only direct children are considered for signatures and assertions. A
/// response-level signature whose references point elsewhere is left
/// unbound: it belongs to an assertion, not to the response.
pub fn bind(document: &Document) -> std::result::Result<ParsedResponse, BindError> {
    let root = document.root();
    if !root.is(ns::PROTOCOL, "Response") {
        return Err(BindError::NotAResponse(root.name().to_owned()));
    }

    let signature = match SignedNode::locate_document_element(root)? {
        Some(node) if node.is_misplaced() => {
            warn!("Ignoring response-level Signature that references another element");
            None
        }
        other => other,
    };

    let scope = Namespaces::new().nested(root);
    let assertions = root
        .child_elements()
        .filter(|child| child.is(ns::ASSERTION, "Assertion"))
        .map(|assertion| bind_assertion(assertion, &scope))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let encrypted_assertions = root
        .child_elements()
        .filter(|child| child.is(ns::ASSERTION, "EncryptedAssertion"))
        .map(bind_encrypted_assertion)
        .collect();

    Ok(ParsedResponse {
        id: required_attribute(root, "Response", "ID")?,
        version: root.attribute("Version").map(str::to_owned),
        issue_instant: root.attribute("IssueInstant").map(str::to_owned),
        destination: root.attribute("Destination").map(str::to_owned),
        in_response_to: root.attribute("InResponseTo").map(str::to_owned),
        issuer: child_text(root, ns::ASSERTION, "Issuer"),
        status: root.find_child(ns::PROTOCOL, "Status").map(bind_status),
        signature,
        assertions,
        encrypted_assertions,
    })
}

fn bind_assertion(
    assertion: &Element,
    inherited: &Namespaces,
) -> std::result::Result<Assertion, BindError> {
    let subject_name_id = assertion
        .find_child(ns::ASSERTION, "Subject")
        .and_then(|subject| child_text(subject, ns::ASSERTION, "NameID"));

    let attributes = assertion
        .child_elements()
        .filter(|child| child.is(ns::ASSERTION, "AttributeStatement"))
        .flat_map(|statement| statement.child_elements())
        .filter(|child| child.is(ns::ASSERTION, "Attribute"))
        .map(|attribute| Attribute {
            name: attribute.attribute("Name").unwrap_or_default().to_owned(),
            values: attribute
                .child_elements()
                .filter(|value| value.is(ns::ASSERTION, "AttributeValue"))
                .map(|value| value.text())
                .collect(),
        })
        .collect();

    Ok(Assertion {
        id: required_attribute(assertion, "Assertion", "ID")?,
        issue_instant: assertion.attribute("IssueInstant").map(str::to_owned),
        issuer: child_text(assertion, ns::ASSERTION, "Issuer"),
        subject_name_id,
        attributes,
        signature: SignedNode::locate(assertion, inherited)?,
    })
}

fn bind_encrypted_assertion(element: &Element) -> EncryptedAssertion {
    let encryption_algorithm = element
        .find_child(ns::XMLENC, "EncryptedData")
        .and_then(|data| data.find_child(ns::XMLENC, "EncryptionMethod"))
        .and_then(|method| method.attribute("Algorithm"))
        .map(str::to_owned);
    EncryptedAssertion {
        encryption_algorithm,
    }
}

fn bind_status(status: &Element) -> Status {
    Status {
        code: status
            .find_child(ns::PROTOCOL, "StatusCode")
            .and_then(|code| code.attribute("Value"))
            .map(str::to_owned),
        message: child_text(status, ns::PROTOCOL, "StatusMessage"),
    }
}

fn child_text(parent: &Element, namespace: &str, local_name: &str) -> Option<String> {
    parent
        .find_child(namespace, local_name)
        .map(|child| child.text().trim().to_owned())
}

fn required_attribute(
    element: &Element,
    element_name: &'static str,
    attribute: &'static str,
) -> std::result::Result<String, BindError> {
    element
        .attribute(attribute)
        .map(str::to_owned)
        .ok_or(BindError::MissingAttribute {
            element: element_name,
            attribute,
        })
}
