//! Typed view of a `ds:Signature` element.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;

use super::c14n::parse_prefix_list;
use super::{DsigError, Result, ns};
use crate::xml::Element;

const ALGORITHM_ATTRIBUTE: &str = "Algorithm";
const URI_ATTRIBUTE: &str = "URI";
const PREFIX_LIST_ATTRIBUTE: &str = "PrefixList";

/// Any `Algorithm`-carrying element of a signature, with the optional
/// `InclusiveNamespaces` prefix list of exclusive canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transform {
    pub algorithm: String,
    pub inclusive_prefixes: Vec<String>,
}

pub type CanonicalizationMethod = Transform;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub uri: Option<String>,
    pub transforms: Vec<Transform>,
    pub digest_method: String,
    pub digest_value: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedInfo {
    pub canonicalization_method: CanonicalizationMethod,
    pub signature_method: String,
    pub references: Vec<Reference>,
}

/// A bound `ds:Signature`: the raw `SignedInfo` element (needed for
/// canonicalization) next to its typed form and the decoded signature value.
#[derive(Debug, Clone)]
pub struct SignatureElement<'a> {
    pub signed_info_element: &'a Element,
    pub signed_info: SignedInfo,
    pub signature_value: Vec<u8>,
}

impl<'a> SignatureElement<'a> {
    pub fn bind(signature: &'a Element) -> Result<Self> {
        if !signature.is(ns::DS, "Signature") {
            return Err(DsigError::MissingElement("Signature".into()));
        }

        let signed_info_element = required_child(signature, "SignedInfo")?;
        let signature_value = decode_base64_text(required_child(signature, "SignatureValue")?)?;

        let canonicalization_method =
            bind_transform(required_child(signed_info_element, "CanonicalizationMethod")?)?;
        let signature_method = required_algorithm(required_child(signed_info_element, "SignatureMethod")?)?;

        let references = signed_info_element
            .child_elements()
            .filter(|child| child.is(ns::DS, "Reference"))
            .map(bind_reference)
            .collect::<Result<Vec<_>>>()?;
        if references.is_empty() {
            return Err(DsigError::MissingElement("Reference".into()));
        }

        Ok(Self {
            signed_info_element,
            signed_info: SignedInfo {
                canonicalization_method,
                signature_method,
                references,
            },
            signature_value,
        })
    }
}

fn bind_reference(reference: &Element) -> Result<Reference> {
    let transforms = match reference.find_child(ns::DS, "Transforms") {
        Some(transforms) => transforms
            .child_elements()
            .filter(|child| child.is(ns::DS, "Transform"))
            .map(bind_transform)
            .collect::<Result<Vec<_>>>()?,
        None => Vec::new(),
    };

    Ok(Reference {
        uri: reference.attribute(URI_ATTRIBUTE).map(str::to_owned),
        transforms,
        digest_method: required_algorithm(required_child(reference, "DigestMethod")?)?,
        digest_value: decode_base64_text(required_child(reference, "DigestValue")?)?,
    })
}

fn bind_transform(element: &Element) -> Result<Transform> {
    let inclusive_prefixes = element
        .find_child(ns::EXC_C14N, "InclusiveNamespaces")
        .and_then(|inclusive| inclusive.attribute(PREFIX_LIST_ATTRIBUTE))
        .map(parse_prefix_list)
        .unwrap_or_default();

    Ok(Transform {
        algorithm: required_algorithm(element)?,
        inclusive_prefixes,
    })
}

fn required_child<'a>(parent: &'a Element, local_name: &str) -> Result<&'a Element> {
    parent
        .find_child(ns::DS, local_name)
        .ok_or_else(|| DsigError::MissingElement(local_name.to_owned()))
}

fn required_algorithm(element: &Element) -> Result<String> {
    element
        .attribute(ALGORITHM_ATTRIBUTE)
        .map(str::to_owned)
        .ok_or_else(|| {
            DsigError::MissingAttribute(format!("{}@{ALGORITHM_ATTRIBUTE}", element.local_name()))
        })
}

/// Base64 element content, tolerating the line breaks signers insert.
fn decode_base64_text(element: &Element) -> Result<Vec<u8>> {
    let compact: String = element
        .text()
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(BASE64.decode(compact)?)
}
