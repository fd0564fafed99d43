use super::{DsigError, Result, ns};
use crate::xml::{Element, Namespaces};

const ID_ATTRIBUTE: &str = "ID";

/// An element carrying an enveloped `ds:Signature` as a direct child.
///
/// The element is an owned copy detached from its document, so the namespace
/// bindings in scope at its parent travel with it for canonicalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedNode {
    element: Element,
    signature_index: usize,
    inherited: Namespaces,
    document_element: bool,
}

impl SignedNode {
    /// Pair `element` with its direct `ds:Signature` child.
    ///
    /// Returns `Ok(None)` when the element is unsigned and an error when it
    /// carries more than one signature.
    pub fn locate(element: &Element, inherited: &Namespaces) -> Result<Option<Self>> {
        Self::find(element, inherited, false)
    }

    /// Like [`SignedNode::locate`], for the document element itself.
    pub fn locate_document_element(root: &Element) -> Result<Option<Self>> {
        Self::find(root, &Namespaces::new(), true)
    }

    fn find(
        element: &Element,
        inherited: &Namespaces,
        document_element: bool,
    ) -> Result<Option<Self>> {
        let mut positions = element
            .children()
            .iter()
            .enumerate()
            .filter(|(_, node)| {
                node.as_element()
                    .is_some_and(|child| child.is(ns::DS, "Signature"))
            })
            .map(|(index, _)| index);

        let Some(signature_index) = positions.next() else {
            return Ok(None);
        };
        if positions.next().is_some() {
            return Err(DsigError::Invalid(format!(
                "{} carries more than one Signature",
                element.local_name()
            )));
        }

        Ok(Some(Self {
            element: element.clone(),
            signature_index,
            inherited: inherited.clone(),
            document_element,
        }))
    }

    /// The signed element, signature included.
    pub fn element(&self) -> &Element {
        &self.element
    }

    pub fn signature(&self) -> Option<&Element> {
        self.element.child_element(self.signature_index)
    }

    /// Namespace bindings in scope at the signed element's parent.
    pub fn inherited(&self) -> &Namespaces {
        &self.inherited
    }

    /// Whether the signed element is the root of its document, the only
    /// element an empty reference URI may designate.
    pub fn is_document_element(&self) -> bool {
        self.document_element
    }

    /// Value of the signed element's `ID` attribute.
    pub fn reference_id(&self) -> Option<&str> {
        self.element.attribute(ID_ATTRIBUTE)
    }

    /// Whether the signature's references all point at some other element,
    /// which is how a signature hoisted out of its assertion looks.
    ///
    /// Signatures without readable references are not considered misplaced;
    /// the verifier reports those.
    pub fn is_misplaced(&self) -> bool {
        let uris: Vec<&str> = self
            .signature()
            .and_then(|signature| signature.find_child(ns::DS, "SignedInfo"))
            .map(|info| {
                info.child_elements()
                    .filter(|child| child.is(ns::DS, "Reference"))
                    .map(|reference| reference.attribute("URI").unwrap_or(""))
                    .collect()
            })
            .unwrap_or_default();

        !uris.is_empty()
            && uris.iter().all(|uri| {
                !uri.is_empty() && uri.strip_prefix('#') != self.reference_id()
            })
    }
}
