use std::collections::{BTreeMap, BTreeSet};

use crate::dsig::{DsigError, Result, algorithms};
use crate::xml::{Element, Namespaces, Node, XML_NAMESPACE, escape_attribute_value, escape_text};

/// Canonicalization methods understood by the verifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum C14nMethod {
    Inclusive,
    InclusiveWithComments,
    Exclusive,
    ExclusiveWithComments,
}

impl C14nMethod {
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            algorithms::C14N => Some(Self::Inclusive),
            algorithms::C14N_WITH_COMMENTS => Some(Self::InclusiveWithComments),
            algorithms::EXCLUSIVE_C14N => Some(Self::Exclusive),
            algorithms::EXCLUSIVE_C14N_WITH_COMMENTS => Some(Self::ExclusiveWithComments),
            _ => None,
        }
    }

    pub fn is_exclusive(self) -> bool {
        matches!(self, Self::Exclusive | Self::ExclusiveWithComments)
    }

    pub fn with_comments(self) -> bool {
        matches!(self, Self::InclusiveWithComments | Self::ExclusiveWithComments)
    }
}

/// Canonicalize the subtree rooted at `apex`.
///
/// `inherited` holds the namespace bindings in scope at the apex's parent.
/// `inclusive_prefixes` is the `InclusiveNamespaces PrefixList` of exclusive
/// canonicalization (`""` stands for the default namespace). `excluded` is
/// left out of the output together with its subtree (enveloped-signature
/// transform); it is matched by identity.
pub fn canonicalize(
    apex: &Element,
    inherited: &Namespaces,
    method: C14nMethod,
    inclusive_prefixes: &[String],
    excluded: Option<&Element>,
) -> Result<String> {
    let mut canonicalizer = Canonicalizer {
        method,
        inclusive_prefixes,
        excluded,
        out: String::new(),
    };
    canonicalizer.element(apex, inherited, &BTreeMap::new())?;
    Ok(canonicalizer.out)
}

struct Canonicalizer<'a> {
    method: C14nMethod,
    inclusive_prefixes: &'a [String],
    excluded: Option<&'a Element>,
    out: String,
}

impl Canonicalizer<'_> {
    fn element(
        &mut self,
        element: &Element,
        parent_declared: &Namespaces,
        parent_rendered: &BTreeMap<String, String>,
    ) -> Result<()> {
        let declared = parent_declared.nested(element);

        let regular_attrs: Vec<_> = element
            .attributes()
            .iter()
            .filter(|attribute| attribute.declared_prefix().is_none())
            .collect();

        // Prefixes whose declarations are candidates for output
        let mut candidates = BTreeSet::new();
        if self.method.is_exclusive() {
            candidates.insert(element.prefix().unwrap_or("").to_owned());
            for attribute in &regular_attrs {
                if let Some(prefix) = attribute.prefix() {
                    candidates.insert(prefix.to_owned());
                }
            }
            for prefix in self.inclusive_prefixes {
                if prefix.is_empty() || declared.get(prefix).is_some() {
                    candidates.insert(prefix.clone());
                }
            }
        } else {
            candidates.insert(String::new());
            candidates.extend(declared.iter().map(|(prefix, _)| prefix.to_owned()));
        }

        // Compute which namespace declarations to render
        let mut render_ns = Vec::new();
        for prefix in &candidates {
            if prefix == "xml" {
                continue;
            }
            let rendered = parent_rendered.get(prefix).map(String::as_str);
            if prefix.is_empty() {
                // xmlns="" is only emitted to undo a rendered default namespace
                let current = declared.get("").unwrap_or("");
                if current != rendered.unwrap_or("") {
                    render_ns.push((prefix.clone(), current.to_owned()));
                }
            } else if let Some(current) = declared.get(prefix) {
                if rendered != Some(current) {
                    render_ns.push((prefix.clone(), current.to_owned()));
                }
            }
        }

        let mut tag = format!("<{}", element.name());
        for (prefix, uri) in &render_ns {
            if prefix.is_empty() {
                tag.push_str(" xmlns=\"");
            } else {
                tag.push_str(&format!(" xmlns:{prefix}=\""));
            }
            tag.push_str(&escape_attribute_value(uri));
            tag.push('"');
        }

        // Attributes sort by namespace URI, then local name
        let mut attr_info = Vec::with_capacity(regular_attrs.len());
        for attribute in regular_attrs {
            let namespace = match attribute.prefix() {
                Some("xml") => XML_NAMESPACE,
                Some(prefix) => declared.get(prefix).unwrap_or_default(),
                None => "",
            };
            attr_info.push((namespace, attribute.local_name(), attribute));
        }
        attr_info.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));

        for (_, _, attribute) in attr_info {
            tag.push(' ');
            tag.push_str(&attribute.name);
            tag.push_str("=\"");
            tag.push_str(&escape_attribute_value(&attribute.value));
            tag.push('"');
        }
        tag.push('>');
        self.out.push_str(&tag);

        let mut rendered = parent_rendered.clone();
        for (prefix, uri) in render_ns {
            rendered.insert(prefix, uri);
        }

        for child in element.children() {
            match child {
                Node::Element(child) => {
                    if self
                        .excluded
                        .is_some_and(|excluded| std::ptr::eq(excluded, child))
                    {
                        continue;
                    }
                    self.element(child, &declared, &rendered)?;
                }
                Node::Text(text) | Node::CData(text) => self.out.push_str(&escape_text(text)),
                Node::Comment(comment) => {
                    if self.method.with_comments() {
                        self.out.push_str(&format!("<!--{comment}-->"));
                    }
                }
                Node::ProcessingInstruction(content) => {
                    self.out.push_str(&format!("<?{content}?>"));
                }
            }
        }

        self.out.push_str(&format!("</{}>", element.name()));
        Ok(())
    }
}

/// Parse a `PrefixList` attribute value; `#default` names the default namespace.
pub fn parse_prefix_list(value: &str) -> Vec<String> {
    value
        .split_whitespace()
        .map(|prefix| {
            if prefix == "#default" {
                String::new()
            } else {
                prefix.to_owned()
            }
        })
        .collect()
}

pub(crate) fn method_from_uri(uri: &str) -> Result<C14nMethod> {
    C14nMethod::from_uri(uri).ok_or_else(|| DsigError::UnsupportedAlgorithm(uri.to_owned()))
}
