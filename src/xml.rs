//! Namespace-aware XML tree used by the repair, binding and signature layers.
//!
//! Documents are parsed with `quick-xml` into an owned tree so that nodes can be
//! moved between parents and serialized back. Any `<!DOCTYPE` is refused, which
//! rules out DTD fetching and custom entity expansion; only the predefined
//! entities and character references are resolved.

mod document;
mod error;
mod escape;
mod pretty;

pub use document::{Attribute, Document, Element, Namespaces, Node, XML_NAMESPACE};
pub use error::XmlError;
pub use escape::{escape_attribute_value, escape_text};
pub use pretty::{IndentPrinter, PrettyPrinter};

pub type Result<T> = std::result::Result<T, XmlError>;
