use quick_xml::Writer;
use quick_xml::events::{BytesDecl, Event};

use super::{Document, Result};

/// Cosmetic reformatting of XML text for diagnostics.
pub trait PrettyPrinter: Send + Sync {
    fn format(&self, xml: &str) -> Result<String>;
}

/// Re-indents a document, dropping whitespace-only text nodes. The XML
/// declaration is kept only when the input starts with one.
#[derive(Debug, Clone)]
pub struct IndentPrinter {
    indent: usize,
}

impl IndentPrinter {
    pub fn new(indent: usize) -> Self {
        Self { indent }
    }
}

impl Default for IndentPrinter {
    fn default() -> Self {
        Self::new(2)
    }
}

impl PrettyPrinter for IndentPrinter {
    fn format(&self, xml: &str) -> Result<String> {
        let document = Document::parse(xml.as_bytes())?;
        let mut writer = Writer::new_with_indent(Vec::new(), b' ', self.indent);
        if xml.starts_with("<?xml") {
            writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
        }
        document.root().write_node(&mut writer, true)?;
        Ok(String::from_utf8(writer.into_inner())?)
    }
}
