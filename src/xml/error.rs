use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("XML parsing error: {0}")]
    Parse(#[from] quick_xml::Error),

    #[error("XML attribute error: {0}")]
    Attribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("XML escape error: {0}")]
    Escape(#[from] quick_xml::escape::EscapeError),

    #[error("DOCTYPE declarations are not allowed")]
    DoctypeForbidden,

    #[error("unbound namespace prefix: {0}")]
    UnboundPrefix(String),

    #[error("invalid XML structure: {0}")]
    Structure(String),

    #[error("UTF-8 error: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<std::string::FromUtf8Error> for XmlError {
    fn from(err: std::string::FromUtf8Error) -> Self {
        XmlError::Utf8(err.utf8_error())
    }
}
