use crate::dsig::SignedNode;

/// A `samlp:Response` bound from its XML tree. Read-only after parsing.
#[derive(Debug, Clone)]
pub struct ParsedResponse {
    pub id: String,
    pub version: Option<String>,
    pub issue_instant: Option<String>,
    pub destination: Option<String>,
    pub in_response_to: Option<String>,
    pub issuer: Option<String>,
    pub status: Option<Status>,
    pub signature: Option<SignedNode>,
    pub assertions: Vec<Assertion>,
    pub encrypted_assertions: Vec<EncryptedAssertion>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    pub code: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Assertion {
    pub id: String,
    pub issue_instant: Option<String>,
    pub issuer: Option<String>,
    pub subject_name_id: Option<String>,
    pub attributes: Vec<Attribute>,
    pub signature: Option<SignedNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub values: Vec<String>,
}

/// Placeholder for an assertion that is never decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedAssertion {
    pub encryption_algorithm: Option<String>,
}
