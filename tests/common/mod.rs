#![allow(dead_code)]

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use openssl::asn1::Asn1Time;
use openssl::hash::MessageDigest;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::sign::Signer;
use openssl::x509::{X509, X509NameBuilder};
use saml2_verifier::dsig::c14n::{C14nMethod, canonicalize};
use saml2_verifier::dsig::{algorithms, ns};
use saml2_verifier::xml::{Document, Namespaces};

pub struct Idp {
    key: PKey<Private>,
    pub certificate: Vec<u8>,
}

impl Idp {
    pub fn new() -> Self {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();

        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "Test IdP").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(30).unwrap())
            .unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();

        Self {
            key,
            certificate: builder.build().to_pem().unwrap(),
        }
    }

    /// Enveloped RSA-SHA256 signature over the standalone element `xml`.
    pub fn signature(&self, xml: &str, id: &str) -> String {
        let digest = openssl::hash::hash(MessageDigest::sha256(), exclusive_c14n(xml).as_bytes())
            .unwrap();
        let signed_info = format!(
            "<ds:SignedInfo xmlns:ds=\"{ds}\">\
             <ds:CanonicalizationMethod Algorithm=\"{exc}\"/>\
             <ds:SignatureMethod Algorithm=\"{rsa}\"/>\
             <ds:Reference URI=\"#{id}\">\
             <ds:Transforms>\
             <ds:Transform Algorithm=\"{enveloped}\"/>\
             <ds:Transform Algorithm=\"{exc}\"/>\
             </ds:Transforms>\
             <ds:DigestMethod Algorithm=\"{sha256}\"/>\
             <ds:DigestValue>{digest}</ds:DigestValue>\
             </ds:Reference>\
             </ds:SignedInfo>",
            ds = ns::DS,
            exc = algorithms::EXCLUSIVE_C14N,
            rsa = algorithms::RSA_SHA256,
            enveloped = algorithms::ENVELOPED_SIGNATURE,
            sha256 = algorithms::SHA256,
            digest = BASE64.encode(digest),
        );

        let mut signer = Signer::new(MessageDigest::sha256(), &self.key).unwrap();
        signer
            .update(exclusive_c14n(&signed_info).as_bytes())
            .unwrap();
        let value = BASE64.encode(signer.sign_to_vec().unwrap());

        format!(
            "<ds:Signature xmlns:ds=\"{}\">{signed_info}<ds:SignatureValue>{value}</ds:SignatureValue></ds:Signature>",
            ns::DS
        )
    }

    /// `xml` with its signature appended as the last child of the root.
    pub fn sign(&self, xml: &str, id: &str) -> String {
        let signature = self.signature(xml, id);
        let close = xml.rfind("</").unwrap();
        format!("{}{signature}{}", &xml[..close], &xml[close..])
    }
}

fn exclusive_c14n(xml: &str) -> String {
    let document = Document::parse(xml.as_bytes()).unwrap();
    canonicalize(
        document.root(),
        &Namespaces::new(),
        C14nMethod::Exclusive,
        &[],
        None,
    )
    .unwrap()
}

pub fn assertion(id: &str, subject: &str) -> String {
    format!(
        "<saml:Assertion xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" ID=\"{id}\" \
         Version=\"2.0\" IssueInstant=\"2024-05-01T10:00:00Z\">\
         <saml:Issuer>https://idp.example.org</saml:Issuer>\
         <saml:Subject><saml:NameID>{subject}</saml:NameID></saml:Subject>\
         </saml:Assertion>"
    )
}

/// Response around `body`, pretty-printed the way identity providers often
/// send it.
pub fn response(body: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <samlp:Response xmlns:samlp=\"urn:oasis:names:tc:SAML:2.0:protocol\" \
         xmlns:saml=\"urn:oasis:names:tc:SAML:2.0:assertion\" ID=\"_resp\" Version=\"2.0\" \
         IssueInstant=\"2024-05-01T10:00:00Z\">\n  \
         <saml:Issuer>https://idp.example.org</saml:Issuer>\n  \
         <samlp:Status>\n    \
         <samlp:StatusCode Value=\"urn:oasis:names:tc:SAML:2.0:status:Success\"/>\n  \
         </samlp:Status>\n  \
         {body}\n\
         </samlp:Response>\n"
    )
}

/// Base64 with line breaks every 76 characters, as in the HTTP-POST binding.
pub fn encode(xml: &str) -> String {
    BASE64
        .encode(xml)
        .as_bytes()
        .chunks(76)
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect::<Vec<_>>()
        .join("\r\n")
}
