//! Key material and signed SAML documents for unit tests.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use openssl::asn1::Asn1Time;
use openssl::bn::BigNum;
use openssl::ec::{EcGroup, EcKey};
use openssl::ecdsa::EcdsaSig;
use openssl::hash::MessageDigest;
use openssl::nid::Nid;
use openssl::pkey::{PKey, Private};
use openssl::rsa::Rsa;
use openssl::sign::Signer;
use openssl::x509::{X509, X509NameBuilder};

use crate::dsig::c14n::{self, C14nMethod};
use crate::dsig::{algorithms, ns};
use crate::xml::{Document, Namespaces};

pub const PROTOCOL_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";
pub const ASSERTION_NS: &str = "urn:oasis:names:tc:SAML:2.0:assertion";

pub struct TestSigner {
    key: PKey<Private>,
    certificate: X509,
    ecdsa: bool,
}

impl TestSigner {
    pub fn rsa() -> Self {
        let key = PKey::from_rsa(Rsa::generate(2048).unwrap()).unwrap();
        Self::with_key(key, false)
    }

    pub fn ecdsa() -> Self {
        let group = EcGroup::from_curve_name(Nid::X9_62_PRIME256V1).unwrap();
        let key = PKey::from_ec_key(EcKey::generate(&group).unwrap()).unwrap();
        Self::with_key(key, true)
    }

    fn with_key(key: PKey<Private>, ecdsa: bool) -> Self {
        let mut name = X509NameBuilder::new().unwrap();
        name.append_entry_by_text("CN", "idp.example.com").unwrap();
        let name = name.build();

        let mut builder = X509::builder().unwrap();
        builder.set_version(2).unwrap();
        let serial = BigNum::from_u32(4242).unwrap().to_asn1_integer().unwrap();
        builder.set_serial_number(&serial).unwrap();
        builder.set_subject_name(&name).unwrap();
        builder.set_issuer_name(&name).unwrap();
        builder.set_pubkey(&key).unwrap();
        builder
            .set_not_before(&Asn1Time::days_from_now(0).unwrap())
            .unwrap();
        builder
            .set_not_after(&Asn1Time::days_from_now(365).unwrap())
            .unwrap();
        builder.sign(&key, MessageDigest::sha256()).unwrap();

        Self {
            key,
            certificate: builder.build(),
            ecdsa,
        }
    }

    pub fn certificate_der(&self) -> Vec<u8> {
        self.certificate.to_der().unwrap()
    }

    pub fn certificate_pem(&self) -> Vec<u8> {
        self.certificate.to_pem().unwrap()
    }

    /// Enveloped `ds:Signature` over the standalone element `xml`, whose
    /// `ID` is `id`.
    pub fn signature_for(&self, xml: &str, id: &str) -> String {
        self.signature_with_uri(xml, &format!("#{id}"))
    }

    /// Enveloped `ds:Signature` over `xml` with an arbitrary reference URI.
    pub fn signature_with_uri(&self, xml: &str, uri: &str) -> String {
        let document = Document::parse(xml.as_bytes()).unwrap();
        let canonical = c14n::canonicalize(
            document.root(),
            &Namespaces::new(),
            C14nMethod::Exclusive,
            &[],
            None,
        )
        .unwrap();
        let digest = openssl::hash::hash(MessageDigest::sha256(), canonical.as_bytes()).unwrap();

        let signature_method = if self.ecdsa {
            algorithms::ECDSA_SHA256
        } else {
            algorithms::RSA_SHA256
        };
        let signed_info = format!(
            concat!(
                r#"<ds:SignedInfo xmlns:ds="{ds}">"#,
                r#"<ds:CanonicalizationMethod Algorithm="{exc}"/>"#,
                r#"<ds:SignatureMethod Algorithm="{method}"/>"#,
                r#"<ds:Reference URI="{uri}">"#,
                r#"<ds:Transforms>"#,
                r#"<ds:Transform Algorithm="{enveloped}"/>"#,
                r#"<ds:Transform Algorithm="{exc}"/>"#,
                r#"</ds:Transforms>"#,
                r#"<ds:DigestMethod Algorithm="{sha256}"/>"#,
                r#"<ds:DigestValue>{digest}</ds:DigestValue>"#,
                r#"</ds:Reference>"#,
                r#"</ds:SignedInfo>"#
            ),
            ds = ns::DS,
            exc = algorithms::EXCLUSIVE_C14N,
            method = signature_method,
            uri = uri,
            enveloped = algorithms::ENVELOPED_SIGNATURE,
            sha256 = algorithms::SHA256,
            digest = BASE64.encode(digest),
        );

        let info_document = Document::parse(signed_info.as_bytes()).unwrap();
        let canonical_info = c14n::canonicalize(
            info_document.root(),
            &Namespaces::new(),
            C14nMethod::Exclusive,
            &[],
            None,
        )
        .unwrap();

        let mut signer = Signer::new(MessageDigest::sha256(), &self.key).unwrap();
        signer.update(canonical_info.as_bytes()).unwrap();
        let mut value = signer.sign_to_vec().unwrap();
        if self.ecdsa {
            let parsed = EcdsaSig::from_der(&value).unwrap();
            value = parsed.r().to_vec_padded(32).unwrap();
            value.extend(parsed.s().to_vec_padded(32).unwrap());
        }

        format!(
            r#"<ds:Signature xmlns:ds="{}">{signed_info}<ds:SignatureValue>{}</ds:SignatureValue></ds:Signature>"#,
            ns::DS,
            BASE64.encode(value)
        )
    }

    /// `xml` with its own signature appended as the last child of its root.
    pub fn sign(&self, xml: &str, id: &str) -> String {
        insert_before_close(xml, &self.signature_for(xml, id))
    }
}

pub fn assertion(id: &str, subject: &str) -> String {
    format!(
        concat!(
            r#"<saml:Assertion xmlns:saml="{ns}" ID="{id}" Version="2.0" IssueInstant="2024-05-01T10:00:00Z">"#,
            r#"<saml:Issuer>https://idp.example.com</saml:Issuer>"#,
            r#"<saml:Subject><saml:NameID>{subject}</saml:NameID></saml:Subject>"#,
            r#"<saml:AttributeStatement>"#,
            r#"<saml:Attribute Name="role"><saml:AttributeValue>admin</saml:AttributeValue><saml:AttributeValue>user</saml:AttributeValue></saml:Attribute>"#,
            r#"</saml:AttributeStatement>"#,
            r#"</saml:Assertion>"#
        ),
        ns = ASSERTION_NS,
        id = id,
        subject = subject,
    )
}

pub fn response(body: &str) -> String {
    format!(
        concat!(
            r#"<samlp:Response xmlns:samlp="{p}" xmlns:saml="{a}" ID="_r1" Version="2.0" "#,
            r#"IssueInstant="2024-05-01T10:00:00Z" Destination="https://sp.example.com/acs" InResponseTo="_req1">"#,
            r#"<saml:Issuer>https://idp.example.com</saml:Issuer>"#,
            r#"<samlp:Status><samlp:StatusCode Value="urn:oasis:names:tc:SAML:2.0:status:Success"/></samlp:Status>"#,
            r#"{body}"#,
            r#"</samlp:Response>"#
        ),
        p = PROTOCOL_NS,
        a = ASSERTION_NS,
        body = body,
    )
}

/// A response whose assertion signature sits next to the assertion instead
/// of inside it.
pub fn hoisted_response(signer: &TestSigner) -> String {
    let assertion = assertion("_a1", "alice@example.com");
    let signature = signer.signature_for(&assertion, "_a1");
    response(&format!("{assertion}{signature}"))
}

pub fn signed_response(signer: &TestSigner) -> String {
    response(&signer.sign(&assertion("_a1", "alice@example.com"), "_a1"))
}

pub fn encode(xml: &str) -> String {
    BASE64.encode(xml)
}

fn insert_before_close(xml: &str, fragment: &str) -> String {
    let close = xml.rfind("</").unwrap();
    format!("{}{fragment}{}", &xml[..close], &xml[close..])
}
