mod common;

use common::{Idp, assertion, encode, response};
use saml2_verifier::config::{Config, ValidationConfig};
use saml2_verifier::{Saml2Validator, VerificationRequest, verify};
use serde_json::Value;
use std::collections::HashMap;

fn json(result: &saml2_verifier::Saml2Result) -> Value {
    serde_json::to_value(result).unwrap()
}

#[test]
fn test_signed_response_is_valid() {
    let idp = Idp::new();
    let xml = response(&idp.sign(&assertion("_a1", "alice@example.org"), "_a1"));
    let encoded = encode(&xml);

    let result = verify(&idp.certificate, &encoded, false);
    let value = json(&result);

    assert_eq!(value["isValid"], true);
    assert_eq!(value["responseRaw"], encoded.as_str());
    assert_eq!(value["responseB64Decoded"], xml.as_str());
    assert!(value["responseB64PrettyFormat"]
        .as_str()
        .unwrap()
        .starts_with("<?xml"));
    assert!(value.get("error").is_none());
}

#[test]
fn test_hoisted_signature_needs_repair() {
    let idp = Idp::new();
    let signed = assertion("_a1", "alice@example.org");
    let signature = idp.signature(&signed, "_a1");
    let encoded = encode(&response(&format!("{signed}\n  {signature}")));

    let without = json(&verify(&idp.certificate, &encoded, false));
    assert_eq!(without["isValid"], false);
    assert_eq!(without["error"]["kind"], "SignatureMissingError");

    let with = json(&verify(&idp.certificate, &encoded, true));
    assert_eq!(with["isValid"], true, "{with}");
}

#[test]
fn test_untrusted_certificate() {
    let idp = Idp::new();
    let impostor = Idp::new();
    let encoded = encode(&response(&impostor.sign(&assertion("_a1", "alice@example.org"), "_a1")));

    let value = json(&verify(&idp.certificate, &encoded, false));

    assert_eq!(value["isValid"], false);
    assert_eq!(value["error"]["kind"], "SignatureInvalidError");
    assert_eq!(value["error"]["message"], "signature validation failed");
    assert!(value.get("responseB64Decoded").is_none());
}

#[test]
fn test_failure_shapes() {
    let idp = Idp::new();

    let cases = [
        (Vec::new(), "PHIvPg==".to_owned(), "CredentialError", "certificate required"),
        (
            b"garbage".to_vec(),
            "PHIvPg==".to_owned(),
            "CredentialError",
            "error building credential from certificate",
        ),
        (idp.certificate.clone(), "@@@".to_owned(), "DecodeError", "response is not valid base64"),
        (idp.certificate.clone(), encode("<r/>"), "ParseError", "response generation failed"),
        (
            idp.certificate.clone(),
            encode(&response("")),
            "SignatureMissingError",
            "no signature found in response",
        ),
    ];

    for (certificate, encoded, kind, message) in cases {
        let value = json(&verify(&certificate, &encoded, false));
        assert_eq!(value["isValid"], false);
        assert_eq!(value["responseRaw"], encoded.as_str());
        assert_eq!(value["error"]["kind"], kind);
        assert_eq!(value["error"]["message"], message);
        assert!(value["error"]["correlationId"].as_str().unwrap().len() > 36);
    }
}

#[test]
fn test_doctype_is_refused() {
    let idp = Idp::new();
    let signed = response(&idp.sign(&assertion("_a1", "alice@example.org"), "_a1"));
    assert_eq!(json(&verify(&idp.certificate, &encode(&signed), false))["isValid"], true);

    let body = signed.trim_start_matches("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    let xml = format!(
        "<!DOCTYPE samlp:Response [<!ENTITY xxe SYSTEM \"file:///etc/passwd\">]>\n{body}"
    );

    for repair in [false, true] {
        let value = json(&verify(&idp.certificate, &encode(&xml), repair));
        assert_eq!(value["isValid"], false);
        assert_eq!(value["error"]["kind"], "ParseError");
    }
}

#[test]
fn test_validator_from_config() {
    let idp = Idp::new();
    let mut overrides = HashMap::new();
    overrides.insert("validation.repair_before_parse".to_string(), "true".to_string());
    overrides.insert("validation.pretty_indent".to_string(), "4".to_string());
    let config = Config::load_with_sources(Some(overrides)).unwrap();

    let validator = Saml2Validator::new(config.validation);
    let signed = assertion("_a1", "alice@example.org");
    let encoded = encode(&response(&format!("{signed}{}", idp.signature(&signed, "_a1"))));
    let request = validator.request(encoded);

    let result = validator.validate(&idp.certificate, &request);

    assert!(result.is_valid());
    assert!(result
        .response_b64_pretty_format()
        .unwrap()
        .contains("\n    <saml:Issuer>"));
}

#[test]
fn test_explicit_request() {
    let idp = Idp::new();
    let encoded = encode(&response(&idp.sign(&assertion("_a1", "bob@example.org"), "_a1")));
    let validator = Saml2Validator::new(ValidationConfig::default());

    let result = validator.validate(&idp.certificate, &VerificationRequest::new(encoded, false));

    assert!(result.is_valid());
}
