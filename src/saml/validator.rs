use std::fmt;
use std::sync::Arc;

use tracing::{debug, debug_span, info, warn};

use super::{Result, Saml2Error, Saml2Result, decoder, parser, verifier, walker};
use crate::config::ValidationConfig;
use crate::credential::Credential;
use crate::crypto;
use crate::dsig::{SignatureVerifier, XmlDsigVerifier};
use crate::xml::{IndentPrinter, PrettyPrinter};

/// One encoded response to verify. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRequest {
    encoded_response: String,
    repair_before_parse: bool,
}

impl VerificationRequest {
    pub fn new(encoded_response: impl Into<String>, repair_before_parse: bool) -> Self {
        Self {
            encoded_response: encoded_response.into(),
            repair_before_parse,
        }
    }

    pub fn encoded_response(&self) -> &str {
        &self.encoded_response
    }

    pub fn repair_before_parse(&self) -> bool {
        self.repair_before_parse
    }
}

/// Pipeline stages, strictly in this order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Decoding,
    Parsing,
    Walking,
    Verifying,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Decoding => "decoding",
            Stage::Parsing => "parsing",
            Stage::Walking => "walking",
            Stage::Verifying => "verifying",
        };
        write!(f, "{name}")
    }
}

/// Verifies SAML2 responses against a trusted certificate.
///
/// Holds only immutable configuration and shared capabilities, so one
/// validator can serve concurrent requests.
#[derive(Clone)]
pub struct Saml2Validator {
    config: ValidationConfig,
    verifier: Arc<dyn SignatureVerifier>,
    printer: Arc<dyn PrettyPrinter>,
}

impl Saml2Validator {
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            verifier: Arc::new(XmlDsigVerifier::new(config.allow_sha1)),
            printer: Arc::new(IndentPrinter::new(config.pretty_indent)),
            config,
        }
    }

    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    pub fn with_printer(mut self, printer: Arc<dyn PrettyPrinter>) -> Self {
        self.printer = printer;
        self
    }

    /// A request using the configured repair setting.
    pub fn request(&self, encoded_response: impl Into<String>) -> VerificationRequest {
        VerificationRequest::new(encoded_response, self.config.repair_before_parse)
    }

    /// Run the whole pipeline. Every failure is reported in the result.
    pub fn validate(&self, certificate: &[u8], request: &VerificationRequest) -> Saml2Result {
        crypto::ensure_initialized();
        let span = debug_span!("saml2_validate", repair = request.repair_before_parse());
        let _guard = span.enter();

        match self.run(certificate, request) {
            Ok(decoded) => {
                let pretty = self.printer.format(&decoded).unwrap_or_else(|e| {
                    warn!("Pretty printing failed, keeping decoded text: {e}");
                    decoded.clone()
                });
                info!("SAML2 response is valid");
                Saml2Result::success(request.encoded_response(), decoded, pretty)
            }
            Err(e) => {
                info!(
                    "SAML2 response is invalid: {e} ({})",
                    e.detail().unwrap_or_default()
                );
                Saml2Result::failure(request.encoded_response(), &e)
            }
        }
    }

    /// Returns the decoded response text when every signature verified.
    fn run(&self, certificate: &[u8], request: &VerificationRequest) -> Result<String> {
        let credential = Credential::from_bytes(certificate)?;
        debug!(
            "Credential loaded: subject={}, serial={}, sha256={}",
            credential.subject, credential.serial_number, credential.fingerprint
        );

        enter(Stage::Decoding);
        let decoded = decoder::decode(request.encoded_response(), request.repair_before_parse())?;

        enter(Stage::Parsing);
        let response = parser::parse(&decoded)?;

        enter(Stage::Walking);
        let refs = walker::collect(&response);

        enter(Stage::Verifying);
        let outcomes = verifier::verify(&refs, &credential, self.verifier.as_ref());
        if !verifier::overall_pass(&outcomes) {
            return Err(verifier::aggregate(&outcomes).unwrap_or(Saml2Error::NoSignature));
        }

        // The parser only accepts UTF-8, so this conversion is lossless
        Ok(String::from_utf8_lossy(&decoded).into_owned())
    }
}

impl Default for Saml2Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

impl fmt::Debug for Saml2Validator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Saml2Validator")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn enter(stage: Stage) {
    debug!(%stage, "Entering stage");
}

/// Verify `encoded_response` against `certificate` with default settings.
pub fn verify(certificate: &[u8], encoded_response: &str, repair: bool) -> Saml2Result {
    Saml2Validator::default().validate(
        certificate,
        &VerificationRequest::new(encoded_response, repair),
    )
}

