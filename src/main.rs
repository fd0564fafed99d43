use std::process::ExitCode;

use color_eyre::eyre::{OptionExt, WrapErr};
use saml2_verifier::{Saml2Validator, config::Config, telemetry};

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    dotenvy::dotenv().ok();
    telemetry::init_tracing();

    // Load configuration
    let config = Config::load()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    let certificate_path = config
        .input
        .certificate
        .as_ref()
        .ok_or_eyre("input.certificate is not set (APP_INPUT__CERTIFICATE)")?;
    let response_path = config
        .input
        .response
        .as_ref()
        .ok_or_eyre("input.response is not set (APP_INPUT__RESPONSE)")?;

    let certificate = std::fs::read(certificate_path)
        .wrap_err_with(|| format!("reading certificate {}", certificate_path.display()))?;
    let encoded_response = std::fs::read_to_string(response_path)
        .wrap_err_with(|| format!("reading response {}", response_path.display()))?;

    let validator = Saml2Validator::new(config.validation);
    let result = validator.validate(&certificate, &validator.request(encoded_response));

    println!("{}", serde_json::to_string_pretty(&result)?);

    Ok(if result.is_valid() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
