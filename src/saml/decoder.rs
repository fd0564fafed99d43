use base64::Engine;
use base64::engine::DecodePaddingMode;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use tracing::{debug, warn};

use super::{Result, repair};

/// Standard alphabet; padding may be present or not.
const ENGINE: GeneralPurpose = GeneralPurpose::new(
    &base64::alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Turn an encoded response into XML bytes.
///
/// ASCII whitespace (line breaks of the HTTP-POST binding) is ignored. With
/// `repair` the decoded bytes go through [`repair::repair`], and undecodable
/// input is passed on as is instead of failing here.
pub fn decode(input: &str, repair: bool) -> Result<Vec<u8>> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();

    match ENGINE.decode(compact.as_bytes()) {
        Ok(decoded) => {
            debug!("Decoded {} bytes of response", decoded.len());
            if repair {
                Ok(repair::repair(&decoded))
            } else {
                Ok(decoded)
            }
        }
        Err(e) if repair => {
            warn!("Response is not base64 ({e}); repair mode keeps the raw input");
            Ok(input.as_bytes().to_vec())
        }
        Err(e) => Err(e.into()),
    }
}
