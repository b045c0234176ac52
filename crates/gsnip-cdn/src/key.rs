//! Signing key files.

use crate::error::{CdnError, CdnResult};
use base64::alphabet::URL_SAFE;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use std::path::Path;

/// base64url, with or without `=` padding.
const KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Read a key file: the base64url encoded key on one line.
///
/// Cloud CDN keys are written padded, Media CDN keys usually are not.
pub fn read_key_file(path: impl AsRef<Path>) -> CdnResult<Vec<u8>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|source| CdnError::KeyFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(KEY_ENGINE.decode(contents.trim_end())?)
}
