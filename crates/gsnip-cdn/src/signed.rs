//! Cloud CDN signed URLs and signed cookies.
//!
//! Signatures are HMAC-SHA1 over the policy string, encoded base64url
//! with padding. Policies carry the expiry as Unix seconds and the name of
//! the key configured on the backend.

use crate::error::{CdnError, CdnResult};
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

fn sign(key: &[u8], data: &str) -> CdnResult<String> {
    let mut mac = HmacSha1::new_from_slice(key).map_err(|e| CdnError::InvalidKey(e.to_string()))?;
    mac.update(data.as_bytes());
    Ok(URL_SAFE.encode(mac.finalize().into_bytes()))
}

/// `?` for a bare URL, `&` when it already carries a query.
pub(crate) fn query_separator(url: &str) -> char {
    if url.contains('?') {
        '&'
    } else {
        '?'
    }
}

/// Sign a single URL.
///
/// `https://example.com/a` becomes
/// `https://example.com/a?Expires=..&KeyName=..&Signature=..`.
pub fn sign_url(
    url: &str,
    key_name: &str,
    key: &[u8],
    expiration: DateTime<Utc>,
) -> CdnResult<String> {
    let to_sign = format!(
        "{}{}Expires={}&KeyName={}",
        url,
        query_separator(url),
        expiration.timestamp(),
        key_name
    );
    let signature = sign(key, &to_sign)?;
    Ok(format!("{}&Signature={}", to_sign, signature))
}

/// Sign every URL under `url_prefix`.
///
/// Returns only the query parameters; the caller appends them to any URL
/// that starts with the prefix.
pub fn sign_url_with_prefix(
    url_prefix: &str,
    key_name: &str,
    key: &[u8],
    expiration: DateTime<Utc>,
) -> CdnResult<String> {
    let to_sign = format!(
        "URLPrefix={}&Expires={}&KeyName={}",
        URL_SAFE.encode(url_prefix),
        expiration.timestamp(),
        key_name
    );
    let signature = sign(key, &to_sign)?;
    Ok(format!("{}&Signature={}", to_sign, signature))
}

/// Signed cookie value (`Cloud-CDN-Cookie`) granting access under `url_prefix`.
pub fn sign_cookie(
    url_prefix: &str,
    key_name: &str,
    key: &[u8],
    expiration: DateTime<Utc>,
) -> CdnResult<String> {
    let to_sign = format!(
        "URLPrefix={}:Expires={}:KeyName={}",
        URL_SAFE.encode(url_prefix),
        expiration.timestamp(),
        key_name
    );
    let signature = sign(key, &to_sign)?;
    Ok(format!("{}:Signature={}", to_sign, signature))
}
