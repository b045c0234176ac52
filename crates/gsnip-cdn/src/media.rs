//! Media CDN signed requests.
//!
//! Same policy layout as Cloud CDN, but signed with Ed25519 and encoded
//! base64url without padding. The URL prefix is also unpadded.

use crate::error::{CdnError, CdnResult};
use crate::signed::query_separator;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey, SECRET_KEY_LENGTH};

/// Build a signing key from a 32-byte seed or a 64-byte (seed ‖ public key)
/// private key.
pub fn signing_key(private_key: &[u8]) -> CdnResult<SigningKey> {
    match private_key.len() {
        32 | 64 => {
            let mut seed = [0u8; SECRET_KEY_LENGTH];
            seed.copy_from_slice(&private_key[..SECRET_KEY_LENGTH]);
            Ok(SigningKey::from_bytes(&seed))
        }
        n => Err(CdnError::InvalidKey(format!(
            "Ed25519 private key must be 32 or 64 bytes, got {}",
            n
        ))),
    }
}

fn sign(private_key: &[u8], data: &str) -> CdnResult<String> {
    let key = signing_key(private_key)?;
    Ok(URL_SAFE_NO_PAD.encode(key.sign(data.as_bytes()).to_bytes()))
}

/// Sign a single URL.
pub fn sign_url(
    url: &str,
    key_name: &str,
    private_key: &[u8],
    expiration: DateTime<Utc>,
) -> CdnResult<String> {
    let to_sign = format!(
        "{}{}Expires={}&KeyName={}",
        url,
        query_separator(url),
        expiration.timestamp(),
        key_name
    );
    let signature = sign(private_key, &to_sign)?;
    Ok(format!("{}&Signature={}", to_sign, signature))
}

/// Sign `url` as a prefix; the policy is appended to `url` itself.
pub fn sign_url_prefix(
    url: &str,
    key_name: &str,
    private_key: &[u8],
    expiration: DateTime<Utc>,
) -> CdnResult<String> {
    let to_sign = format!(
        "URLPrefix={}&Expires={}&KeyName={}",
        URL_SAFE_NO_PAD.encode(url),
        expiration.timestamp(),
        key_name
    );
    let signature = sign(private_key, &to_sign)?;
    Ok(format!(
        "{}{}{}&Signature={}",
        url,
        query_separator(url),
        to_sign,
        signature
    ))
}

/// `Edge-Cache-Cookie` header value granting access under `url_prefix`.
pub fn sign_cookie(
    url_prefix: &str,
    key_name: &str,
    private_key: &[u8],
    expiration: DateTime<Utc>,
) -> CdnResult<String> {
    let to_sign = format!(
        "URLPrefix={}:Expires={}:KeyName={}",
        URL_SAFE_NO_PAD.encode(url_prefix),
        expiration.timestamp(),
        key_name
    );
    let signature = sign(private_key, &to_sign)?;
    Ok(format!("Edge-Cache-Cookie={}:Signature={}", to_sign, signature))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const PRIVATE_TEST_KEY: [u8; 64] = [
        34, 31, 185, 24, 168, 225, 242, 115, 112, 155, 38, 157, 183, 65, 104, 243, 85, 182, 188,
        26, 176, 101, 247, 177, 243, 93, 114, 156, 94, 191, 219, 75, 183, 211, 110, 78, 223, 133,
        62, 172, 159, 217, 158, 126, 34, 6, 254, 108, 57, 194, 141, 93, 219, 91, 8, 162, 88, 62,
        52, 75, 42, 103, 202, 238,
    ];

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    const SAMPLE_URL: &str = "http://35.186.234.33/index.html";
    const QUERY_URL: &str = "https://www.example.com/some/path?some=query&another=param";

    #[test]
    fn signed_url_vectors() {
        assert_eq!(
            sign_url(SAMPLE_URL, "my-key", &PRIVATE_TEST_KEY, at(1558131350)).unwrap(),
            concat!(
                "http://35.186.234.33/index.html?Expires=1558131350&KeyName=my-key",
                "&Signature=bwCkNAIuVneG0cRPwwPDk1vGmMfqR_TbFfLguwdsfF8Pdlk8INOKICYVOTHY5jHl",
                "GgwSF2jkRkm8bWZGwu-SAw"
            )
        );
        assert_eq!(
            sign_url(QUERY_URL, "my-key", &PRIVATE_TEST_KEY, at(1549751461)).unwrap(),
            concat!(
                "https://www.example.com/some/path?some=query&another=param",
                "&Expires=1549751461&KeyName=my-key",
                "&Signature=kM8uoFD9tfNKqOe1ulQpWUutBL4oQERxcR6sCg-brtPOSGJXqvuUOyEP1EsGzVCe",
                "sI6epkY4AxYC9yCAuY1GDQ"
            )
        );
    }

    #[test]
    fn signed_prefix_vectors() {
        assert_eq!(
            sign_url_prefix(SAMPLE_URL, "my-key", &PRIVATE_TEST_KEY, at(1558131350)).unwrap(),
            concat!(
                "http://35.186.234.33/index.html",
                "?URLPrefix=aHR0cDovLzM1LjE4Ni4yMzQuMzMvaW5kZXguaHRtbA",
                "&Expires=1558131350&KeyName=my-key",
                "&Signature=EabJ40MSKAB1hb7IkiNVowQI3N0cLapjDeGQ2oJUx_1n5Blypl31V7auj-KaiGMV",
                "MpYCSGxY48G6G-x7G6xNBg"
            )
        );
        assert_eq!(
            sign_url_prefix("https://www.google.com/", "my-key", &PRIVATE_TEST_KEY, at(1549751401))
                .unwrap(),
            concat!(
                "https://www.google.com/?URLPrefix=aHR0cHM6Ly93d3cuZ29vZ2xlLmNvbS8",
                "&Expires=1549751401&KeyName=my-key",
                "&Signature=f82Yhq9HrFXuAKNKlKpt7qk3e1BKo2OCtIy6JF0HA2j_l1IUF69ZFBXposUSky_f",
                "gvVvTpxi9IOJCONTKiMNDw"
            )
        );
    }

    #[test]
    fn signed_cookie_vectors() {
        assert_eq!(
            sign_cookie("https://www.google.com/", "my-key", &PRIVATE_TEST_KEY, at(1549751401))
                .unwrap(),
            concat!(
                "Edge-Cache-Cookie=URLPrefix=aHR0cHM6Ly93d3cuZ29vZ2xlLmNvbS8:Expires=1549751401",
                ":KeyName=my-key",
                ":Signature=O67Laog-pcQ2_RNOuVrgGiN5NS-16I0SOItQRnW0yDkbawgVgX9KfFCgdoqXpY0P",
                "3f8ZdMEM2tEVsU6-Saq9BA"
            )
        );
        assert_eq!(
            sign_cookie("https://www.example.com/some", "my-key", &PRIVATE_TEST_KEY, at(1549751461))
                .unwrap(),
            concat!(
                "Edge-Cache-Cookie=URLPrefix=aHR0cHM6Ly93d3cuZXhhbXBsZS5jb20vc29tZQ",
                ":Expires=1549751461:KeyName=my-key",
                ":Signature=MjRwgGa4vJJ5lkVt1xJSoi-LyMk5x-bf1AmUBr-2XiB6zP4LSqHsmQZoeZA4fVw6",
                "C7HCcNqQT1UzGPgGe7bpAQ"
            )
        );
    }

    #[test]
    fn seed_and_full_key_sign_alike() {
        let full = sign_url("https://a.example/", "k", &PRIVATE_TEST_KEY, at(1)).unwrap();
        let seed = sign_url("https://a.example/", "k", &PRIVATE_TEST_KEY[..32], at(1)).unwrap();
        assert_eq!(full, seed);
        assert!(matches!(
            sign_url("https://a.example/", "k", &[0u8; 16], at(1)),
            Err(CdnError::InvalidKey(_))
        ));
    }
}
