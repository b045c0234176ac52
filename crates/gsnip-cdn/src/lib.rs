//! # gsnip-cdn – signed CDN access
//!
//! | Product    | Module   | Signature            | Encoding                  |
//! |------------|----------|----------------------|---------------------------|
//! | Cloud CDN  | `signed` | HMAC-SHA1            | base64url, padded         |
//! | Media CDN  | `media`  | Ed25519              | base64url, unpadded       |
//!
//! Everything here is a pure function of its inputs; no network access.

pub mod error;
pub mod key;
pub mod media;
pub mod signed;

pub use error::{CdnError, CdnResult};
pub use key::read_key_file;
pub use signed::{sign_cookie, sign_url, sign_url_with_prefix};
