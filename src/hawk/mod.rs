//! Hawk-style request MAC: header parsing, canonical-form construction, MAC
//! compute/verify, and `WWW-Authenticate` challenge building (spec.md §4.3,
//! §4.5).
//!
//! Grounded on the sibling `hawkc` library the original nginx module drives
//! (exercised, not vendored, from `nginx_dlg_auth.c`), written in the style
//! `proxmox-auth-api::auth_key::HMACKey` signs and verifies: an OpenSSL
//! `Signer` computes the MAC, `openssl::memcmp::eq` compares it in constant
//! time.

pub mod challenge;

use openssl::hash::MessageDigest;
use openssl::memcmp;
use openssl::pkey::PKey;
use openssl::sign::Signer;

/// The Hawk MAC algorithm, selected per-ticket by its `hawkAlgorithm` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HawkAlgorithm {
    Sha256,
    Sha1,
}

impl HawkAlgorithm {
    pub fn by_name(name: &str) -> Option<Self> {
        match name {
            "sha256" => Some(HawkAlgorithm::Sha256),
            "sha1" => Some(HawkAlgorithm::Sha1),
            _ => None,
        }
    }

    fn digest(self) -> MessageDigest {
        match self {
            HawkAlgorithm::Sha256 => MessageDigest::sha256(),
            HawkAlgorithm::Sha1 => MessageDigest::sha1(),
        }
    }
}

/// A parsed `Authorization: Hawk ...` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthHeader {
    pub id: String,
    pub ts: i64,
    pub nonce: String,
    pub mac: String,
    pub ext: Option<String>,
    pub hash: Option<String>,
}

/// Errors arising from header parsing and MAC verification, named after the
/// outcomes `ngx_dlg_auth_authenticate` dispatches on (`BAD_SCHEME` ->
/// simple 401, `PARSE_ERROR` -> 400, anything else -> 500).
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum HawkError {
    #[error("Authorization header is not a Hawk challenge")]
    NotHawkScheme,
    #[error("Authorization header is malformed")]
    Malformed,
    #[error("Authorization header is missing the {0} attribute")]
    MissingAttribute(&'static str),
    #[error("Authorization header has a duplicate {0} attribute")]
    DuplicateAttribute(&'static str),
    #[error("Authorization header ts attribute is not a valid timestamp")]
    InvalidTimestamp,
    #[error("MAC verification failed")]
    MacMismatch,
}

/// Parse `Authorization: Hawk id="...", ts="...", nonce="...", mac="...",
/// ext="...", hash="..."`.
///
/// Attribute order is not significant; unknown attributes are ignored
/// (forward-compatible with Hawk extensions this crate doesn't use, like
/// `app`/`dlg`), but `id`, `ts`, `nonce` and `mac` are mandatory.
pub fn parse_authorization(header: &str) -> Result<AuthHeader, HawkError> {
    let rest = header
        .strip_prefix("Hawk ")
        .or_else(|| header.strip_prefix("hawk "))
        .ok_or(HawkError::NotHawkScheme)?;

    let mut id = None;
    let mut ts = None;
    let mut nonce = None;
    let mut mac = None;
    let mut ext = None;
    let mut hash = None;

    for part in split_attributes(rest) {
        let (key, value) = part.split_once('=').ok_or(HawkError::Malformed)?;
        let key = key.trim();
        let value = unquote(value.trim()).ok_or(HawkError::Malformed)?;

        match key {
            "id" => set_once(&mut id, value, "id")?,
            "ts" => set_once(&mut ts, value, "ts")?,
            "nonce" => set_once(&mut nonce, value, "nonce")?,
            "mac" => set_once(&mut mac, value, "mac")?,
            "ext" => set_once(&mut ext, value, "ext")?,
            "hash" => set_once(&mut hash, value, "hash")?,
            _ => {}
        }
    }

    let ts_raw = ts.ok_or(HawkError::MissingAttribute("ts"))?;
    let ts: i64 = ts_raw.parse().map_err(|_| HawkError::InvalidTimestamp)?;

    Ok(AuthHeader {
        id: id.ok_or(HawkError::MissingAttribute("id"))?,
        ts,
        nonce: nonce.ok_or(HawkError::MissingAttribute("nonce"))?,
        mac: mac.ok_or(HawkError::MissingAttribute("mac"))?,
        ext,
        hash,
    })
}

fn set_once(slot: &mut Option<String>, value: String, name: &'static str) -> Result<(), HawkError> {
    if slot.is_some() {
        return Err(HawkError::DuplicateAttribute(name));
    }
    *slot = Some(value);
    Ok(())
}

fn unquote(s: &str) -> Option<String> {
    let s = s.strip_prefix('"')?.strip_suffix('"')?;
    Some(s.replace("\\\"", "\""))
}

/// Splits `key="value", key="value"` on commas that are not inside quotes.
fn split_attributes(s: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0usize;
    for (i, b) in s.bytes().enumerate() {
        match b {
            b'"' => in_quotes = !in_quotes,
            b',' if !in_quotes => {
                let piece = s[start..i].trim();
                if !piece.is_empty() {
                    parts.push(piece);
                }
                start = i + 1;
            }
            _ => {}
        }
    }
    let tail = s[start..].trim();
    if !tail.is_empty() {
        parts.push(tail);
    }
    parts
}

/// The canonical request form the MAC is computed over, one line per field
/// in the order Hawk defines: `hawk.1.header`, ts, nonce, method, path,
/// host, port, hash (possibly empty), ext (possibly empty), each newline
/// terminated.
#[allow(clippy::too_many_arguments)]
pub fn canonical_request(
    ts: i64,
    nonce: &str,
    method: &str,
    path: &str,
    host: &str,
    port: u16,
    hash: &str,
    ext: &str,
) -> String {
    let mut out = String::with_capacity(128);
    out.push_str("hawk.1.header\n");
    out.push_str(&ts.to_string());
    out.push('\n');
    out.push_str(nonce);
    out.push('\n');
    out.push_str(method);
    out.push('\n');
    out.push_str(path);
    out.push('\n');
    out.push_str(&host.to_lowercase());
    out.push('\n');
    out.push_str(&port.to_string());
    out.push('\n');
    out.push_str(hash);
    out.push('\n');
    out.push_str(ext);
    out.push('\n');
    out
}

/// Compute the Hawk MAC over `canonical` under `key`, base64-encoded.
pub fn compute_mac(algorithm: HawkAlgorithm, key: &[u8], canonical: &str) -> Result<String, HawkError> {
    let pkey = PKey::hmac(key).map_err(|_| HawkError::Malformed)?;
    let mut signer =
        Signer::new(algorithm.digest(), &pkey).map_err(|_| HawkError::Malformed)?;
    signer
        .update(canonical.as_bytes())
        .map_err(|_| HawkError::Malformed)?;
    let raw = signer.sign_to_vec().map_err(|_| HawkError::Malformed)?;
    Ok(base64::Engine::encode(
        &base64::engine::general_purpose::STANDARD,
        raw,
    ))
}

/// Verify `mac` (base64) against the MAC computed over `canonical` under
/// `key`, in constant time.
pub fn verify_mac(
    algorithm: HawkAlgorithm,
    key: &[u8],
    canonical: &str,
    mac: &str,
) -> Result<(), HawkError> {
    let expected = compute_mac(algorithm, key, canonical)?;
    let expected_raw = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, &expected)
        .map_err(|_| HawkError::Malformed)?;
    let got_raw = base64::Engine::decode(&base64::engine::general_purpose::STANDARD, mac)
        .map_err(|_| HawkError::MacMismatch)?;
    if expected_raw.len() != got_raw.len() || !memcmp::eq(&expected_raw, &got_raw) {
        return Err(HawkError::MacMismatch);
    }
    Ok(())
}
