//! Authenticated-encryption "seal" of ticket bytes, in the style of the
//! `iron`/`ciron` password-sealing scheme the original nginx module's ticket
//! library builds on (`dlg_auth_iron_pwd`).
//!
//! A sealed token is `id~encSalt~iv~ciphertext~intSalt~hmac`, each part
//! base64 (no padding) except `id`, which travels as-is so a password table
//! lookup (spec.md §4.2 step 4, "rotated passwords") doesn't need to decode
//! anything first. Encryption and integrity keys are derived independently
//! per seal via PBKDF2-HMAC-SHA256 from fresh random salts stored alongside
//! the ciphertext, the same two-key-derivation split `iron` uses, computed
//! with `openssl::pkcs5::pbkdf2_hmac` the way `proxmox-auth-api::auth_key`
//! reaches for `openssl` throughout rather than a standalone KDF crate.

use openssl::hash::MessageDigest;
use openssl::memcmp;
use openssl::pkey::PKey;
use openssl::pkcs5::pbkdf2_hmac;
use openssl::rand::rand_bytes;
use openssl::sign::Signer;
use openssl::symm::{Cipher, Crypter, Mode};

const SALT_LEN: usize = 16;
const IV_LEN: usize = 16;
const KEY_LEN: usize = 32;
const PBKDF2_ITERATIONS: usize = 1;

/// The sealing secret(s) configured for a location: either a single shared
/// password (`dlg_auth_iron_pwd <pwd>`) or a rotation table keyed by id
/// (`dlg_auth_iron_pwd <id> <pwd>`, repeated), mirroring `CironPwdTable` /
/// `conf->iron_password`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Password {
    Single(String),
    Table(Vec<(String, String)>),
}

impl Password {
    fn secret_for_id(&self, id: &str) -> Option<&str> {
        match self {
            Password::Single(s) if id.is_empty() => Some(s.as_str()),
            Password::Single(_) => None,
            Password::Table(entries) => entries
                .iter()
                .find(|(entry_id, _)| entry_id == id)
                .map(|(_, secret)| secret.as_str()),
        }
    }

    /// The id used when sealing a *new* token: empty for a single password,
    /// the first configured entry for a table (the table's "current"
    /// signing key; older entries remain only to unseal tickets issued
    /// before a rotation).
    fn sealing_id(&self) -> &str {
        match self {
            Password::Single(_) => "",
            Password::Table(entries) => entries.first().map(|(id, _)| id.as_str()).unwrap_or(""),
        }
    }

    fn sealing_secret(&self) -> Option<&str> {
        self.secret_for_id(self.sealing_id())
    }
}

/// Seal/unseal failures, named after the outcomes `ngx_dlg_auth_authenticate`
/// maps to a 400 (oversized/corrupt input) or treats as an internal error.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum SealError {
    #[error("sealed token exceeds the configured size ceiling")]
    TooLarge,
    #[error("sealed token is malformed")]
    Malformed,
    #[error("no password configured for id {0:?}")]
    UnknownPasswordId(String),
    #[error("integrity check failed")]
    IntegrityMismatch,
    #[error("payload could not be decrypted")]
    DecryptFailed,
    #[error("no sealing password configured")]
    NoSealingPassword,
}

/// Upper bound on the ciron-style decryption work area a sealed token of
/// `sealed_len` bytes would require: proportional to the input, the same
/// pre-decryption size check `ciron_calculate_encryption_buffer_length`
/// performs before any PBKDF2 or AES work happens.
pub fn required_work_area_len(sealed_len: usize) -> usize {
    sealed_len + IV_LEN + KEY_LEN
}

/// Upper bound on the plaintext a sealed token of `sealed_len` bytes could
/// decode to; base64 overhead means the plaintext can only be smaller.
pub fn required_output_len(sealed_len: usize) -> usize {
    sealed_len
}

/// Seal `plaintext` under the configured password's current signing key.
pub fn seal(password: &Password, plaintext: &[u8]) -> Result<String, SealError> {
    let secret = password.sealing_secret().ok_or(SealError::NoSealingPassword)?;
    let id = password.sealing_id();

    let mut enc_salt = [0u8; SALT_LEN];
    let mut int_salt = [0u8; SALT_LEN];
    let mut iv = [0u8; IV_LEN];
    rand_bytes(&mut enc_salt).map_err(|_| SealError::Malformed)?;
    rand_bytes(&mut int_salt).map_err(|_| SealError::Malformed)?;
    rand_bytes(&mut iv).map_err(|_| SealError::Malformed)?;

    let enc_key = derive_key(secret.as_bytes(), &enc_salt);
    let int_key = derive_key(secret.as_bytes(), &int_salt);

    let ciphertext = aes_encrypt(&enc_key, &iv, plaintext)?;

    let mac_input = format!(
        "{id}~{enc_salt}~{iv}~{ciphertext}",
        id = id,
        enc_salt = b64(&enc_salt),
        iv = b64(&iv),
        ciphertext = b64(&ciphertext),
    );
    let hmac = hmac_sha256(&int_key, mac_input.as_bytes())?;

    Ok(format!(
        "{mac_input}~{int_salt}~{hmac}",
        int_salt = b64(&int_salt),
        hmac = b64(&hmac),
    ))
}

/// Unseal `token`, looking up the signing password by the id embedded in
/// the token against `password`'s configured table (or the single
/// configured password, if `id` is empty).
pub fn unseal(password: &Password, token: &str) -> Result<Vec<u8>, SealError> {
    let parts: Vec<&str> = token.split('~').collect();
    let [id, enc_salt, iv, ciphertext, int_salt, hmac]: [&str; 6] =
        parts.try_into().map_err(|_| SealError::Malformed)?;

    let secret = password
        .secret_for_id(id)
        .ok_or_else(|| SealError::UnknownPasswordId(id.to_string()))?;

    let enc_salt = unb64(enc_salt)?;
    let iv = unb64(iv)?;
    let ciphertext_raw = unb64(ciphertext)?;
    let int_salt = unb64(int_salt)?;
    let hmac_raw = unb64(hmac)?;

    let int_key = derive_key(secret.as_bytes(), &int_salt);
    let mac_input = format!(
        "{id}~{enc_salt}~{iv}~{ciphertext}",
        id = id,
        enc_salt = b64(&enc_salt),
        iv = b64(&iv),
        ciphertext = ciphertext,
    );
    let expected_hmac = hmac_sha256(&int_key, mac_input.as_bytes())?;
    if expected_hmac.len() != hmac_raw.len() || !memcmp::eq(&expected_hmac, &hmac_raw) {
        return Err(SealError::IntegrityMismatch);
    }

    let enc_key = derive_key(secret.as_bytes(), &enc_salt);
    aes_decrypt(&enc_key, &iv, &ciphertext_raw)
}

fn derive_key(secret: &[u8], salt: &[u8]) -> Vec<u8> {
    let mut key = vec![0u8; KEY_LEN];
    pbkdf2_hmac(secret, salt, PBKDF2_ITERATIONS, MessageDigest::sha256(), &mut key)
        .expect("pbkdf2_hmac with fixed-length output never fails");
    key
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, SealError> {
    let pkey = PKey::hmac(key).map_err(|_| SealError::Malformed)?;
    let mut signer = Signer::new(MessageDigest::sha256(), &pkey).map_err(|_| SealError::Malformed)?;
    signer.update(data).map_err(|_| SealError::Malformed)?;
    signer.sign_to_vec().map_err(|_| SealError::Malformed)
}

fn aes_encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, SealError> {
    let cipher = Cipher::aes_256_cbc();
    let mut crypter =
        Crypter::new(cipher, Mode::Encrypt, key, Some(iv)).map_err(|_| SealError::Malformed)?;
    let mut out = vec![0u8; plaintext.len() + cipher.block_size()];
    let mut count = crypter.update(plaintext, &mut out).map_err(|_| SealError::Malformed)?;
    count += crypter.finalize(&mut out[count..]).map_err(|_| SealError::Malformed)?;
    out.truncate(count);
    Ok(out)
}

fn aes_decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Vec<u8>, SealError> {
    let cipher = Cipher::aes_256_cbc();
    let mut crypter =
        Crypter::new(cipher, Mode::Decrypt, key, Some(iv)).map_err(|_| SealError::DecryptFailed)?;
    let mut out = vec![0u8; ciphertext.len() + cipher.block_size()];
    let mut count = crypter
        .update(ciphertext, &mut out)
        .map_err(|_| SealError::DecryptFailed)?;
    count += crypter
        .finalize(&mut out[count..])
        .map_err(|_| SealError::DecryptFailed)?;
    out.truncate(count);
    Ok(out)
}

fn b64(data: &[u8]) -> String {
    base64::Engine::encode(&base64::engine::general_purpose::STANDARD_NO_PAD, data)
}

fn unb64(s: &str) -> Result<Vec<u8>, SealError> {
    base64::Engine::decode(&base64::engine::general_purpose::STANDARD_NO_PAD, s)
        .map_err(|_| SealError::Malformed)
}
