//! Short-lived signatures for raw-content URLs.
//!
//! The raw content host serves files without cookies, so a link to it has to carry its
//! own proof that someone allowed to see the file created it. The proof is an HMAC over
//! the canonical URL plus a creation timestamp:
//!
//! ```text
//! token  = MAC(url || suffix) || suffix
//! suffix = [t0 ^ n, t1 ^ n, t2 ^ n, t3 ^ n, n]
//! ```
//!
//! `t` is the creation time in seconds as a big-endian `u32` and `n` a random byte
//! masking it. A token is valid for `max_age` after `t`.

pub mod clock;
pub mod raw_urls;

pub use clock::{Clock, ManualClock, SystemClock};
pub use raw_urls::{RawUrl, RawUrls, ValidatedAuthKey};

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;
use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use subtle::ConstantTimeEq;

use crate::constants::{
    URL_SIGNER_GENERATED_KEY_LEN, URL_SIGNER_KEY_FILE_MAX_BYTES, URL_SIGNER_MAX_AGE,
};
use crate::core::{RefscopeError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Length of the timestamp suffix appended after the MAC.
pub const SUFFIX_LEN: usize = 5;

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub bytes: Vec<u8>,
    pub expires_at_millis: u64,
}

/// Proof that a token was valid when checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedSignature {
    pub expires_at_millis: u64,
}

/// Issues and checks URL tokens.
pub trait UrlSigner: Send + Sync {
    fn sign(&self, url: &str) -> Signature;

    /// `None` for any invalid token; the reason is deliberately not reported.
    fn verify(&self, url: &str, token: &[u8]) -> Option<ValidatedSignature>;
}

/// Where signing key material comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySource {
    /// Read at most 128 bytes from a file that should be readable only by its owner.
    File(PathBuf),
    /// A random key generated once per process.
    Generated,
}

static GENERATED_KEY: OnceLock<Vec<u8>> = OnceLock::new();

impl KeySource {
    /// Load the key bytes.
    ///
    /// # Errors
    ///
    /// [`RefscopeError::SignerKeyError`] when the file cannot be read or is empty.
    pub fn load(&self) -> Result<Vec<u8>> {
        match self {
            Self::File(path) => load_key_file(path),
            Self::Generated => Ok(GENERATED_KEY
                .get_or_init(|| {
                    let mut key = vec![0u8; URL_SIGNER_GENERATED_KEY_LEN];
                    rand::rngs::OsRng.fill_bytes(&mut key);
                    tracing::info!(
                        target: "signer",
                        "no URL signer key configured; generated a {}-byte key for this process",
                        URL_SIGNER_GENERATED_KEY_LEN
                    );
                    key
                })
                .clone()),
        }
    }
}

fn load_key_file(path: &std::path::Path) -> Result<Vec<u8>> {
    let key_error = |reason: String| RefscopeError::SignerKeyError {
        path: path.display().to_string(),
        reason,
    };
    let file = std::fs::File::open(path).map_err(|e| key_error(e.to_string()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = file.metadata().map_err(|e| key_error(e.to_string()))?.permissions().mode();
        if mode & 0o177 != 0 {
            tracing::warn!(
                target: "signer",
                "URL signer key file {} has mode {:o}; it should be readable only by its owner",
                path.display(),
                mode & 0o777
            );
        }
    }

    let mut key = Vec::with_capacity(URL_SIGNER_KEY_FILE_MAX_BYTES);
    file.take(URL_SIGNER_KEY_FILE_MAX_BYTES as u64)
        .read_to_end(&mut key)
        .map_err(|e| key_error(e.to_string()))?;
    if key.is_empty() {
        return Err(key_error("key file is empty".to_string()));
    }
    Ok(key)
}

/// HMAC-SHA256 URL signer.
pub struct HmacUrlSigner {
    mac: HmacSha256,
    max_age: Duration,
    clock: Arc<dyn Clock>,
}

impl HmacUrlSigner {
    /// # Errors
    ///
    /// [`RefscopeError::SignerKeyError`] for an empty key.
    pub fn new(key: &[u8], max_age: Duration, clock: Arc<dyn Clock>) -> Result<Self> {
        if key.is_empty() {
            return Err(RefscopeError::SignerKeyError {
                path: "<memory>".to_string(),
                reason: "key is empty".to_string(),
            });
        }
        let mac = HmacSha256::new_from_slice(key).map_err(|e| RefscopeError::SignerKeyError {
            path: "<memory>".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            mac,
            max_age,
            clock,
        })
    }

    /// Signer with the default five second lifetime and the system clock.
    pub fn from_source(source: &KeySource) -> Result<Self> {
        Self::new(&source.load()?, URL_SIGNER_MAX_AGE, Arc::new(SystemClock))
    }

    #[must_use]
    pub const fn max_age(&self) -> Duration {
        self.max_age
    }

    fn max_age_millis(&self) -> u64 {
        u64::try_from(self.max_age.as_millis()).unwrap_or(u64::MAX)
    }

    fn compute(&self, url: &str, suffix: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(url.as_bytes());
        mac.update(suffix);
        mac.finalize().into_bytes().to_vec()
    }

    fn sign_at(&self, url: &str, created_secs: u32, nonce: u8) -> Signature {
        let mut suffix = [0u8; SUFFIX_LEN];
        for (slot, byte) in suffix.iter_mut().zip(created_secs.to_be_bytes()) {
            *slot = byte ^ nonce;
        }
        suffix[SUFFIX_LEN - 1] = nonce;

        let mut bytes = self.compute(url, &suffix);
        bytes.extend_from_slice(&suffix);
        Signature {
            bytes,
            expires_at_millis: u64::from(created_secs) * 1000 + self.max_age_millis(),
        }
    }
}

impl UrlSigner for HmacUrlSigner {
    fn sign(&self, url: &str) -> Signature {
        let now_secs = u32::try_from(self.clock.now_millis() / 1000).unwrap_or(u32::MAX);
        self.sign_at(url, now_secs, rand::random::<u8>())
    }

    fn verify(&self, url: &str, token: &[u8]) -> Option<ValidatedSignature> {
        if token.len() < SUFFIX_LEN {
            return None;
        }
        let (mac, suffix) = token.split_at(token.len() - SUFFIX_LEN);
        let nonce = suffix[SUFFIX_LEN - 1];
        let mut time = [0u8; 4];
        for (slot, byte) in time.iter_mut().zip(suffix) {
            *slot = byte ^ nonce;
        }
        let created_millis = u64::from(u32::from_be_bytes(time)) * 1000;

        let now = self.clock.now_millis();
        if created_millis > now {
            return None;
        }
        let expires_at_millis = created_millis.saturating_add(self.max_age_millis());
        if now > expires_at_millis {
            return None;
        }

        let expected = self.compute(url, suffix);
        if expected.len() != mac.len() || !bool::from(expected.as_slice().ct_eq(mac)) {
            return None;
        }
        Some(ValidatedSignature {
            expires_at_millis,
        })
    }
}
