//! Object store for uploaded images
//!
//! Filesystem-backed store fronted by time-limited signed download links.
//! `put` persists the bytes under the store root and yields a stable URL;
//! `presign_get` produces a link carrying an expiry and an HMAC-SHA256
//! signature over `key\nexpires`, redeemed by the `/files/{key}` route.
//! Anyone holding a link can download until it expires; nothing about the
//! store itself is secret.

use std::path::{Path, PathBuf};

use hmac::{Hmac, Mac};
use sha2::Sha256;
use time::{Duration, OffsetDateTime};

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("invalid object key")]
    InvalidKey,
    #[error("signature invalid or expired")]
    BadSignature,
    #[error("object not found")]
    NotFound,
    #[error("object store I/O failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Filesystem object store with HMAC-signed download links.
#[derive(Clone)]
pub struct ObjectStore {
    root: PathBuf,
    base_url: String,
    signing_key: Vec<u8>,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str, signing_secret: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            signing_key: signing_secret.as_bytes().to_vec(),
        }
    }

    /// Store `bytes` under `key` and return the object's stable URL.
    pub async fn put(&self, key: &str, bytes: &[u8]) -> Result<String, ObjectStoreError> {
        let path = self.object_path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(key = %key, size = bytes.len(), "Object stored");
        Ok(self.object_url(key))
    }

    /// Read the raw object bytes for a verified download.
    pub async fn get(&self, key: &str) -> Result<Vec<u8>, ObjectStoreError> {
        let path = self.object_path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(ObjectStoreError::NotFound),
            Err(e) => Err(e.into()),
        }
    }

    /// Produce a download URL valid for `ttl`.
    pub fn presign_get(&self, key: &str, ttl: Duration) -> String {
        let expires = (OffsetDateTime::now_utc() + ttl).unix_timestamp();
        let sig = self.sign(key, expires);
        format!(
            "{}/files/{}?expires={}&sig={}",
            self.base_url,
            encode_key_path(key),
            expires,
            sig
        )
    }

    /// Check a presented signature and expiry for `key`.
    pub fn verify(&self, key: &str, expires: i64, sig_hex: &str) -> Result<(), ObjectStoreError> {
        if expires < OffsetDateTime::now_utc().unix_timestamp() {
            return Err(ObjectStoreError::BadSignature);
        }
        let sig = hex::decode(sig_hex).map_err(|_| ObjectStoreError::BadSignature)?;

        let mut mac = self.mac(key, expires);
        mac.verify_slice(&sig)
            .map_err(|_| ObjectStoreError::BadSignature)
    }

    /// Stable (unsigned) URL of an object, recorded in the catalog.
    pub fn object_url(&self, key: &str) -> String {
        format!("{}/files/{}", self.base_url, encode_key_path(key))
    }

    fn sign(&self, key: &str, expires: i64) -> String {
        hex::encode(self.mac(key, expires).finalize().into_bytes())
    }

    fn mac(&self, key: &str, expires: i64) -> HmacSha256 {
        #[allow(clippy::expect_used)] // HMAC accepts keys of any length
        let mut mac = HmacSha256::new_from_slice(&self.signing_key)
            .expect("HMAC accepts keys of any length");
        // Length-prefix the key so no key/expires pair shares an input
        // with another, whatever bytes the key contains.
        mac.update(&(key.len() as u64).to_be_bytes());
        mac.update(key.as_bytes());
        mac.update(&expires.to_be_bytes());
        mac
    }

    /// Map a key to a path under the store root, rejecting traversal.
    fn object_path(&self, key: &str) -> Result<PathBuf, ObjectStoreError> {
        if key.is_empty()
            || key.starts_with('/')
            || key.split('/').any(|seg| seg.is_empty() || seg == "." || seg == "..")
        {
            return Err(ObjectStoreError::InvalidKey);
        }
        Ok(self.root.join(Path::new(key)))
    }
}

/// Percent-encode each path segment of a key for use in a URL. Slashes
/// separate segments and stay literal; anything else a browser would
/// mangle (spaces, `?`, `#`, `&`) gets escaped.
fn encode_key_path(key: &str) -> String {
    key.split('/')
        .map(|seg| urlencoding::encode(seg).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ObjectStore {
        let root = std::env::temp_dir().join(format!("imagestore-test-{}", uuid::Uuid::new_v4()));
        ObjectStore::new(root, "http://localhost:8007", "download-signing-secret")
    }

    #[tokio::test]
    async fn put_then_get_roundtrip() {
        let store = store();
        let url = store.put("games/doom.png", b"png-bytes").await.unwrap();

        assert_eq!(url, "http://localhost:8007/files/games/doom.png");
        assert_eq!(store.get("games/doom.png").await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn missing_object_is_not_found() {
        assert!(matches!(
            store().get("games/absent.png").await,
            Err(ObjectStoreError::NotFound)
        ));
    }

    #[test]
    fn presigned_link_verifies() {
        let store = store();
        let url = store.presign_get("anime/totoro.jpg", Duration::minutes(10));

        // Pull expires and sig back out of the generated URL.
        let query = url.split_once('?').unwrap().1;
        let mut expires = 0i64;
        let mut sig = String::new();
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("sig", v) => sig = v.to_string(),
                _ => {}
            }
        }

        assert!(store.verify("anime/totoro.jpg", expires, &sig).is_ok());
    }

    #[test]
    fn awkward_file_names_are_encoded_and_still_verify() {
        let store = store();
        let key = "summer photos/beach #1&2.jpg";
        let url = store.presign_get(key, Duration::minutes(10));

        // The path must be safe to paste into a browser.
        assert!(url.contains("/files/summer%20photos/beach%20%231%262.jpg"));

        // Redemption decodes the path back to the raw key; the signature
        // must verify against that raw form.
        let query = url.split_once('?').unwrap().1;
        let mut expires = 0i64;
        let mut sig = String::new();
        for pair in query.split('&') {
            match pair.split_once('=').unwrap() {
                ("expires", v) => expires = v.parse().unwrap(),
                ("sig", v) => sig = v.to_string(),
                _ => {}
            }
        }
        assert!(store.verify(key, expires, &sig).is_ok());
    }

    #[test]
    fn expired_link_is_rejected() {
        let store = store();
        let expires = OffsetDateTime::now_utc().unix_timestamp() - 60;
        let sig = store.sign("anime/totoro.jpg", expires);

        assert!(matches!(
            store.verify("anime/totoro.jpg", expires, &sig),
            Err(ObjectStoreError::BadSignature)
        ));
    }

    #[test]
    fn tampered_key_or_signature_is_rejected() {
        let store = store();
        let expires = OffsetDateTime::now_utc().unix_timestamp() + 600;
        let sig = store.sign("anime/totoro.jpg", expires);

        assert!(store.verify("anime/other.jpg", expires, &sig).is_err());
        assert!(store.verify("anime/totoro.jpg", expires, "deadbeef").is_err());
        assert!(store.verify("anime/totoro.jpg", expires + 1, &sig).is_err());
    }

    #[tokio::test]
    async fn traversal_keys_are_rejected() {
        let store = store();
        for key in ["../etc/passwd", "/abs", "a//b", "a/./b", ""] {
            assert!(
                matches!(store.put(key, b"x").await, Err(ObjectStoreError::InvalidKey)),
                "expected InvalidKey for {key:?}"
            );
        }
    }
}
