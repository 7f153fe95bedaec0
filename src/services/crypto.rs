// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Encryption of stored OAuth tokens.
//!
//! Tokens are sealed with AES-256-GCM under a key derived (HKDF-SHA256) from
//! the configured encryption secret. The Mattermost user ID is bound in as
//! associated data, so a blob copied to another user's record won't decrypt.
//! Stored form: base64(nonce || ciphertext || tag).

use crate::db::Store;
use crate::error::AppError;
use crate::models::OAuthToken;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use hkdf::Hkdf;
use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use ring::rand::{SecureRandom, SystemRandom};
use sha2::Sha256;
use std::sync::Arc;

const HKDF_SALT: &[u8] = b"servicenow-bridge/token-encryption";
const HKDF_INFO: &[u8] = b"oauth2-token-v1";

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed")]
    KeyDerivation,

    #[error("encryption failed")]
    Encrypt,

    #[error("decryption failed")]
    Decrypt,

    #[error("invalid ciphertext encoding: {0}")]
    Encoding(String),
}

impl From<CryptoError> for AppError {
    fn from(err: CryptoError) -> Self {
        AppError::Internal(anyhow::anyhow!(err))
    }
}

/// Symmetric cipher for token blobs.
#[derive(Clone)]
pub struct TokenCipher {
    key: Arc<LessSafeKey>,
    rng: SystemRandom,
}

impl TokenCipher {
    pub fn new(encryption_secret: &str) -> Result<Self, CryptoError> {
        let mut key_bytes = [0u8; 32];
        Hkdf::<Sha256>::new(Some(HKDF_SALT), encryption_secret.as_bytes())
            .expand(HKDF_INFO, &mut key_bytes)
            .map_err(|_| CryptoError::KeyDerivation)?;

        let unbound =
            UnboundKey::new(&AES_256_GCM, &key_bytes).map_err(|_| CryptoError::KeyDerivation)?;

        Ok(Self {
            key: Arc::new(LessSafeKey::new(unbound)),
            rng: SystemRandom::new(),
        })
    }

    /// Encrypt plaintext, binding it to `aad`. Returns base64.
    pub fn encrypt(&self, plaintext: &[u8], aad: &[u8]) -> Result<String, CryptoError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        self.rng
            .fill(&mut nonce_bytes)
            .map_err(|_| CryptoError::Encrypt)?;

        let mut in_out = plaintext.to_vec();
        self.key
            .seal_in_place_append_tag(
                Nonce::assume_unique_for_key(nonce_bytes),
                Aad::from(aad),
                &mut in_out,
            )
            .map_err(|_| CryptoError::Encrypt)?;

        let mut sealed = nonce_bytes.to_vec();
        sealed.extend_from_slice(&in_out);
        Ok(BASE64.encode(sealed))
    }

    /// Decrypt a base64 blob produced by [`TokenCipher::encrypt`].
    pub fn decrypt(&self, ciphertext_b64: &str, aad: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let sealed = BASE64
            .decode(ciphertext_b64)
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        if sealed.len() < NONCE_LEN {
            return Err(CryptoError::Encoding("ciphertext too short".to_string()));
        }

        let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
        let nonce =
            Nonce::try_assume_unique_for_key(nonce_bytes).map_err(|_| CryptoError::Decrypt)?;

        let mut in_out = ciphertext.to_vec();
        let plaintext = self
            .key
            .open_in_place(nonce, Aad::from(aad), &mut in_out)
            .map_err(|_| CryptoError::Decrypt)?;
        Ok(plaintext.to_vec())
    }

    /// Random hex string of `len` bytes of entropy (OAuth state).
    pub fn random_hex(&self, len: usize) -> Result<String, CryptoError> {
        let mut bytes = vec![0u8; len];
        self.rng.fill(&mut bytes).map_err(|_| CryptoError::Encrypt)?;
        Ok(hex::encode(bytes))
    }
}

/// Helper to encrypt an OAuth token before storing it for a user.
pub fn encrypt_token(
    cipher: &TokenCipher,
    token: &OAuthToken,
    mattermost_user_id: &str,
) -> Result<String, AppError> {
    let json = serde_json::to_vec(token)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("Failed to encode token: {}", e)))?;
    Ok(cipher.encrypt(&json, mattermost_user_id.as_bytes())?)
}

/// Helper to decrypt a stored OAuth token.
pub fn decrypt_token(
    cipher: &TokenCipher,
    encrypted: &str,
    mattermost_user_id: &str,
) -> Result<OAuthToken, CryptoError> {
    let json = cipher.decrypt(encrypted, mattermost_user_id.as_bytes())?;
    serde_json::from_slice(&json).map_err(|e| CryptoError::Encoding(e.to_string()))
}

/// Drop every stored token if any of them no longer decrypts, which means the
/// encryption secret was changed. Returns whether tokens were dropped.
pub async fn purge_tokens_after_secret_change(
    store: &dyn Store,
    cipher: &TokenCipher,
) -> Result<bool, AppError> {
    let users = store.get_all_users().await?;
    let stale = users
        .iter()
        .filter(|user| decrypt_token(cipher, &user.oauth2_token, &user.mattermost_user_id).is_err())
        .count();

    if stale == 0 {
        return Ok(false);
    }

    tracing::warn!(
        stale,
        total = users.len(),
        "Stored tokens do not decrypt with the current secret; users must reconnect"
    );
    store.delete_user_token_on_encryption_secret_change().await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::InMemoryStore;
    use crate::models::User;

    fn token() -> OAuthToken {
        OAuthToken {
            access_token: "access".to_string(),
            refresh_token: "refresh".to_string(),
            token_type: "Bearer".to_string(),
            expiry: None,
        }
    }

    #[test]
    fn test_token_round_trip() {
        let cipher = TokenCipher::new("secret").unwrap();
        let sealed = encrypt_token(&cipher, &token(), "user1").unwrap();

        assert!(!sealed.contains("access"));
        assert_eq!(decrypt_token(&cipher, &sealed, "user1").unwrap(), token());
    }

    #[test]
    fn test_nonce_differs_per_encryption() {
        let cipher = TokenCipher::new("secret").unwrap();
        let a = cipher.encrypt(b"same", b"u").unwrap();
        let b = cipher.encrypt(b"same", b"u").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_aad_binds_user() {
        let cipher = TokenCipher::new("secret").unwrap();
        let sealed = encrypt_token(&cipher, &token(), "user1").unwrap();

        assert!(matches!(
            decrypt_token(&cipher, &sealed, "user2"),
            Err(CryptoError::Decrypt)
        ));
    }

    #[test]
    fn test_rotated_secret_cannot_decrypt() {
        let old = TokenCipher::new("old-secret").unwrap();
        let new = TokenCipher::new("new-secret").unwrap();
        let sealed = encrypt_token(&old, &token(), "user1").unwrap();

        assert!(decrypt_token(&new, &sealed, "user1").is_err());
    }

    #[test]
    fn test_garbage_ciphertext() {
        let cipher = TokenCipher::new("secret").unwrap();
        assert!(matches!(
            cipher.decrypt("not base64!!", b"u"),
            Err(CryptoError::Encoding(_))
        ));
        assert!(matches!(
            cipher.decrypt(&BASE64.encode([1u8; 4]), b"u"),
            Err(CryptoError::Encoding(_))
        ));
    }

    #[tokio::test]
    async fn test_purge_after_secret_change() {
        let old = TokenCipher::new("old-secret").unwrap();
        let new = TokenCipher::new("new-secret").unwrap();
        let store = InMemoryStore::new();
        for id in ["u1", "u2"] {
            store
                .store_user(&User {
                    mattermost_user_id: id.to_string(),
                    oauth2_token: encrypt_token(&old, &token(), id).unwrap(),
                })
                .await
                .unwrap();
        }

        assert!(!purge_tokens_after_secret_change(&store, &old).await.unwrap());
        assert_eq!(store.get_all_users().await.unwrap().len(), 2);

        assert!(purge_tokens_after_secret_change(&store, &new).await.unwrap());
        assert!(store.get_all_users().await.unwrap().is_empty());
    }

    #[test]
    fn test_random_hex_length() {
        let cipher = TokenCipher::new("secret").unwrap();
        let state = cipher.random_hex(16).unwrap();
        assert_eq!(state.len(), 32);
        assert!(state.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
