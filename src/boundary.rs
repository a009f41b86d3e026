// File: src/boundary.rs
//! The confidentiality boundary between the word owner and the index holder.
//!
//! Words are sealed to the owner's public credential at insertion time. The
//! index holder keeps and ranks the sealed payloads; only the holder of the
//! matching private credential can open them.
//!
//! Sealing is ephemeral-static X25519 followed by HKDF-SHA256 and
//! ChaCha20-Poly1305, so every payload uses a fresh key and tampering is
//! detected on open.

use crate::error::{AutocompleteError, Result};
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use curve25519_dalek::{montgomery::MontgomeryPoint, scalar::Scalar};
use hkdf::Hkdf;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::info;

/// Domain separator for the payload key derivation.
const SEAL_DOMAIN: &[u8] = b"TYPEAHEAD_SEALED_WORD_v1";

const KEY_SIZE: usize = 32;
const NONCE_SIZE: usize = 12;
const AUTH_TAG_SIZE: usize = 16;

/// Key used to seal words. Safe to hand to the index holder.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublicCredential([u8; KEY_SIZE]);

/// Key used to open payloads. Must stay with the consumer of suggestions.
#[derive(Clone, PartialEq, Eq)]
pub struct PrivateCredential([u8; KEY_SIZE]);

#[derive(Clone)]
pub struct KeyPair {
    private: PrivateCredential,
    public: PublicCredential,
}

fn decode_key(text: &str) -> Result<[u8; KEY_SIZE]> {
    let bytes = hex::decode(text.trim()).map_err(|e| AutocompleteError::Credential(e.to_string()))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        AutocompleteError::Credential(format!("expected {KEY_SIZE} key bytes, got {}", bytes.len()))
    })
}

impl PublicCredential {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        decode_key(text).map(Self)
    }
}

impl fmt::Debug for PublicCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicCredential({})", self.to_hex())
    }
}

impl PrivateCredential {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        decode_key(text).map(Self)
    }

    fn scalar(&self) -> Scalar {
        Scalar::from_bytes_mod_order(self.0)
    }

    pub fn public(&self) -> PublicCredential {
        PublicCredential(MontgomeryPoint::mul_base(&self.scalar()).to_bytes())
    }
}

impl fmt::Debug for PrivateCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrivateCredential(<redacted>)")
    }
}

impl KeyPair {
    pub fn generate() -> Self {
        let mut secret = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut secret);
        Self::from_private(PrivateCredential(secret))
    }

    pub fn from_private(private: PrivateCredential) -> Self {
        let public = private.public();
        Self { private, public }
    }

    pub fn public(&self) -> PublicCredential {
        self.public
    }

    pub fn private(&self) -> &PrivateCredential {
        &self.private
    }

    /// Reads the private credential stored as hex at `key_path`, writing a
    /// fresh one when the file is absent.
    ///
    /// A missing key next to an existing snapshot is an error: the snapshot's
    /// payloads are sealed for the lost key and a new one could open none of them.
    pub fn load_or_generate(key_path: &Path, snapshot_path: &Path) -> Result<Self> {
        if key_path.exists() {
            let text = fs::read_to_string(key_path)?;
            return Ok(Self::from_private(PrivateCredential::from_hex(&text)?));
        }
        if snapshot_path.exists() {
            return Err(AutocompleteError::Credential(format!(
                "key file {} is missing but snapshot {} exists; restore the key or move the snapshot away",
                key_path.display(),
                snapshot_path.display()
            )));
        }
        let keys = Self::generate();
        if let Some(parent) = key_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(key_path, keys.private.to_hex())?;
        info!(path = %key_path.display(), "generated new private credential");
        Ok(keys)
    }
}

impl fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyPair").field("public", &self.public).finish_non_exhaustive()
    }
}

/// One sealed word: `ephemeral_public[32] || nonce[12] || ciphertext+tag`.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EncryptedPayload(Vec<u8>);

impl EncryptedPayload {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(text: &str) -> Result<Self> {
        hex::decode(text.trim())
            .map(Self)
            .map_err(|e| AutocompleteError::Decryption(format!("payload is not hex: {e}")))
    }
}

impl fmt::Debug for EncryptedPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EncryptedPayload({} bytes)", self.0.len())
    }
}

fn derive_key(shared_secret: &[u8; KEY_SIZE], ephemeral_public: &[u8; KEY_SIZE], recipient_public: &[u8; KEY_SIZE]) -> Result<[u8; KEY_SIZE]> {
    let mut info = Vec::with_capacity(2 * KEY_SIZE);
    info.extend_from_slice(ephemeral_public);
    info.extend_from_slice(recipient_public);

    let hkdf = Hkdf::<Sha256>::new(Some(SEAL_DOMAIN), shared_secret);
    let mut output = [0u8; KEY_SIZE];
    hkdf.expand(&info, &mut output)
        .map_err(|_| AutocompleteError::Decryption("HKDF expansion failed".to_string()))?;
    Ok(output)
}

/// Wrap side of the boundary. Holds nothing secret.
#[derive(Debug, Clone)]
pub struct Sealer {
    recipient: PublicCredential,
}

impl Sealer {
    pub fn new(recipient: PublicCredential) -> Self {
        Self { recipient }
    }

    pub fn credential(&self) -> PublicCredential {
        self.recipient
    }

    pub fn wrap(&self, word: &str) -> Result<EncryptedPayload> {
        let mut ephemeral_bytes = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut ephemeral_bytes);
        let ephemeral_scalar = Scalar::from_bytes_mod_order(ephemeral_bytes);
        let ephemeral_public = MontgomeryPoint::mul_base(&ephemeral_scalar);

        let recipient_point = MontgomeryPoint(*self.recipient.as_bytes());
        let shared_secret = ephemeral_scalar * recipient_point;
        if shared_secret.as_bytes() == &[0u8; KEY_SIZE] {
            return Err(AutocompleteError::Credential("public credential is a low-order point".to_string()));
        }
        let key = derive_key(shared_secret.as_bytes(), ephemeral_public.as_bytes(), self.recipient.as_bytes())?;

        let mut nonce = [0u8; NONCE_SIZE];
        OsRng.fill_bytes(&mut nonce);

        let cipher = ChaCha20Poly1305::new((&key).into());
        let ciphertext = cipher
            .encrypt(Nonce::from_slice(&nonce), word.as_bytes())
            .map_err(|_| AutocompleteError::Credential("sealing failed".to_string()))?;

        let mut sealed = Vec::with_capacity(KEY_SIZE + NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(ephemeral_public.as_bytes());
        sealed.extend_from_slice(&nonce);
        sealed.extend_from_slice(&ciphertext);
        Ok(EncryptedPayload(sealed))
    }
}

/// Unwrap side of the boundary. Lives with whoever consumes suggestions.
#[derive(Debug, Clone)]
pub struct Opener {
    private: PrivateCredential,
    public: PublicCredential,
}

impl Opener {
    pub fn new(private: PrivateCredential) -> Self {
        let public = private.public();
        Self { private, public }
    }

    pub fn credential(&self) -> PublicCredential {
        self.public
    }

    pub fn unwrap(&self, payload: &EncryptedPayload) -> Result<String> {
        let bytes = payload.as_bytes();
        if bytes.len() < KEY_SIZE + NONCE_SIZE + AUTH_TAG_SIZE {
            return Err(AutocompleteError::Decryption(format!("payload too short ({} bytes)", bytes.len())));
        }
        let (ephemeral, rest) = bytes.split_at(KEY_SIZE);
        let (nonce, ciphertext) = rest.split_at(NONCE_SIZE);

        let mut ephemeral_public = [0u8; KEY_SIZE];
        ephemeral_public.copy_from_slice(ephemeral);
        let shared_secret = self.private.scalar() * MontgomeryPoint(ephemeral_public);
        let key = derive_key(shared_secret.as_bytes(), &ephemeral_public, self.public.as_bytes())?;

        let cipher = ChaCha20Poly1305::new((&key).into());
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AutocompleteError::Decryption("wrong credential or tampered payload".to_string()))?;
        String::from_utf8(plaintext).map_err(|_| AutocompleteError::Decryption("payload is not UTF-8".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_matching_credential() {
        let keys = KeyPair::generate();
        let sealer = Sealer::new(keys.public());
        let opener = Opener::new(keys.private().clone());
        for word in ["cat", "carbon", "नमस्ते", "a"] {
            let payload = sealer.wrap(word).unwrap();
            assert_eq!(opener.unwrap(&payload).unwrap(), word);
        }
    }

    #[test]
    fn mismatched_credential_fails() {
        let owner = KeyPair::generate();
        let stranger = KeyPair::generate();
        let payload = Sealer::new(owner.public()).wrap("secret").unwrap();
        let err = Opener::new(stranger.private().clone()).unwrap(&payload).unwrap_err();
        assert!(matches!(err, AutocompleteError::Decryption(_)));
    }

    #[test]
    fn tampering_is_detected() {
        let keys = KeyPair::generate();
        let payload = Sealer::new(keys.public()).wrap("door").unwrap();
        let mut bytes = payload.as_bytes().to_vec();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let opener = Opener::new(keys.private().clone());
        assert!(opener.unwrap(&EncryptedPayload::from_bytes(bytes)).is_err());
        assert!(opener.unwrap(&EncryptedPayload::from_bytes(vec![0; 10])).is_err());
    }

    #[test]
    fn sealing_is_randomised() {
        let keys = KeyPair::generate();
        let sealer = Sealer::new(keys.public());
        assert_ne!(sealer.wrap("dog").unwrap(), sealer.wrap("dog").unwrap());
    }

    #[test]
    fn credentials_survive_hex() {
        let keys = KeyPair::generate();
        let restored = KeyPair::from_private(PrivateCredential::from_hex(&keys.private().to_hex()).unwrap());
        assert_eq!(restored.public(), keys.public());
        assert_eq!(PublicCredential::from_hex(&keys.public().to_hex()).unwrap(), keys.public());
        assert!(PublicCredential::from_hex("abcd").is_err());
        assert!(PrivateCredential::from_hex("not hex").is_err());
    }

    #[test]
    fn key_file_is_generated_once_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("keys").join("typeahead.key");
        let snapshot_path = dir.path().join("typeahead.snapshot");
        let first = KeyPair::load_or_generate(&key_path, &snapshot_path).unwrap();
        let second = KeyPair::load_or_generate(&key_path, &snapshot_path).unwrap();
        assert_eq!(first.public(), second.public());
    }

    #[test]
    fn lost_key_next_to_a_snapshot_is_not_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let key_path = dir.path().join("typeahead.key");
        let snapshot_path = dir.path().join("typeahead.snapshot");
        fs::write(&snapshot_path, b"sealed for someone").unwrap();
        let err = KeyPair::load_or_generate(&key_path, &snapshot_path).unwrap_err();
        assert!(matches!(err, AutocompleteError::Credential(_)));
        assert!(!key_path.exists());
    }

    #[test]
    fn private_key_is_not_printed() {
        let keys = KeyPair::generate();
        let shown = format!("{:?}", keys.private());
        assert!(!shown.contains(&keys.private().to_hex()));
    }
}
