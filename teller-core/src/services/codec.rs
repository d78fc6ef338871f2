//! Balance codec - encrypts balances at rest
//!
//! Balances are stored as `hex(nonce):hex(ciphertext)` where the plaintext is
//! the two-decimal dollar string (`"1000.00"`). The AES-256-GCM key is the
//! SHA-256 digest of the configured secret, so any secret length works.

use std::fmt;

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use rand::{thread_rng, Rng};
use sha2::{Digest, Sha256};

use crate::domain::result::{Error, Result};
use crate::domain::{Account, Cents};

const NONCE_LEN: usize = 12;

/// Symmetric encryption for stored balances
#[derive(Clone)]
pub struct BalanceCodec {
    cipher: Aes256Gcm,
}

impl fmt::Debug for BalanceCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BalanceCodec").field("cipher", &"<redacted>").finish()
    }
}

impl BalanceCodec {
    pub fn new(secret: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self {
            cipher: Aes256Gcm::new(&key.into()),
        }
    }

    /// Encrypt a balance with a fresh random nonce.
    ///
    /// Two calls with the same amount produce different strings.
    pub fn encrypt(&self, balance: Cents) -> Result<String> {
        let nonce_bytes = thread_rng().gen::<[u8; NONCE_LEN]>();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, balance.to_string().as_bytes())
            .map_err(|_| Error::database("balance encryption failed"))?;
        Ok(format!("{}:{}", hex::encode(nonce_bytes), hex::encode(ciphertext)))
    }

    /// Decrypt a stored balance. Any malformed, tampered or unparsable
    /// value is a [`Error::CorruptBalance`], never zero.
    pub fn decrypt(&self, stored: &str) -> Result<Cents> {
        self.decode(stored).map_err(|reason| Error::CorruptBalance {
            account_id: None,
            reason,
        })
    }

    /// Decrypt an account's balance, tagging failures with its id
    pub fn decrypt_for(&self, account: &Account) -> Result<Cents> {
        self.decode(&account.encrypted_balance)
            .map_err(|reason| Error::corrupt_balance(account.id, reason))
    }

    fn decode(&self, stored: &str) -> std::result::Result<Cents, String> {
        let (nonce_hex, ct_hex) = stored
            .split_once(':')
            .ok_or_else(|| "missing nonce delimiter".to_string())?;
        let nonce_bytes = hex::decode(nonce_hex).map_err(|e| format!("bad nonce hex: {}", e))?;
        if nonce_bytes.len() != NONCE_LEN {
            return Err(format!("nonce must be {} bytes, got {}", NONCE_LEN, nonce_bytes.len()));
        }
        let ciphertext = hex::decode(ct_hex).map_err(|e| format!("bad ciphertext hex: {}", e))?;

        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(&nonce_bytes), ciphertext.as_ref())
            .map_err(|_| "authentication failed".to_string())?;
        let text = std::str::from_utf8(&plaintext).map_err(|_| "plaintext is not UTF-8".to_string())?;
        text.parse::<Cents>().map_err(|e| e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::MAX_CENTS;
    use uuid::Uuid;

    #[test]
    fn test_round_trip_at_boundaries() {
        let codec = BalanceCodec::new("test-secret");
        for cents in [0, 1, 99, 100_000, 25_050, MAX_CENTS] {
            let value = Cents::new(cents).unwrap();
            let stored = codec.encrypt(value).unwrap();
            assert_eq!(codec.decrypt(&stored).unwrap(), value);
        }
    }

    #[test]
    fn test_encryption_is_not_deterministic() {
        let codec = BalanceCodec::new("test-secret");
        let value = Cents::new(100_000).unwrap();
        let a = codec.encrypt(value).unwrap();
        let b = codec.encrypt(value).unwrap();
        assert_ne!(a, b);
        assert_eq!(a.split_once(':').unwrap().0.len(), NONCE_LEN * 2);
    }

    #[test]
    fn test_tampered_ciphertext_is_corrupt() {
        let codec = BalanceCodec::new("test-secret");
        let stored = codec.encrypt(Cents::new(100_000).unwrap()).unwrap();
        let (nonce, ct) = stored.split_once(':').unwrap();
        let mut bytes = hex::decode(ct).unwrap();
        bytes[0] ^= 0x01;
        let tampered = format!("{}:{}", nonce, hex::encode(bytes));

        assert!(matches!(
            codec.decrypt(&tampered),
            Err(Error::CorruptBalance { .. })
        ));
    }

    #[test]
    fn test_wrong_key_is_corrupt() {
        let stored = BalanceCodec::new("one").encrypt(Cents::new(500).unwrap()).unwrap();
        assert!(BalanceCodec::new("two").decrypt(&stored).is_err());
    }

    #[test]
    fn test_malformed_values_are_corrupt() {
        let codec = BalanceCodec::new("test-secret");
        for bad in ["", "no-delimiter", "zz:00", "0011:abcd", "000000000000000000000000:"] {
            let err = codec.decrypt(bad).unwrap_err();
            assert!(err.is_integrity_fault(), "{:?} should be corrupt", bad);
        }
    }

    #[test]
    fn test_decrypt_for_tags_account() {
        let codec = BalanceCodec::new("test-secret");
        let account = Account::new(Uuid::new_v4(), "Alice", "alice@example.com", "garbage");
        match codec.decrypt_for(&account) {
            Err(Error::CorruptBalance { account_id, .. }) => assert_eq!(account_id, Some(account.id)),
            other => panic!("expected corrupt balance, got {:?}", other),
        }
    }

    #[test]
    fn test_debug_hides_key() {
        let codec = BalanceCodec::new("super-secret");
        assert!(!format!("{:?}", codec).contains("super"));
    }
}
