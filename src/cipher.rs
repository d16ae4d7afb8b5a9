//! Blowfish decoding for the html export's record blocks.
//!
//! A block is a header word followed by big-endian (L, R) word pairs, each
//! pair being one ECB-enciphered 8 byte chunk of text padded with NULs.
//! There is no IV and no authentication; a wrong passphrase only shows up
//! through the known-plaintext check.

use crate::error::{CipherError, ConvertError, Result};
use blowfish::cipher::generic_array::GenericArray;
use blowfish::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use blowfish::Blowfish;
use log::trace;

/// Test vector every export carries alongside its records.
pub const KNOWN_CIPHERTEXT: [u32; 3] = [0, 0xc1a9741e, 0x5b2177a0];
pub const KNOWN_PLAINTEXT: &str = "091827";

const MIN_KEY_LEN: usize = 4;
const MAX_KEY_LEN: usize = 56;

pub struct Cipher {
    blowfish: Blowfish,
}

impl Cipher {
    /// Derive the key schedule from a passphrase without checking it.
    pub fn new(passphrase: &str) -> std::result::Result<Cipher, CipherError> {
        let key = expand_key(passphrase.as_bytes())?;
        let blowfish: Blowfish = Blowfish::new_from_slice(&key)
            .map_err(|_| CipherError::InvalidKeyLength(passphrase.len()))?;
        Ok(Cipher { blowfish })
    }

    /// Derive the key schedule and reject it unless it deciphers the test vector.
    pub fn unlock(passphrase: &str) -> std::result::Result<Cipher, CipherError> {
        Cipher::unlock_against(passphrase, &KNOWN_CIPHERTEXT, KNOWN_PLAINTEXT)
    }

    /// Like `unlock`, checking against a caller supplied vector.
    pub fn unlock_against(
        passphrase: &str,
        check: &[u32],
        plaintext: &str,
    ) -> std::result::Result<Cipher, CipherError> {
        let cipher = Cipher::new(passphrase)?;
        if cipher.verify_against(check, plaintext) {
            Ok(cipher)
        } else {
            Err(CipherError::WrongPassphrase)
        }
    }

    pub fn verify(&self) -> bool {
        self.verify_against(&KNOWN_CIPHERTEXT, KNOWN_PLAINTEXT)
    }

    pub fn verify_against(&self, check: &[u32], plaintext: &str) -> bool {
        matches!(self.decode(check), Ok(text) if text == plaintext)
    }

    pub fn decode(&self, words: &[u32]) -> Result<String> {
        let body = match words.split_first() {
            Some((_header, body)) => body,
            None => return Ok(String::new()),
        };
        if body.len() % 2 != 0 {
            return Err(ConvertError::MalformedRecord {
                reason: format!("odd number of cipher words ({})", body.len()),
            });
        }
        trace!("Deciphering {} blocks", body.len() / 2);

        let mut bytes = Vec::with_capacity(body.len() * 4);
        for pair in body.chunks_exact(2) {
            let mut raw = [0u8; 8];
            raw[..4].copy_from_slice(&pair[0].to_be_bytes());
            raw[4..].copy_from_slice(&pair[1].to_be_bytes());
            let mut block = GenericArray::from(raw);
            self.blowfish.decrypt_block(&mut block);
            bytes.extend_from_slice(&block);
        }
        while bytes.last() == Some(&0) {
            bytes.pop();
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Inverse of `decode`, producing a block with a zero header word.
    ///
    /// Exports are never written by this crate; this builds fixtures and
    /// check vectors for tests.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        let mut bytes = text.as_bytes().to_vec();
        while bytes.len() % 8 != 0 {
            bytes.push(0);
        }

        let mut words = Vec::with_capacity(1 + bytes.len() / 4);
        words.push(0);
        for chunk in bytes.chunks_exact(8) {
            let mut block = GenericArray::clone_from_slice(chunk);
            self.blowfish.encrypt_block(&mut block);
            words.push(u32::from_be_bytes([block[0], block[1], block[2], block[3]]));
            words.push(u32::from_be_bytes([block[4], block[5], block[6], block[7]]));
        }
        words
    }
}

// The classic key schedule cycles the key over the P-array, so repeating a
// short key whole leaves the schedule unchanged.
fn expand_key(key: &[u8]) -> std::result::Result<Vec<u8>, CipherError> {
    if key.is_empty() || key.len() > MAX_KEY_LEN {
        return Err(CipherError::InvalidKeyLength(key.len()));
    }
    let mut expanded = key.to_vec();
    while expanded.len() < MIN_KEY_LEN {
        expanded.extend_from_slice(key);
    }
    Ok(expanded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decode_inverts_encode() {
        let cipher = Cipher::new("hunter22").unwrap();
        let text = "<h3>Bank<span></span></h3><table></table>";
        let words = cipher.encode(text);
        assert_eq!(words[0], 0);
        assert_eq!((words.len() - 1) % 2, 0);
        assert_eq!(cipher.decode(&words).unwrap(), text);
    }

    #[test]
    fn decode_keeps_multibyte_text() {
        let cipher = Cipher::new("hunter22").unwrap();
        let words = cipher.encode("Café ∞");
        assert_eq!(cipher.decode(&words).unwrap(), "Café ∞");
    }

    #[test]
    fn different_key_does_not_decode() {
        let words = Cipher::new("right-key").unwrap().encode("091827");
        let other = Cipher::new("wrong-key").unwrap();
        assert_ne!(other.decode(&words).unwrap(), "091827");
    }

    #[test]
    fn unrelated_passphrase_fails_known_plaintext_check() {
        let cipher = Cipher::new("definitely not the export passphrase").unwrap();
        assert!(!cipher.verify());
        assert_eq!(
            Cipher::unlock("definitely not the export passphrase").err(),
            Some(CipherError::WrongPassphrase)
        );
    }

    #[test]
    fn matching_key_passes_check_vector() {
        let check = Cipher::new("export key").unwrap().encode(KNOWN_PLAINTEXT);
        let cipher = Cipher::unlock_against("export key", &check, KNOWN_PLAINTEXT).unwrap();
        assert!(cipher.verify_against(&check, KNOWN_PLAINTEXT));
        assert_eq!(cipher.decode(&check).unwrap(), "091827");
        assert_eq!(
            Cipher::unlock_against("other key", &check, KNOWN_PLAINTEXT).err(),
            Some(CipherError::WrongPassphrase)
        );
    }

    #[test]
    fn short_keys_cycle() {
        let short = Cipher::new("ab").unwrap();
        let cycled = Cipher::new("abab").unwrap();
        assert_eq!(short.encode("091827"), cycled.encode("091827"));
    }

    #[test]
    fn rejects_empty_and_oversized_keys() {
        assert_eq!(Cipher::new("").err(), Some(CipherError::InvalidKeyLength(0)));
        let long = "x".repeat(57);
        assert_eq!(
            Cipher::new(&long).err(),
            Some(CipherError::InvalidKeyLength(57))
        );
    }

    #[test]
    fn odd_word_count_is_malformed() {
        let cipher = Cipher::new("hunter22").unwrap();
        assert!(cipher.decode(&[0, 1, 2, 3]).is_err());
        assert_eq!(cipher.decode(&[]).unwrap(), "");
        assert_eq!(cipher.decode(&[0]).unwrap(), "");
    }
}
