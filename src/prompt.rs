//! Interactive passphrase entry.

use crate::cipher::{Cipher, KNOWN_CIPHERTEXT, KNOWN_PLAINTEXT};
use crate::error::{CipherError, ConvertError, Result};
use log::{debug, warn};
use rpassword::prompt_password;

pub struct PassphrasePrompt {
    pub prompt: String,
    pub max_attempts: Option<usize>,
    check: Vec<u32>,
    plaintext: String,
}

impl PassphrasePrompt {
    pub fn new(prompt: &str) -> PassphrasePrompt {
        PassphrasePrompt {
            prompt: prompt.to_string(),
            max_attempts: None,
            check: KNOWN_CIPHERTEXT.to_vec(),
            plaintext: KNOWN_PLAINTEXT.to_string(),
        }
    }

    pub fn max_attempts(mut self, attempts: usize) -> Self {
        self.max_attempts = Some(attempts);
        self
    }

    /// Verify passphrases against another vector than the export's.
    pub fn check_vector(mut self, check: &[u32], plaintext: &str) -> Self {
        self.check = check.to_vec();
        self.plaintext = plaintext.to_string();
        self
    }

    /// Ask on the terminal until a passphrase passes the known-plaintext check.
    pub fn unlock(&self) -> Result<Cipher> {
        self.unlock_with(|| prompt_password(&self.prompt))
    }

    /// Like `unlock`, reading passphrases from `read` instead of the terminal.
    pub fn unlock_with<F>(&self, mut read: F) -> Result<Cipher>
    where
        F: FnMut() -> std::io::Result<String>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let passphrase = read()?;
            match Cipher::unlock_against(&passphrase, &self.check, &self.plaintext) {
                Ok(cipher) => {
                    debug!("Passphrase accepted after {} attempt(s)", attempt);
                    return Ok(cipher);
                }
                Err(err) => {
                    warn!("Attempt {}: {}", attempt, err);
                    eprintln!("Password incorrect!");
                    if self.max_attempts.map_or(false, |max| attempt >= max) {
                        return Err(ConvertError::Cipher(CipherError::WrongPassphrase));
                    }
                }
            }
        }
    }
}
