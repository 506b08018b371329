use rand::{rngs::OsRng, RngCore};
use thiserror::Error;

/// Symbols a short code is drawn from.
pub const ALPHABET: &[u8; 62] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Default length of a generated short code.
pub const DEFAULT_CODE_LENGTH: usize = 10;

/// The secure random source could not supply bytes.
#[derive(Debug, Error)]
#[error("secure random source unavailable: {0}")]
pub struct EntropyError(String);

impl EntropyError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl From<rand::Error> for EntropyError {
    fn from(err: rand::Error) -> Self {
        Self(err.to_string())
    }
}

/// Produces candidate short codes.
///
/// Implementations are pure generators that don't interact with storage;
/// collision avoidance is the caller's job.
pub trait CodeGenerator: Send + Sync + 'static {
    /// Returns a candidate code of exactly `length` characters.
    fn generate(&self, length: usize) -> Result<String, EntropyError>;
}

/// Draws every character from the operating system CSPRNG.
///
/// Each byte is reduced modulo 62 and used as an index into [`ALPHABET`].
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: usize) -> Result<String, EntropyError> {
        let mut bytes = vec![0u8; length];
        OsRng.try_fill_bytes(&mut bytes)?;

        Ok(bytes
            .iter()
            .map(|b| ALPHABET[*b as usize % ALPHABET.len()] as char)
            .collect())
    }
}
