//! Cryptographically random strings drawn from a 64-symbol alphabet.

use rand::rngs::OsRng;
use rand::RngCore;
use std::fmt;
use std::sync::Arc;

use crate::error::RandomError;

pub const RANDOM_STRING_SOURCE: &[u8; 64] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789_+";

/// A source of cryptographically secure bytes.
///
/// Implementations must report failure instead of producing weaker output.
pub trait SecureRandom: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<(), RandomError>;
}

/// The operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl SecureRandom for OsRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<(), RandomError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|e| RandomError::SourceUnavailable(e.to_string()))
    }
}

#[derive(Clone)]
pub struct RandomStringGenerator {
    source: Arc<dyn SecureRandom>,
}

impl RandomStringGenerator {
    pub fn new(source: impl SecureRandom + 'static) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn random_string(&self, n: usize) -> Result<String, RandomError> {
        if n == 0 {
            return Ok(String::new());
        }

        let mut bytes = vec![0u8; n];
        if let Err(e) = self.source.fill(&mut bytes) {
            tracing::error!(error = %e, "secure random source failed");
            return Err(e);
        }

        // 256 is a multiple of 64, so masking keeps the distribution uniform.
        Ok(bytes
            .into_iter()
            .map(|b| RANDOM_STRING_SOURCE[(b & 0x3F) as usize] as char)
            .collect())
    }
}

impl Default for RandomStringGenerator {
    fn default() -> Self {
        Self::new(OsRandom)
    }
}

impl fmt::Debug for RandomStringGenerator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RandomStringGenerator").finish_non_exhaustive()
    }
}
