pub mod seq;

use itinera_core::ShareableId;
use rand::RngCore;

const MIN_TOKEN_BYTES: usize = 8;
const MAX_TOKEN_BYTES: usize = 32;

/// Trait for generating share tokens.
///
/// Implementations are pure generators that don't interact with the cache.
/// Tokens are not checked for uniqueness before use, so a generator must
/// make collisions negligible on its own.
pub trait Generator: Send + Sync + 'static {
    type Output: Into<ShareableId>;

    fn generate(&self) -> Self::Output;
}

/// Draws tokens from the thread-local CSPRNG.
///
/// The default of 8 bytes (16 hex characters) gives 64 bits of entropy.
#[derive(Debug, Clone, Copy)]
pub struct RandomTokenGenerator {
    bytes: usize,
}

impl RandomTokenGenerator {
    pub fn new() -> Self {
        Self {
            bytes: MIN_TOKEN_BYTES,
        }
    }

    /// Uses `bytes` random bytes per token, clamped to 8..=32.
    pub fn with_bytes(bytes: usize) -> Self {
        Self {
            bytes: bytes.clamp(MIN_TOKEN_BYTES, MAX_TOKEN_BYTES),
        }
    }
}

impl Default for RandomTokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl Generator for RandomTokenGenerator {
    type Output = ShareableId;

    fn generate(&self) -> ShareableId {
        let mut buf = [0u8; MAX_TOKEN_BYTES];
        let buf = &mut buf[..self.bytes];
        rand::rng().fill_bytes(buf);
        ShareableId::from_bytes(buf)
    }
}
