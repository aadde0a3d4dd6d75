use crate::generator::Generator;
use itinera_core::ShareableId;
use std::sync::atomic::{AtomicU64, Ordering};

/// A deterministic token generator using a sequential counter.
///
/// Tokens are the hex encoding of a 32-bit node id followed by a 64-bit
/// counter, e.g. `00000001` + `0000000000000000`. Uniqueness holds within a
/// single instance; separate nodes need separate node ids. Tokens are
/// predictable, so this is meant for tests and local tooling.
#[derive(Debug)]
pub struct SeqTokenGenerator {
    counter: AtomicU64,
    node: u32,
}

impl SeqTokenGenerator {
    pub fn new(node: u32) -> Self {
        Self::with_offset(node, 0)
    }

    /// Starts counting from `offset` instead of zero.
    pub fn with_offset(node: u32, offset: u64) -> Self {
        Self {
            counter: AtomicU64::new(offset),
            node,
        }
    }
}

impl Generator for SeqTokenGenerator {
    type Output = ShareableId;

    fn generate(&self) -> ShareableId {
        let count = self.counter.fetch_add(1, Ordering::SeqCst);
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&self.node.to_be_bytes());
        bytes[4..].copy_from_slice(&count.to_be_bytes());
        ShareableId::from_bytes(&bytes)
    }
}
