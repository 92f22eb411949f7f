//! Component-type-specific delta combination.
//!
//! The merge engine never interprets component bytes itself. When a delta-form
//! change arrives it asks the [`CombinerRegistry`] for the combiner registered
//! for that component key (or the default combiner) and gets back a new
//! full-form state.

use byteorder::{LittleEndian, ReadBytesExt};
use hashbrown::HashMap;
use std::io::{Cursor, Read};
use std::sync::Arc;

use tickreel_shared::ComponentKey;

/// Combines a full-form state with a delta-form state of the same component.
pub trait ComponentCombiner: Send + Sync {
    /// Produce the new full-form state.
    fn combine(&self, key: ComponentKey, base: &[u8], delta: &[u8]) -> Result<Vec<u8>, CombineError>;
}

impl<F> ComponentCombiner for F
where
    F: Fn(ComponentKey, &[u8], &[u8]) -> Result<Vec<u8>, CombineError> + Send + Sync,
{
    fn combine(&self, key: ComponentKey, base: &[u8], delta: &[u8]) -> Result<Vec<u8>, CombineError> {
        self(key, base, delta)
    }
}

/// Error combining a delta with its baseline
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CombineError {
    #[error("delta for {key} is truncated at byte {at}")]
    Truncated { key: ComponentKey, at: u64 },

    #[error("delta for {key} writes at offset {offset} past the end of a {len}-byte state")]
    OffsetOutOfRange {
        key: ComponentKey,
        offset: usize,
        len: usize,
    },

    #[error("delta for {key} rejected: {reason}")]
    Rejected { key: ComponentKey, reason: String },

    #[error("splice of {len} bytes exceeds the {max} byte limit")]
    SpliceTooLong { len: usize, max: usize },
}

// ============================================================================
// Range patch combiner
// ============================================================================

/// Default combiner: a delta is a sequence of byte-range splices.
///
/// Each splice is `offset: u32 LE`, `len: u16 LE`, then `len` bytes written at
/// `offset`. Splices apply in order. A splice may extend the state past its
/// current end, but may not start beyond it.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangePatchCombiner;

impl RangePatchCombiner {
    /// Encode a list of splices into a delta blob.
    pub fn encode(splices: &[(u32, &[u8])]) -> Result<Vec<u8>, CombineError> {
        let mut out = Vec::new();
        for (offset, bytes) in splices {
            let len = u16::try_from(bytes.len()).map_err(|_| CombineError::SpliceTooLong {
                len: bytes.len(),
                max: u16::MAX as usize,
            })?;
            out.extend_from_slice(&offset.to_le_bytes());
            out.extend_from_slice(&len.to_le_bytes());
            out.extend_from_slice(bytes);
        }
        Ok(out)
    }
}

impl ComponentCombiner for RangePatchCombiner {
    fn combine(&self, key: ComponentKey, base: &[u8], delta: &[u8]) -> Result<Vec<u8>, CombineError> {
        let mut state = base.to_vec();
        let mut cursor = Cursor::new(delta);
        let truncated = |cursor: &Cursor<&[u8]>| CombineError::Truncated {
            key,
            at: cursor.position(),
        };

        while (cursor.position() as usize) < delta.len() {
            let offset = cursor
                .read_u32::<LittleEndian>()
                .map_err(|_| truncated(&cursor))? as usize;
            let len = cursor
                .read_u16::<LittleEndian>()
                .map_err(|_| truncated(&cursor))? as usize;

            if offset > state.len() {
                return Err(CombineError::OffsetOutOfRange {
                    key,
                    offset,
                    len: state.len(),
                });
            }

            let mut bytes = vec![0u8; len];
            cursor
                .read_exact(&mut bytes)
                .map_err(|_| truncated(&cursor))?;

            let end = offset + len;
            if end > state.len() {
                state.resize(end, 0);
            }
            state[offset..end].copy_from_slice(&bytes);
        }

        Ok(state)
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Per-component combiners with a fallback for unregistered keys.
#[derive(Clone)]
pub struct CombinerRegistry {
    by_key: HashMap<ComponentKey, Arc<dyn ComponentCombiner>>,
    fallback: Arc<dyn ComponentCombiner>,
}

impl CombinerRegistry {
    /// Registry that uses `fallback` for every key until others are registered.
    pub fn new(fallback: impl ComponentCombiner + 'static) -> Self {
        Self {
            by_key: HashMap::new(),
            fallback: Arc::new(fallback),
        }
    }

    /// Register a combiner for one component key, replacing any previous one.
    pub fn register(&mut self, key: ComponentKey, combiner: impl ComponentCombiner + 'static) {
        self.by_key.insert(key, Arc::new(combiner));
    }

    pub fn with(mut self, key: ComponentKey, combiner: impl ComponentCombiner + 'static) -> Self {
        self.register(key, combiner);
        self
    }

    pub fn combine(&self, key: ComponentKey, base: &[u8], delta: &[u8]) -> Result<Vec<u8>, CombineError> {
        self.by_key
            .get(&key)
            .unwrap_or(&self.fallback)
            .combine(key, base, delta)
    }
}

impl Default for CombinerRegistry {
    fn default() -> Self {
        Self::new(RangePatchCombiner)
    }
}

impl std::fmt::Debug for CombinerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CombinerRegistry")
            .field("registered", &self.by_key.len())
            .finish()
    }
}
