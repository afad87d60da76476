use portable_atomic::{AtomicU64, Ordering};
#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::{TempId, TempIdGenerator};

/// A lock-free counter-backed [`TempIdGenerator`].
///
/// The counter lives in an [`AtomicU64`] and is advanced with a single
/// `fetch_add`, so concurrent callers can neither lose nor duplicate a value.
///
/// ## Features
/// - ✅ Thread-safe
/// - ✅ Deterministic: a fresh generator always starts at the same value
///
/// ## Caveats
/// The rendered token has room for 14 decimal digits. Exhausting that space
/// (more than 10^14 mints in a single run) is not guarded against.
///
/// # Example
/// ```
/// use tempgroup::{AtomicTempIdGenerator, TempIdGenerator};
///
/// let generator = AtomicTempIdGenerator::new();
/// assert_eq!(generator.next_id().to_string(), "T00000000000000");
/// assert_eq!(generator.next_id().to_string(), "T00000000000001");
/// ```
#[derive(Debug)]
pub struct AtomicTempIdGenerator {
    counter: AtomicU64,
    start: u64,
}

impl AtomicTempIdGenerator {
    /// Creates a generator whose first ID is `T00000000000000`.
    pub const fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a generator whose first ID carries `start` as its suffix.
    ///
    /// Useful for tests that need a known, non-zero starting point.
    pub const fn starting_at(start: u64) -> Self {
        Self {
            counter: AtomicU64::new(start),
            start,
        }
    }

    /// Returns how many IDs this generator has handed out so far.
    pub fn minted(&self) -> u64 {
        self.counter.load(Ordering::Relaxed) - self.start
    }
}

impl Default for AtomicTempIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TempIdGenerator for AtomicTempIdGenerator {
    #[cfg_attr(feature = "tracing", instrument(level = "trace", skip(self)))]
    fn next_id(&self) -> TempId {
        // Relaxed is enough: uniqueness and per-caller ordering only depend on
        // the atomicity of the read-modify-write itself.
        TempId::from_raw(self.counter.fetch_add(1, Ordering::Relaxed))
    }
}
