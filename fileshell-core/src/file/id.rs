use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, OnceLock};

use rand::distributions::Alphanumeric;
use rand::Rng;

const DEFAULT_ID_LEN: usize = 6;
/// Draws at one length before moving on to ids one character longer.
const MAX_ATTEMPTS_PER_LEN: usize = 1_000;

/// Hands out file manager identifiers. Implementations must never return the
/// same identifier twice for the lifetime of the allocator.
pub trait IdAllocator: Send + Sync {
    fn allocate(&self) -> String;
}

/// Random alphanumeric identifiers, collision-checked against every
/// identifier this allocator has issued. When ids of the configured length
/// keep colliding the allocator switches to longer ones, so allocation always
/// terminates.
pub struct RandomIdAllocator {
    issued: Mutex<Issued>,
}

struct Issued {
    len: usize,
    ids: HashSet<String>,
}

impl RandomIdAllocator {
    pub fn new(len: usize) -> Self {
        Self {
            issued: Mutex::new(Issued {
                len: len.max(1),
                ids: HashSet::new(),
            }),
        }
    }

    /// The process-wide allocator used when a manager is built without an
    /// explicit one.
    pub fn global() -> Arc<dyn IdAllocator> {
        static GLOBAL: OnceLock<Arc<RandomIdAllocator>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(RandomIdAllocator::new(DEFAULT_ID_LEN)))
            .clone()
    }
}

impl Default for RandomIdAllocator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LEN)
    }
}

impl IdAllocator for RandomIdAllocator {
    fn allocate(&self) -> String {
        let mut issued = self.issued.lock().unwrap_or_else(|e| e.into_inner());
        let mut rng = rand::thread_rng();
        loop {
            for _ in 0..MAX_ATTEMPTS_PER_LEN {
                let id: String = (&mut rng)
                    .sample_iter(&Alphanumeric)
                    .take(issued.len)
                    .map(char::from)
                    .collect();
                if issued.ids.insert(id.clone()) {
                    return id;
                }
            }
            issued.len += 1;
            tracing::debug!(len = issued.len, "Id space crowded, lengthening ids");
        }
    }
}

/// Deterministic `<prefix><n>` identifiers, for tests.
pub struct SequentialIdAllocator {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIdAllocator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }
}

impl IdAllocator for SequentialIdAllocator {
    fn allocate(&self) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        format!("{}{n}", self.prefix)
    }
}
