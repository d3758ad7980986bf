//! Tunable limits shared by the cache and the hand-off queue.
//!
//! There is no config file or environment variable in this system.
//! `Limits` just gives the five constants a typed home so tests can
//! shrink the cache/queue instead of touching process-wide state.

/// The five byte/count tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Total bytes the cache may hold across all live entries.
    pub max_cache_size: usize,
    /// Largest single object the cache will admit.
    pub max_object_size: usize,
    /// Longest request/header line the handler will read.
    pub maxline: usize,
    /// Number of worker threads in the pool.
    pub nthreads: usize,
    /// Capacity of the hand-off queue.
    pub sbufsize: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_cache_size: 1_049_000,
            max_object_size: 102_400,
            maxline: 8192,
            nthreads: 4,
            sbufsize: 16,
        }
    }
}
