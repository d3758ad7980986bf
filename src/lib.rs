//! A concurrent HTTP/1.0 forward proxy with an in-memory LRU response
//! cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod errorpage;
pub mod handler;
pub mod io;
pub mod pool;
pub mod queue;
pub mod upstream;

use std::net::TcpListener;
use std::sync::Arc;

use anyhow::Context;

use cache::Cache;
use config::Limits;
use queue::HandoffQueue;

/// Bind `port` and run the proxy until the process is killed: start
/// `limits.nthreads` workers draining a bounded hand-off queue, then run
/// the accept loop on the calling thread.
pub fn run(port: u16, limits: Limits) -> anyhow::Result<()> {
    let listener = TcpListener::bind(("0.0.0.0", port))
        .with_context(|| format!("failed to bind port {port}"))?;

    tracing::info!(
        port,
        threads = limits.nthreads,
        max_cache_size = limits.max_cache_size,
        max_object_size = limits.max_object_size,
        "starting proxy"
    );

    let cache = Arc::new(Cache::new(limits));
    let queue = Arc::new(HandoffQueue::new(limits.sbufsize));

    pool::spawn_workers(Arc::clone(&queue), Arc::clone(&cache), limits);
    pool::accept_loop(listener, queue);

    Ok(())
}
