//! Worker pool and accept loop.

use std::net::{TcpListener, TcpStream};
use std::panic;
use std::sync::Arc;
use std::thread;

use crate::cache::Cache;
use crate::config::Limits;
use crate::handler::handle_connection;
use crate::queue::HandoffQueue;

/// Spawn `limits.nthreads` worker threads, each looping forever:
/// `queue.remove()`, handle the connection, drop it. Workers never exit
/// in production: `queue.remove()` only returns `None` after
/// [`HandoffQueue::close`](crate::queue::HandoffQueue::close), which the
/// accept loop never calls.
///
/// A panic inside a single connection's handler is caught so one bad
/// connection cannot take a worker thread down with it.
pub fn spawn_workers(
    queue: Arc<HandoffQueue<TcpStream>>,
    cache: Arc<Cache>,
    limits: Limits,
) -> Vec<thread::JoinHandle<()>> {
    (0..limits.nthreads)
        .map(|id| {
            let queue = Arc::clone(&queue);
            let cache = Arc::clone(&cache);
            thread::Builder::new()
                .name(format!("proxy-worker-{id}"))
                .spawn(move || worker_loop(&queue, &cache, limits))
                .expect("failed to spawn worker thread")
        })
        .collect()
}

fn worker_loop(queue: &HandoffQueue<TcpStream>, cache: &Cache, limits: Limits) {
    while let Some(client) = queue.remove() {
        let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
            handle_connection(cache, client, limits);
        }));
        if result.is_err() {
            tracing::error!("connection handler panicked; worker continuing");
        }
    }
}

/// Bind `listener` and forever accept connections, pushing each accepted
/// socket onto `queue` for a worker to pick up. Blocks the calling
/// thread; returns only if `accept` itself errors out, which in practice
/// means the listener was closed.
pub fn accept_loop(listener: TcpListener, queue: Arc<HandoffQueue<TcpStream>>) {
    loop {
        match listener.accept() {
            Ok((stream, addr)) => {
                tracing::debug!(peer = %addr, "accepted connection");
                queue.insert(stream);
            }
            Err(e) => {
                tracing::warn!(error = %e, "accept failed");
            }
        }
    }
}
