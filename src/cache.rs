//! Doubly-linked LRU object cache.
//!
//! Storage is an arena of slots addressed by stable `usize` indices
//! rather than raw pointers. `head`/`tail` and each node's `prev`/`next`
//! are `Option<usize>` slot indices; a free list recycles slots vacated
//! by eviction.

use std::sync::RwLock;

use bytes::Bytes;

use crate::config::Limits;

struct Node {
    uri: Box<[u8]>,
    body: Bytes,
    prev: Option<usize>,
    next: Option<usize>,
}

struct Inner {
    arena: Vec<Option<Node>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
    current_size: usize,
}

impl Inner {
    /// Byte-exact linear scan from `head` to `tail`. A fresh insert
    /// always links at `head`, so the scan reaches the newest entry for
    /// a given URI first even if an older, stale entry for the same URI
    /// is still alive further down the list.
    fn find_slot(&self, uri: &[u8]) -> Option<usize> {
        let mut cur = self.head;
        while let Some(idx) = cur {
            let node = self.arena[idx].as_ref().expect("live slot in the list");
            if &*node.uri == uri {
                return Some(idx);
            }
            cur = node.next;
        }
        None
    }

    fn unlink_tail(&mut self) {
        let Some(t) = self.tail else { return };
        let node = self.arena[t].as_ref().expect("tail slot is live");
        let prev = node.prev;
        self.current_size -= node.body.len();

        if let Some(p) = prev {
            self.arena[p].as_mut().expect("prev slot is live").next = None;
        }
        self.tail = prev;
        if self.head == Some(t) {
            self.head = None;
        }

        self.arena[t] = None;
        self.free.push(t);
    }

    fn push_head(&mut self, uri: Box<[u8]>, body: Bytes) {
        let len = body.len();
        let slot = self.free.pop().unwrap_or_else(|| {
            self.arena.push(None);
            self.arena.len() - 1
        });

        self.arena[slot] = Some(Node {
            uri,
            body,
            prev: None,
            next: self.head,
        });

        if let Some(h) = self.head {
            self.arena[h].as_mut().expect("old head is live").prev = Some(slot);
        }
        self.head = Some(slot);
        if self.tail.is_none() {
            self.tail = Some(slot);
        }
        self.current_size += len;
    }

    /// Invariant check used by tests: the list is acyclic and
    /// bidirectionally consistent, emptiness iff `head = tail = None`.
    #[cfg(test)]
    fn check_invariants(&self, max_cache_size: usize, max_object_size: usize) {
        assert!(self.current_size <= max_cache_size);
        assert_eq!(self.head.is_none(), self.tail.is_none());

        let mut seen = std::collections::HashSet::new();
        let mut cur = self.head;
        let mut prev = None;
        let mut total = 0usize;
        while let Some(idx) = cur {
            assert!(seen.insert(idx), "cycle detected in cache list");
            let node = self.arena[idx].as_ref().unwrap();
            assert_eq!(node.prev, prev);
            assert!(node.body.len() <= max_object_size);
            total += node.body.len();
            prev = Some(idx);
            cur = node.next;
        }
        assert_eq!(prev, self.tail);
        assert_eq!(total, self.current_size);
    }
}

/// A process-wide (or per-test) URI → body LRU cache.
///
/// Concurrency discipline: an `RwLock` around the arena. A shared read
/// lock lets concurrent [`find`](Self::find) calls proceed together; an
/// exclusive write lock serializes [`insert`](Self::insert) against
/// every other `insert` and `find`.
pub struct Cache {
    inner: RwLock<Inner>,
    max_cache_size: usize,
    max_object_size: usize,
}

impl Cache {
    /// Build an empty cache sized per `limits`.
    pub fn new(limits: Limits) -> Self {
        Self {
            inner: RwLock::new(Inner {
                arena: Vec::new(),
                free: Vec::new(),
                head: None,
                tail: None,
                current_size: 0,
            }),
            max_cache_size: limits.max_cache_size,
            max_object_size: limits.max_object_size,
        }
    }

    /// Exact-byte lookup. Recency is **not** updated on a hit: the
    /// eviction victim is the least-recently *inserted* object, not the
    /// least-recently used one, and a hit takes only a shared read lock
    /// and never restructures the list.
    pub fn find(&self, uri: &[u8]) -> Option<Bytes> {
        let inner = self.inner.read().unwrap();
        let idx = inner.find_slot(uri)?;
        Some(inner.arena[idx].as_ref().unwrap().body.clone())
    }

    /// Admit `body` under `uri`, evicting from the tail until it fits.
    /// A no-op if `body.len() > max_object_size`; oversize objects are
    /// still streamed to the client by the handler, just never cached.
    pub fn insert(&self, uri: &[u8], body: Bytes) {
        if body.len() > self.max_object_size {
            return;
        }

        let mut inner = self.inner.write().unwrap();
        while inner.current_size + body.len() > self.max_cache_size && inner.tail.is_some() {
            inner.unlink_tail();
        }
        inner.push_head(uri.into(), body);
    }

    /// Sum of `len` over all live entries (test/diagnostic use only).
    #[cfg(test)]
    pub fn current_size(&self) -> usize {
        self.inner.read().unwrap().current_size
    }
}
