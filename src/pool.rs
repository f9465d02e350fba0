//! Transient field-element table pool
//!
//! The sum-check engine allocates and discards many same-length scratch
//! tables per round (`eq` tables, folded input preprocessors, val/step
//! bookkeeping buffers). Rather than hitting the allocator on every round,
//! callers draw tables from a [`Pool`] keyed by length and return them when
//! done.
//!
//! A table drawn from the pool must not be retained past the call that
//! returns it; the pool may be shared across multiple non-concurrent proving
//! or verifying sessions.

#![forbid(unsafe_code)]

use std::collections::HashMap;

use crate::F;

/// Initial number of buffers kept on hand per length.
pub const DEFAULT_TARGET_LEN: usize = 1 << 11;

/// A pool of reusable `Vec<F>` buffers, bucketed by length.
#[derive(Debug, Default)]
pub struct Pool {
    bins: HashMap<usize, Vec<Vec<F>>>,
}

impl Pool {
    /// Create an empty pool.
    pub fn new() -> Self {
        Self { bins: HashMap::new() }
    }

    /// Return a zero-filled table of the given length, reusing a previously
    /// dumped buffer of the same length when one is available.
    pub fn make(&mut self, len: usize) -> Vec<F> {
        if let Some(bin) = self.bins.get_mut(&len) {
            if let Some(mut buf) = bin.pop() {
                buf.iter_mut().for_each(|x| *x = F::from(0u64));
                return buf;
            }
        }
        vec![F::from(0u64); len]
    }

    /// Return a table initialized as a copy of `src`.
    pub fn clone_from(&mut self, src: &[F]) -> Vec<F> {
        let mut buf = self.make(src.len());
        buf.copy_from_slice(src);
        buf
    }

    /// Return a table to the pool for future reuse.
    pub fn dump(&mut self, t: Vec<F>) {
        let len = t.len();
        self.bins.entry(len).or_insert_with(|| Vec::with_capacity(4)).push(t);
    }

    /// Number of buffers currently held, across all lengths. Used by tests
    /// to check that a session returns everything it borrowed.
    pub fn outstanding_hint(&self) -> usize {
        self.bins.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ark_ff::Zero;

    #[test]
    fn make_returns_zeroed_table() {
        let mut pool = Pool::new();
        let t = pool.make(8);
        assert_eq!(t.len(), 8);
        assert!(t.iter().all(|x| x.is_zero()));
    }

    #[test]
    fn dump_then_make_reuses_capacity() {
        let mut pool = Pool::new();
        let t = pool.make(16);
        pool.dump(t);
        assert_eq!(pool.outstanding_hint(), 1);
        let t2 = pool.make(16);
        assert_eq!(t2.len(), 16);
        assert!(t2.iter().all(|x| x.is_zero()));
        assert_eq!(pool.outstanding_hint(), 0);
    }

    #[test]
    fn clone_from_copies_values() {
        let mut pool = Pool::new();
        let src = vec![F::from(1u64), F::from(2u64), F::from(3u64)];
        let cloned = pool.clone_from(&src);
        assert_eq!(cloned, src);
    }
}
