//! MiMC hash in Miyaguchi-Preneel mode
//!
//! A field-native compression function: each round raises the running state
//! to the fifth power after mixing in a round constant, and the final digest
//! folds the block back in (Miyaguchi-Preneel). Round constants are derived
//! once, lazily, from the fixed seed `"seed"` by iterating Keccak-256.

#![forbid(unsafe_code)]

use std::sync::OnceLock;

use ark_ff::{BigInteger, PrimeField, Zero};
use sha3::{Digest, Keccak256};

use crate::F;

/// Number of MiMC rounds (curve-dependent; fixed for `ark_bn254::Fr`).
pub const NUM_ROUNDS: usize = 91;

const SEED: &[u8] = b"seed";

/// Canonical big-endian byte length of a field element, and the MiMC block
/// size.
pub const BLOCK_SIZE: usize = 32;

/// Errors raised while absorbing bytes or hashing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum MimcError {
    /// The input length was not a multiple of [`BLOCK_SIZE`].
    #[error("input length {0} is not a multiple of the block size {BLOCK_SIZE}")]
    Unaligned(usize),
    /// A block did not decode as a canonical field element.
    #[error("block is not a canonical field element")]
    NonCanonicalBlock,
}

fn round_constants() -> &'static [F; NUM_ROUNDS] {
    static CONSTANTS: OnceLock<[F; NUM_ROUNDS]> = OnceLock::new();
    CONSTANTS.get_or_init(|| {
        let mut out = [F::zero(); NUM_ROUNDS];
        let mut rnd: [u8; 32] = Keccak256::digest(SEED).into();
        for slot in out.iter_mut() {
            *slot = be_bytes_mod_order(&rnd);
            rnd = Keccak256::digest(rnd).into();
        }
        out
    })
}

fn be_bytes_mod_order(bytes: &[u8]) -> F {
    let mut le = bytes.to_vec();
    le.reverse();
    F::from_le_bytes_mod_order(&le)
}

fn canonical_be_bytes(x: &F) -> [u8; BLOCK_SIZE] {
    let mut buf = x.into_bigint().to_bytes_be();
    debug_assert!(buf.len() <= BLOCK_SIZE);
    let mut out = [0u8; BLOCK_SIZE];
    out[BLOCK_SIZE - buf.len()..].copy_from_slice(&buf);
    buf.clear();
    out
}

fn decode_canonical_block(block: &[u8]) -> Result<F, MimcError> {
    if block.len() != BLOCK_SIZE {
        return Err(MimcError::NonCanonicalBlock);
    }
    let mut le = block.to_vec();
    le.reverse();
    let value = F::from_le_bytes_mod_order(&le);
    if canonical_be_bytes(&value) != block {
        return Err(MimcError::NonCanonicalBlock);
    }
    Ok(value)
}

/// MiMC state: the running Miyaguchi-Preneel accumulator plus a buffer of
/// not-yet-consumed block bytes.
#[derive(Debug, Clone)]
pub struct Mimc {
    h: F,
    data: Vec<u8>,
}

impl Default for Mimc {
    fn default() -> Self {
        Self::new()
    }
}

impl Mimc {
    /// Create a fresh digest with zero initial state.
    pub fn new() -> Self {
        Self { h: F::zero(), data: Vec::new() }
    }

    /// Reset to the initial state, discarding any buffered bytes.
    pub fn reset(&mut self) {
        self.h = F::zero();
        self.data.clear();
    }

    /// Canonical block size in bytes.
    pub fn block_size(&self) -> usize {
        BLOCK_SIZE
    }

    /// Digest output size in bytes.
    pub fn size(&self) -> usize {
        BLOCK_SIZE
    }

    /// Buffer `bytes` for the next [`Mimc::sum`] call.
    ///
    /// `bytes.len()` must be a multiple of [`BLOCK_SIZE`], and each block
    /// must decode as a canonical field element, or this returns an error
    /// without mutating the buffer.
    pub fn absorb(&mut self, bytes: &[u8]) -> Result<(), MimcError> {
        if bytes.len() % BLOCK_SIZE != 0 {
            return Err(MimcError::Unaligned(bytes.len()));
        }
        for block in bytes.chunks(BLOCK_SIZE) {
            decode_canonical_block(block)?;
        }
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    /// One MiMC round function applied `NUM_ROUNDS` times, folding in `h`.
    fn encrypt(&self, m: F) -> F {
        let constants = round_constants();
        let mut m = m;
        for c in constants.iter() {
            let t = m + self.h + c;
            let t2 = t * t;
            let t4 = t2 * t2;
            m = t4 * t;
        }
        m + self.h
    }

    /// Finalize the digest over all buffered blocks (or a single zero block
    /// if none were absorbed), clear the buffer, and return the canonical
    /// big-endian encoding of the resulting state. Does not reset `h`.
    pub fn sum(&mut self) -> Vec<u8> {
        if self.data.is_empty() {
            let r = self.encrypt(F::zero());
            self.h = self.h + r + F::zero();
        } else {
            let blocks: Vec<F> = self
                .data
                .chunks(BLOCK_SIZE)
                .map(|b| decode_canonical_block(b).expect("absorb validated canonicity"))
                .collect();
            for x in blocks {
                let r = self.encrypt(x);
                self.h = self.h + r + x;
            }
        }
        self.data.clear();
        canonical_be_bytes(&self.h).to_vec()
    }
}

/// One-shot convenience: absorb `msg` and return its MiMC digest.
pub fn sum(msg: &[u8]) -> Result<Vec<u8>, MimcError> {
    let mut m = Mimc::new();
    m.absorb(msg)?;
    Ok(m.sum())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_sum_equals_encrypt_zero_plus_zero() {
        let mut m = Mimc::new();
        let got = m.sum();
        let mut m2 = Mimc::new();
        let expected = m2.encrypt(F::zero()) + F::zero();
        assert_eq!(got, canonical_be_bytes(&expected).to_vec());
    }

    #[test]
    fn deterministic_across_calls() {
        let block = canonical_be_bytes(&F::from(42u64)).to_vec();
        let a = sum(&block).unwrap();
        let b = sum(&block).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn rejects_unaligned_input() {
        let mut m = Mimc::new();
        assert_eq!(m.absorb(&[0u8; 5]), Err(MimcError::Unaligned(5)));
    }

    #[test]
    fn rejects_non_canonical_block() {
        let mut m = Mimc::new();
        let overflow = vec![0xffu8; BLOCK_SIZE];
        assert_eq!(m.absorb(&overflow), Err(MimcError::NonCanonicalBlock));
    }

    #[test]
    fn reset_clears_state_and_buffer() {
        let block = canonical_be_bytes(&F::from(7u64)).to_vec();
        let mut m = Mimc::new();
        m.absorb(&block).unwrap();
        let _ = m.sum();
        let after_first = m.h;
        m.reset();
        assert_eq!(m.h, F::zero());
        assert!(m.data.is_empty());
        assert_ne!(after_first, F::zero());
    }

    #[test]
    fn distinct_messages_give_distinct_digests() {
        let a = sum(&canonical_be_bytes(&F::from(1u64))).unwrap();
        let b = sum(&canonical_be_bytes(&F::from(2u64))).unwrap();
        assert_ne!(a, b);
    }
}
