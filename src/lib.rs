//! Crate root: public surface, core aliases, and protocol-wide invariants
//!
//! This module is the **single canonical entry-point** for downstream users of
//! the library. It centralizes the scalar field alias and re-exports the
//! submodules that implement a GKR-style sum-check proof engine for layered
//! arithmetic circuits, batching many instances of one circuit, a KZG-based
//! permutation argument, and the MiMC hash used as a circuit-native gate.
//!
//! ## Invariants
//!
//! - **Field & Curve.** Unless explicitly configured otherwise, the scalar
//!   field is `ark_bn254::Fr` (`F` in this crate). Commitments use KZG on
//!   BN254 (`G1 = ark_bn254::G1Affine`). We **forbid unsafe** throughout the
//!   crate.
//!
//! - **Fiat–Shamir (FS).** We use BLAKE3 with **explicit domain separation**
//!   tags, length-delimited absorbs, and an **XOF** to derive challenges. The
//!   prover and verifier replay the exact same sequence of absorbs/challenges.

#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms)]

/// Domain & transforms (vanishing polynomial X^N − c, NTT/INTT, coset shift).
pub mod domain;
/// Polynomial commitment scheme interface and linear aggregator (KZG by default).
pub mod pcs;
/// Fiat–Shamir transcript (domain-separated hashing, hash→field).
pub mod transcript;
/// Transient field-element table pool shared by the sum-check engine.
pub mod pool;
/// MiMC hash (Miyaguchi-Preneel mode).
pub mod mimc;
/// Multilinear polynomials represented by their evaluation table.
pub mod multilin;
/// Layered arithmetic circuits: gates, wires, topological order, assignment.
pub mod circuit;
/// Per-wire claim bookkeeping for the GKR sum-check reduction.
pub mod claims;
/// Generic sum-check prover/verifier.
pub mod sumcheck;
/// Top-level GKR prove/verify entry points.
pub mod gkr;
/// KZG-based permutation argument.
pub mod permutation;

/// Scalar field used across the crate (BN254 by default).
pub type F = ark_bn254::Fr;

/// G1 affine group element used for commitments (KZG default).
pub type G1 = ark_bn254::G1Affine;

/// Security parameter λ. In the manuscript, λ = Θ(log T) is implicit;
/// we **do not** hardwire T here.
pub const SECURITY_LAMBDA: usize = 128;

/// Re-export PCS surface types so downstream code uses the **single, canonical**
/// definitions that already implement Arkworks serialization traits.
pub use crate::pcs::{
    BatchOpeningProof, Basis, Commitment, OpeningProof, PcsParams, SrsLoadError, VerifyError,
};
