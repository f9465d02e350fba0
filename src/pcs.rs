//! Polynomial Commitment Scheme (PCS) — KZG on BN254
//!
//! The `Aggregator` ingests monomial coefficients block-by-block and MSMs them
//! directly against the SRS, so a commitment never requires materializing the
//! full coefficient vector at once. `batch_open_single_point`/
//! `batch_verify_single_point` fold several polynomials opened at the same
//! point into one combined witness, for the permutation argument's `T1, T2,
//! Z, Q` opening at `η`.

#![forbid(unsafe_code)]
#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(unused_mut)]
#![allow(unused_variables)]
#![allow(missing_docs)]
#![allow(non_snake_case)]

use ark_bn254::{Bn254, Fr as ScalarField, G1Affine, G1Projective, G2Affine, G2Projective};
use ark_ec::{pairing::Pairing, AffineRepr, CurveGroup, Group};
use ark_ff::{Field, One, PrimeField, UniformRand, Zero};
use ark_serialize::{
    CanonicalDeserialize, CanonicalSerialize, Compress, Read, SerializationError, Validate, Valid,
    Write,
};
use blake3::Hasher;
use rand::{rngs::StdRng, SeedableRng};
use std::sync::{Mutex, OnceLock};

use crate::{domain, F};
use crate::transcript::{FsLabel, Transcript};

/// Enable (future) blinding hooks in openings (currently NO-OP).
#[cfg(feature = "hiding-kzg")]
const HIDING_KZG: bool = true;
#[cfg(not(feature = "hiding-kzg"))]
const HIDING_KZG: bool = false;

/// Which basis the PCS expects when **committing**.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Basis {
    /// Commitment expects evaluations on a subgroup/coset.
    Evaluation,
    /// Commitment expects monomial coefficients (low→high).
    Coefficient,
}

// Manual canonical ser/de for enums so ark-serialize derives can include Basis.
impl CanonicalSerialize for Basis {
    fn serialize_with_mode<W: Write>(
        &self,
        mut w: W,
        _cm: Compress,
    ) -> Result<(), SerializationError> {
        let byte = match self {
            Basis::Evaluation => 0u8,
            Basis::Coefficient => 1u8,
        };
        w.write_all(&[byte])?;
        Ok(())
    }
    fn serialized_size(&self, _cm: Compress) -> usize {
        1
    }
}
impl CanonicalDeserialize for Basis {
    fn deserialize_with_mode<R: Read>(
        mut r: R,
        _cm: Compress,
        _validate: Validate,
    ) -> Result<Self, SerializationError> {
        let mut b = [0u8; 1];
        r.read_exact(&mut b)?;
        match b[0] {
            0 => Ok(Basis::Evaluation),
            1 => Ok(Basis::Coefficient),
            _ => Err(SerializationError::InvalidData),
        }
    }
}
impl Valid for Basis {
    fn check(&self) -> Result<(), SerializationError> {
        Ok(())
    }
}

/// Public parameters for the polynomial commitment scheme.
#[derive(Debug, Clone, CanonicalSerialize, CanonicalDeserialize)]
pub struct PcsParams {
    /// Maximum supported degree **d** (inclusive). Number of SRS powers is `d+1`.
    pub max_degree: usize,
    /// Basis expected by the commit-time interface for *the polynomial*.
    pub basis: Basis,
    /// Placeholder to keep the type stable if we ever inline SRS metadata.
    pub srs_placeholder: (),
}

impl PcsParams {
    /// Return a copy of these parameters with a different expected **basis**.
    ///
    /// This does **not** reload or change the SRS; it only switches the local
    /// basis setting for committing/aggregation APIs.
    #[inline]
    pub fn with_basis(mut self, basis: Basis) -> Self {
        self.basis = basis;
        self
    }
}

/// PCS commitment newtype (wrap **G1Affine** directly).
#[derive(Debug, Clone, Copy, PartialEq, Eq, CanonicalSerialize, CanonicalDeserialize)]
pub struct Commitment(pub G1Affine);

/// KZG opening proof at a single point.
#[derive(Debug, Clone, CanonicalSerialize, CanonicalDeserialize)]
pub struct OpeningProof {
    /// Evaluation point ζ.
    pub zeta: F,
    /// Claimed value f(ζ) (redundant with transcript but convenient).
    pub value: F,
    /// Commitment to the witness polynomial W(X) = (f(X) − f(ζ)) / (X − ζ).
    pub witness_comm: Commitment,
}

#[derive(Debug, thiserror::Error)]
pub enum VerifyError {
    #[error("shape mismatch: expected {expected} items, got {got}")]
    Shape { expected: usize, got: usize },
    #[error("G2 SRS not loaded")]
    MissingG2,
    #[error("final pairing check failed")]
    Pairing,
}

#[derive(Debug, thiserror::Error)]
pub enum SrsLoadError {
    #[error("empty SRS provided")]
    Empty,
}

// ===========================================================================
// Internal SRS (BN254) — G1 powers of τ and a single G2 element [τ]G2
// ===========================================================================

#[derive(Debug)]
struct SrsG1 {
    powers: Vec<G1Affine>,
    #[cfg(feature = "dev-srs")]
    tau: ScalarField,
}

impl SrsG1 {
    #[cfg(feature = "dev-srs")]
    fn new_dev() -> Self {
        let mut rng = StdRng::from_seed([42u8; 32]);
        let tau = ScalarField::rand(&mut rng);
        let mut s = SrsG1 { powers: Vec::new(), tau };
        s.ensure_len(1);
        s
    }

    fn ensure_len(&mut self, new_len: usize) {
        if self.powers.len() >= new_len {
            return;
        }
        #[cfg(feature = "dev-srs")]
        {
            let gen = G1Projective::generator();
            let current = self.powers.len();
            for idx in current..new_len {
                let gi = gen.mul_bigint(self.tau.pow([idx as u64]).into_bigint());
                self.powers.push(gi.into_affine());
            }
        }
        #[cfg(not(feature = "dev-srs"))]
        {
            assert!(
                self.powers.len() >= new_len,
                "G1 SRS insufficient; call try_load_srs_g1 with at least {} elements",
                new_len
            );
        }
    }

    #[inline]
    fn get_power(&self, idx: usize) -> G1Affine {
        self.powers[idx]
    }
}

fn srs_g1() -> &'static Mutex<SrsG1> {
    static SRS: OnceLock<Mutex<SrsG1>> = OnceLock::new();
    #[cfg(feature = "dev-srs")]
    {
        SRS.get_or_init(|| Mutex::new(SrsG1::new_dev()))
    }
    #[cfg(not(feature = "dev-srs"))]
    {
        SRS.get_or_init(|| Mutex::new(SrsG1 { powers: Vec::new() }))
    }
}

/// Load a trusted **G1** SRS and return a template (Result).
pub fn try_load_srs_g1(powers: &[G1Affine]) -> Result<PcsParams, SrsLoadError> {
    if powers.is_empty() {
        return Err(SrsLoadError::Empty);
    }
    let mut guard = srs_g1().lock().expect("SRS mutex poisoned");
    guard.powers.clear();
    guard.powers.extend_from_slice(powers);
    drop(guard);

    Ok(PcsParams {
        max_degree: powers.len() - 1,
        basis: Basis::Coefficient,
        srs_placeholder: (),
    })
}

/// Back-compat wrapper: panics on error.
pub fn load_srs_g1(powers: &[G1Affine]) -> PcsParams {
    try_load_srs_g1(powers).expect("invalid G1 SRS")
}

#[derive(Debug, Clone)]
struct SrsG2 {
    tau_g2: Option<G2Affine>,
}

impl SrsG2 {
    #[cfg(feature = "dev-srs")]
    fn new_dev() -> Self {
        let tau = srs_g1().lock().expect("SRS mutex poisoned").tau;
        let g2_gen = <Bn254 as Pairing>::G2::generator();
        let tau_g2 = (G2Projective::from(g2_gen) * tau).into_affine();
        Self { tau_g2: Some(tau_g2) }
    }

    #[cfg(not(feature = "dev-srs"))]
    fn new_prod() -> Self {
        Self { tau_g2: None }
    }
}

fn srs_g2() -> &'static Mutex<SrsG2> {
    static SRS2: OnceLock<Mutex<SrsG2>> = OnceLock::new();
    #[cfg(feature = "dev-srs")]
    {
        SRS2.get_or_init(|| Mutex::new(SrsG2::new_dev()))
    }
    #[cfg(not(feature = "dev-srs"))]
    {
        SRS2.get_or_init(|| Mutex::new(SrsG2::new_prod()))
    }
}

/// Load **G2** SRS element `[τ]G2` for verification (Result).
pub fn try_load_srs_g2(tau_g2: G2Affine) -> Result<(), SrsLoadError> {
    let mut guard = srs_g2().lock().expect("SRS mutex poisoned");
    guard.tau_g2 = Some(tau_g2);
    Ok(())
}

/// Back-compat wrapper.
pub fn load_srs_g2(tau_g2: G2Affine) {
    try_load_srs_g2(tau_g2).expect("invalid G2 SRS");
}

// ----------------------- SRS digests (public) -----------------------

fn hash_bytes(parts: &[&[u8]]) -> [u8; 32] {
    let mut h = Hasher::new();
    h.update(b"SSZKP.SRS.v1");
    for p in parts {
        h.update(&((*p).len() as u64).to_be_bytes());
        h.update(p);
    }
    *h.finalize().as_bytes()
}

pub fn srs_g1_digest() -> [u8; 32] {
    let guard = srs_g1().lock().expect("SRS G1 mutex poisoned");
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&(guard.powers.len() as u64).to_be_bytes());
    for p in &guard.powers {
        let mut tmp = Vec::with_capacity(48);
        p.serialize_compressed(&mut tmp).expect("serialize G1");
        bytes.extend_from_slice(&tmp);
    }
    hash_bytes(&[&bytes])
}

pub fn srs_g2_digest() -> [u8; 32] {
    let guard = srs_g2().lock().expect("SRS G2 mutex poisoned");
    let mut bytes = Vec::new();
    if let Some(tau_g2) = guard.tau_g2 {
        let mut tmp = Vec::with_capacity(96);
        tau_g2.serialize_compressed(&mut tmp).expect("serialize G2");
        bytes.extend_from_slice(&tmp);
    }
    hash_bytes(&[&bytes])
}

// ===========================================================================
// Aggregator — streaming-friendly, tile-aware coefficient ingestion
// ===========================================================================

/// Error type for result-returning aggregator APIs.
#[derive(Debug, thiserror::Error)]
pub enum AggregatorError {
    #[error("coefficient stream exceeds max_degree: cursor {cursor}, adding {adding} exceeds limit {limit}")]
    DegreeOverflow { cursor: usize, adding: usize, limit: usize },
    #[error("PCS basis mismatch (expected {expected:?}, got {got:?})")]
    Basis { expected: Basis, got: Basis },
}

/// Aggregates contributions `a_i · [τ^i]G₁` as tiles of **coefficients** arrive.
///
/// The aggregator is intentionally **basis-agnostic w.r.t. time**: callers
/// must provide *monomial coefficients* in stream order. If they start from
/// evaluations, they should convert blocks with IFFT first (see `domain.rs`).
pub struct Aggregator<'a> {
    pub(crate) pcs: &'a PcsParams,
    pub(crate) poly_id: &'static str,
    acc: G1Projective,
    cursor: usize,
    // --- diagnostics (opt-in via env) ---
    memlog: bool,
    peak_inflight_coeffs: usize,
    total_blocks: usize,
    peak_buffered_blocks: usize, // keep 0 if no internal staging
}

impl<'a> Aggregator<'a> {
    /// Create a new aggregator. The initial `cursor` is 0 (constant term slot).
    pub fn new(pcs: &'a PcsParams, poly_id: &'static str) -> Self {
        let memlog = std::env::var("SSZKP_MEMLOG").ok().as_deref() == Some("1");
        Self {
            pcs,
            poly_id,
            acc: G1Projective::zero(),
            cursor: 0,
            memlog,
            peak_inflight_coeffs: 0,
            total_blocks: 0,
            peak_buffered_blocks: 0,
        }
    }

    /// Current stream cursor (number of coefficients already absorbed).
    #[inline]
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Remaining capacity (#coefficients) before reaching `max_degree + 1`.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.pcs.max_degree + 1 - self.cursor
    }

    // ----------------- High-level ingestion -----------------

    /// Add a block of **coefficients** provided in **low→high** order.
    pub fn add_block_coeffs(&mut self, slice: &[F]) {
        assert!(
            matches!(self.pcs.basis, Basis::Coefficient),
            "PCS basis mismatch (coeff)"
        );
        if self.memlog && slice.len() > self.peak_inflight_coeffs {
            self.peak_inflight_coeffs = slice.len();
        }
        self.total_blocks += 1;
        self.add_block_coeffs_inner(slice);
    }

    /// Result-returning variant of `add_block_coeffs`.
    pub fn add_block_coeffs_r(&mut self, slice: &[F]) -> Result<(), AggregatorError> {
        if !matches!(self.pcs.basis, Basis::Coefficient) {
            return Err(AggregatorError::Basis {
                expected: Basis::Coefficient,
                got: self.pcs.basis,
            });
        }
        if self.memlog && slice.len() > self.peak_inflight_coeffs {
            self.peak_inflight_coeffs = slice.len();
        }
        self.total_blocks += 1;
        self.add_block_coeffs_checked(slice)
    }

    /// Finalize and return the commitment.
    pub fn finalize(self) -> Commitment {
        if self.memlog {
            eprintln!(
                "[memlog] Aggregator(poly='{}'): peak_inflight_coeffs={}, total_blocks={}, peak_buffered_blocks={}",
                self.poly_id, self.peak_inflight_coeffs, self.total_blocks, self.peak_buffered_blocks
            );
        }
        Commitment(self.acc.into_affine())
    }

    // ----------------- Internals -----------------

    fn add_block_coeffs_checked(&mut self, coeffs: &[F]) -> Result<(), AggregatorError> {
        let add = coeffs.len();
        let limit = self.pcs.max_degree + 1;
        if self.cursor + add > limit {
            return Err(AggregatorError::DegreeOverflow {
                cursor: self.cursor,
                adding: add,
                limit,
            });
        }

        {
            let mut guard = srs_g1().lock().expect("SRS mutex poisoned");
            guard.ensure_len(self.cursor + add);
            // If you stage blocks internally, update peak_buffered_blocks here.
            // (We stream directly; keep at zero.)
        }

        let guard = srs_g1().lock().expect("SRS mutex poisoned");
        for (i, c) in coeffs.iter().enumerate() {
            if c.is_zero() {
                continue;
            }
            let base = guard.get_power(self.cursor + i);
            let term = base.into_group().mul_bigint(c.into_bigint());
            self.acc += term;
        }
        drop(guard);

        self.cursor += add;
        Ok(())
    }

    fn add_block_coeffs_inner(&mut self, coeffs: &[F]) {
        // Legacy behavior: panic on overflow to retain current callers’ expectations.
        self.add_block_coeffs_checked(coeffs)
            .expect("coefficient stream exceeds max_degree")
    }
}

// ===========================================================================
// Openings
// ===========================================================================

/// Open at points using **coefficient streaming** (high→low) for the witness.
/// Single-pass, no buffering of the witness, no replay of the source:
/// - Uses Horner to accumulate f(ζ).
/// - Computes quotient coefficients on the fly (synthetic division).
/// - Adds each quotient coefficient directly into the MSM at absolute index j=i−1,
///   where `i` counts down from `pcs_for_poly.max_degree`.
pub fn open_at_points_with_coeffs(
    pcs_for_poly: &PcsParams,
    commitments: &[Commitment],
    _stream_eval: impl Fn(usize, F) -> F,
    mut stream_coeff_hi_to_lo: impl FnMut(usize, &mut dyn FnMut(Vec<F>)),
    points: &[F],
) -> Vec<OpeningProof> {
    let mut proofs = Vec::with_capacity(commitments.len().saturating_mul(points.len()));
    let memlog = std::env::var("SSZKP_MEMLOG").ok().as_deref() == Some("1");

    // Upper-bound SRS reservation once (we'll also check inside the loop defensively).
    {
        let mut g = srs_g1().lock().expect("SRS G1 mutex poisoned");
        g.ensure_len(pcs_for_poly.max_degree + 1);
    }

    for (pi, _c) in commitments.iter().enumerate() {
        for &zeta in points {
            let mut eval_acc = F::zero();          // Horner accumulator for f(ζ)
            let mut w_acc = G1Projective::zero();  // MSM accumulator for W(X)
            let mut i_abs: isize = pcs_for_poly.max_degree as isize; // absolute coefficient index (a_i), high→low

            let mut peak_inflight = 0usize;
            let mut total_blocks = 0usize;

            let mut consume_block = |mut blk_hi_to_lo: Vec<F>| {
                total_blocks += 1;
                if memlog && blk_hi_to_lo.len() > peak_inflight { peak_inflight = blk_hi_to_lo.len(); }

                // Make sure SRS has enough powers for upcoming indices (defensive).
                {
                    let mut g = srs_g1().lock().expect("SRS G1 mutex poisoned");
                    // We may touch up to (i_abs as usize) next, but guard for zero/negative below.
                    let need = (i_abs.max(0) as usize) + 1;
                    g.ensure_len(need);
                }

                // Drain the block (already high→low). For each incoming a_i:
                //   b_{i-1} = a_i + z * b_i, with b_{deg} := 0.
                //   f_acc    = a_i + z * f_acc  (standard Horner)
                //
                // We add b_{i-1} into MSM at index (i-1) immediately.
                let g = srs_g1().lock().expect("SRS G1 mutex poisoned");
                for a_i in blk_hi_to_lo.drain(..) {
                    // quotient recurrence (synthetic division)
                    let b_im1 = a_i + zeta * eval_acc;

                    // Horner remainder accumulator (f(ζ))
                    eval_acc = b_im1;

                    // Absolute MSM index for b_{i-1} is (i_abs - 1)
                    if i_abs > 0 && !b_im1.is_zero() {
                        let base = g.get_power((i_abs - 1) as usize);
                        w_acc += base.into_group().mul_bigint(b_im1.into_bigint());
                    }

                    // Move to next coefficient (downwards)
                    i_abs -= 1;
                }
                // drop(g) by leaving scope
            };

            stream_coeff_hi_to_lo(pi, &mut consume_block);

            if memlog {
                eprintln!(
                    "[memlog] WitnessStream(poly_idx={}, zeta=?): peak_inflight_coeffs={}, total_blocks={}",
                    pi, peak_inflight, total_blocks
                );
            }

            // eval_acc now equals f(ζ); w_acc holds commitment to W(X).
            proofs.push(OpeningProof {
                zeta,
                value: eval_acc,
                witness_comm: Commitment(w_acc.into_affine()),
            });
        }
    }

    proofs
}

// ===========================================================================
// Combined single-point batch opening
// ===========================================================================

/// A single witness commitment opening several polynomials at the same
/// point, folded via a Fiat-Shamir-derived random linear combination
/// (`gnark-crypto`'s `kzg.BatchOpenSinglePoint`/`BatchOpeningProof`).
#[derive(Debug, Clone, CanonicalSerialize, CanonicalDeserialize)]
pub struct BatchOpeningProof {
    /// Shared evaluation point.
    pub zeta: F,
    /// Claimed values, one per opened polynomial, in the order `commitments`/
    /// `coeffs` were given to [`batch_open_single_point`].
    pub values: Vec<F>,
    /// Commitment to the folded witness polynomial.
    pub witness_comm: Commitment,
}

fn open_single_coeffs(pcs: &PcsParams, coeffs: &[F], zeta: F) -> OpeningProof {
    let hi_to_lo: Vec<F> = coeffs.iter().rev().copied().collect();
    let dummy = Commitment(G1Affine::identity());
    open_at_points_with_coeffs(
        pcs,
        &[dummy],
        |_poly, _z| F::zero(),
        |_poly, sink| sink(hi_to_lo.clone()),
        &[zeta],
    )
    .into_iter()
    .next()
    .expect("single-point opening")
}

fn horner_eval(coeffs: &[F], zeta: F) -> F {
    coeffs.iter().rev().fold(F::zero(), |acc, &c| acc * zeta + c)
}

/// Open several coefficient-basis polynomials at the same point `zeta` with a
/// single combined witness commitment. `coeffs[i]` are `commitments[i]`'s
/// monomial coefficients, low-degree first. The fold coefficient `gamma` is
/// drawn from `fs` after binding `commitments` and each polynomial's claimed
/// value at `zeta`, so the prover cannot choose the combination adversarially.
pub fn batch_open_single_point(
    pcs: &PcsParams,
    commitments: &[Commitment],
    coeffs: &[Vec<F>],
    zeta: F,
    fs: &mut Transcript,
) -> BatchOpeningProof {
    assert_eq!(commitments.len(), coeffs.len(), "one polynomial per commitment");
    let values: Vec<F> = coeffs.iter().map(|c| horner_eval(c, zeta)).collect();

    fs.absorb_vec_commitments_l(FsLabel::BatchGamma, commitments);
    for v in &values {
        fs.absorb_scalar_l(FsLabel::BatchGamma, v);
    }
    let gamma = fs.challenge_f_l(FsLabel::BatchGamma);

    let max_len = coeffs.iter().map(Vec::len).max().unwrap_or(0);
    let mut combined = vec![F::zero(); max_len];
    let mut gamma_pow = F::one();
    for c in coeffs {
        for (slot, &a) in combined.iter_mut().zip(c.iter()) {
            *slot += gamma_pow * a;
        }
        gamma_pow *= gamma;
    }

    let opening = open_single_coeffs(pcs, &combined, zeta);
    BatchOpeningProof { zeta, values, witness_comm: opening.witness_comm }
}

/// Verify a [`BatchOpeningProof`] against `commitments` at the
/// independently-derived point `zeta` (never `proof.zeta`, which is
/// prover-supplied and untrusted), re-deriving `gamma` from the same
/// transcript sequence `batch_open_single_point` used.
pub fn batch_verify_single_point(
    pcs: &PcsParams,
    commitments: &[Commitment],
    zeta: F,
    proof: &BatchOpeningProof,
    fs: &mut Transcript,
) -> Result<(), VerifyError> {
    if commitments.len() != proof.values.len() {
        return Err(VerifyError::Shape { expected: commitments.len(), got: proof.values.len() });
    }

    fs.absorb_vec_commitments_l(FsLabel::BatchGamma, commitments);
    for v in &proof.values {
        fs.absorb_scalar_l(FsLabel::BatchGamma, v);
    }
    let gamma = fs.challenge_f_l(FsLabel::BatchGamma);

    let mut combined_comm = G1Projective::zero();
    let mut combined_value = F::zero();
    let mut gamma_pow = F::one();
    for (c, v) in commitments.iter().zip(proof.values.iter()) {
        combined_comm += c.0.into_group().mul_bigint(gamma_pow.into_bigint());
        combined_value += gamma_pow * v;
        gamma_pow *= gamma;
    }

    let combined_commitment = Commitment(combined_comm.into_affine());
    let combined_proof = OpeningProof { zeta, value: combined_value, witness_comm: proof.witness_comm };
    verify_openings(
        pcs,
        &[combined_commitment],
        &[zeta],
        &[combined_value],
        std::slice::from_ref(&combined_proof),
    )
}

// ===========================================================================
// Verification (unchanged math; production-hardened)
// ===========================================================================

pub fn verify_openings(
    _pcs: &PcsParams,
    commitments: &[Commitment],
    points: &[F],
    claimed_evals: &[F],
    proofs: &[OpeningProof],
) -> Result<(), VerifyError> {
    let expected = commitments.len().saturating_mul(points.len());
    if proofs.len() != expected || claimed_evals.len() != expected {
        return Err(VerifyError::Shape { expected, got: proofs.len().max(claimed_evals.len()) });
    }

    let g1_gen = {
        let guard = srs_g1().lock().expect("SRS G1 mutex poisoned");
        guard.get_power(0)
    };
    let g2_gen = <Bn254 as Pairing>::G2::generator().into_affine();
    let g2_tau = {
        let guard = srs_g2().lock().expect("SRS G2 mutex poisoned");
        match guard.tau_g2 {
            Some(t) => t,
            None => return Err(VerifyError::MissingG2),
        }
    };

    let mut a_all: Vec<<Bn254 as Pairing>::G1Prepared> = Vec::with_capacity(expected * 3);
    let mut b_all: Vec<<Bn254 as Pairing>::G2Prepared> = Vec::with_capacity(expected * 3);

    let mut idx = 0usize;
    for cmt in commitments.iter() {
        let c_aff = cmt.0;
        for &pt in points.iter() {
            let pr = &proofs[idx];
            let val = claimed_evals[idx];

            if pr.value != val || pr.zeta != pt {
                return Err(VerifyError::Pairing);
            }

            // e(C, G2)
            a_all.push(<Bn254 as Pairing>::G1Prepared::from(c_aff));
            b_all.push(<Bn254 as Pairing>::G2Prepared::from(g2_gen));

            // e(−f(ζ)·G1, G2)
            let minus_f_g1 = (-g1_gen.into_group().mul_bigint(val.into_bigint())).into_affine();
            a_all.push(<Bn254 as Pairing>::G1Prepared::from(minus_f_g1));
            b_all.push(<Bn254 as Pairing>::G2Prepared::from(g2_gen));

            // e(−W, [τ]G2 − ζ·G2)
            let right_g2 =
                (g2_tau.into_group() - g2_gen.into_group().mul_bigint(pt.into_bigint())).into_affine();
            let minus_w = (-pr.witness_comm.0).into_group().into_affine();
            a_all.push(<Bn254 as Pairing>::G1Prepared::from(minus_w));
            b_all.push(<Bn254 as Pairing>::G2Prepared::from(right_g2));

            idx += 1;
        }
    }

    if a_all.is_empty() {
        return Ok(());
    }

    let mlo = <Bn254 as Pairing>::multi_miller_loop(a_all, b_all);
    if let Some(fe) = <Bn254 as Pairing>::final_exponentiation(mlo) {
        if fe.0.is_one() {
            return Ok(());
        }
    }
    Err(VerifyError::Pairing)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Relies on the `dev-srs` feature's lazily-initialized, auto-growing
    /// singleton SRS (deterministic seed) to back these params.
    fn params_and_srs(max_degree: usize) -> PcsParams {
        PcsParams { max_degree, basis: Basis::Coefficient, srs_placeholder: () }
    }

    #[test]
    #[cfg(feature = "dev-srs")]
    fn batch_open_then_verify_round_trips() {
        let pcs = params_and_srs(7);
        let a = vec![F::from(1u64), F::from(2u64), F::from(3u64)];
        let b = vec![F::from(5u64), F::from(0u64), F::from(1u64), F::from(4u64)];
        let c = vec![F::from(9u64)];

        let ca = { let mut agg = Aggregator::new(&pcs, "a"); agg.add_block_coeffs(&a); agg.finalize() };
        let cb = { let mut agg = Aggregator::new(&pcs, "b"); agg.add_block_coeffs(&b); agg.finalize() };
        let cc = { let mut agg = Aggregator::new(&pcs, "c"); agg.add_block_coeffs(&c); agg.finalize() };

        let zeta = F::from(17u64);
        let mut fs_p = Transcript::new("pcs-batch-test");
        let proof = batch_open_single_point(&pcs, &[ca, cb, cc], &[a, b, c], zeta, &mut fs_p);

        let mut fs_v = Transcript::new("pcs-batch-test");
        batch_verify_single_point(&pcs, &[ca, cb, cc], zeta, &proof, &mut fs_v).unwrap();
    }

    #[test]
    #[cfg(feature = "dev-srs")]
    fn batch_verify_rejects_tampered_value() {
        let pcs = params_and_srs(3);
        let a = vec![F::from(1u64), F::from(2u64)];
        let b = vec![F::from(3u64), F::from(4u64)];
        let ca = { let mut agg = Aggregator::new(&pcs, "a2"); agg.add_block_coeffs(&a); agg.finalize() };
        let cb = { let mut agg = Aggregator::new(&pcs, "b2"); agg.add_block_coeffs(&b); agg.finalize() };

        let zeta = F::from(6u64);
        let mut fs_p = Transcript::new("pcs-batch-test-2");
        let mut proof = batch_open_single_point(&pcs, &[ca, cb], &[a, b], zeta, &mut fs_p);
        proof.values[0] += F::from(1u64);

        let mut fs_v = Transcript::new("pcs-batch-test-2");
        assert!(batch_verify_single_point(&pcs, &[ca, cb], zeta, &proof, &mut fs_v).is_err());
    }
}
