//! KZG-based permutation argument
//!
//! Proves that two length-`s` vectors `t1`, `t2` are the same multiset,
//! permuted, via a Plonk-style grand-product accumulator `z`: `z(1) = 1` and
//! `z` accumulates the ratio `(epsilon - t1_i) / (epsilon - t2_i)` across the
//! evaluation domain. The accumulator, its consistency check, and the final
//! opening relation are folded into a single quotient `q` and committed with
//! KZG, exactly as [`crate::pcs`] already commits/opens coefficient-basis
//! polynomials elsewhere in this crate.
//!
//! Unlike the grand-product's originating implementation, the domain
//! arithmetic here stays in natural (non-bit-reversed) evaluation order
//! throughout: [`crate::domain`]'s transforms always return natural order, so
//! there is no bit-reversed-output mode to exploit for a saved permutation
//! pass. The algebra is otherwise unchanged.

#![forbid(unsafe_code)]

use ark_ff::{batch_inversion, Field, FftField};

use crate::domain::{self, Domain};
use crate::pcs::{self, Commitment, OpeningProof, PcsParams};
use crate::transcript::{FsLabel, Transcript};
use crate::F;

/// Coset shift used to evaluate the numerator off the vanishing domain.
/// Any field element outside the size-`s` subgroup works; this matches the
/// small generator conventionally used for FFT cosets.
const COSET_SHIFT: u64 = 5;

/// Errors raised while proving or verifying a permutation argument.
#[derive(Debug, thiserror::Error)]
pub enum PermutationError {
    /// `t1` and `t2` did not have the same length.
    #[error("t1 and t2 must have the same length")]
    SizeMismatch,
    /// Length was zero or not a power of two.
    #[error("t1/t2 length must be a positive power of two")]
    BadSize,
    /// The scalar field has no root of unity of the required order.
    #[error("no root of unity of the required order exists in this field")]
    NoRootOfUnity,
    /// The proof did not carry exactly four openings at `eta`.
    #[error("proof does not carry exactly 4 openings at eta")]
    Shape,
    /// The algebraic relation binding `t1, t2, z, q` failed.
    #[error("permutation relation check failed")]
    RelationFailed,
    /// A KZG opening failed to verify.
    #[error("opening verification failed: {0}")]
    Opening(#[from] pcs::VerifyError),
    /// The claimed fft-domain generator does not have order `size`.
    #[error("generator has the wrong order")]
    BadGenerator,
}

/// A proof that the commitments of `t1` and `t2` come from the same vector,
/// permuted.
#[derive(Debug, Clone)]
pub struct Proof {
    /// Size of the domain (`s`, a power of two).
    pub size: usize,
    /// Generator of the size-`s` fft domain, used to shift the evaluation
    /// point when opening `z` at the "next row".
    pub g: F,
    /// Commitment to `t1`.
    pub t1: Commitment,
    /// Commitment to `t2`.
    pub t2: Commitment,
    /// Commitment to the grand-product accumulator.
    pub z: Commitment,
    /// Commitment to the quotient polynomial.
    pub q: Commitment,
    /// Combined opening of `t1, t2, z, q` (in that order) at `eta`, folded
    /// into a single witness commitment.
    pub batched_opening: pcs::BatchOpeningProof,
    /// Opening of `z` at the shifted point `eta * g`.
    pub shifted_z_opening: OpeningProof,
}

/// Lagrange-basis evaluations of the grand-product accumulator: `z[0] = 1`
/// and `z[i+1] = z[i] * (epsilon - t1[i]) / (epsilon - t2[i])`.
fn evaluate_accumulation_polynomial(t1: &[F], t2: &[F], epsilon: F) -> Vec<F> {
    let s = t1.len();
    let mut num = vec![F::from(1u64); s];
    let mut den = vec![F::from(1u64); s];
    for i in 0..s - 1 {
        num[i + 1] = num[i] * (epsilon - t1[i]);
        den[i + 1] = den[i] * (epsilon - t2[i]);
    }
    batch_inversion(&mut den);
    for i in 0..s {
        num[i] *= den[i];
    }
    num
}

/// First part of the folded numerator: `lt2_i_next * z(next) - lt1_i * z(i)`
/// pointwise over the Lagrange basis, i.e. `t2 * z(gX) - t1 * z` evaluated on
/// the coset (the "next row" relation, read cyclically).
fn evaluate_first_part_num(lt1: &[F], lt2: &[F], lz: &[F], epsilon: F) -> Vec<F> {
    let s = lt1.len();
    let mut res = vec![F::from(0u64); s];
    for i in 0..s {
        let next = (i + 1) % s;
        let a = lz[next] * (epsilon - lt2[i]);
        let b = lz[i] * (epsilon - lt1[i]);
        res[i] = a - b;
    }
    res
}

/// Second part of the folded numerator: `L0(X) * (z(X) - 1)` evaluated on the
/// coset, where `L0` is the (unnormalized) first-Lagrange-basis polynomial
/// `(X^s - 1) / (X - 1)`.
fn evaluate_second_part_num(lz: &[F], s: usize, coset_shift: F, generator: F) -> Vec<F> {
    let one = F::from(1u64);
    let vanishing_on_coset = coset_shift.pow([s as u64]) - one;
    let mut denom = vec![F::from(0u64); s];
    let mut point = coset_shift;
    for d in denom.iter_mut() {
        *d = point - one;
        point *= generator;
    }
    batch_inversion(&mut denom);
    let mut res = vec![F::from(0u64); s];
    for i in 0..s {
        res[i] = (lz[i] - one) * denom[i] * vanishing_on_coset;
    }
    res
}

/// Scale `coeffs[i]` by `shift^i` in place, turning coefficients of `f(X)`
/// into coefficients of `f(shift * X)`.
fn apply_coset_shift(coeffs: &mut [F], shift: F) {
    let mut power = F::from(1u64);
    for c in coeffs.iter_mut() {
        *c *= power;
        power *= shift;
    }
}

/// Evaluate a coefficient-basis polynomial on the coset `shift * H`.
fn coset_evals_from_coeffs(d: &Domain, coeffs: &[F], shift: F) -> Vec<F> {
    let mut shifted = coeffs.to_vec();
    apply_coset_shift(&mut shifted, shift);
    domain::ntt_block_coeffs_to_evals(d, &shifted)
}

/// Recover coefficients from evaluations taken on the coset `shift * H`.
fn coset_coeffs_from_evals(d: &Domain, evals: &[F], shift: F) -> Vec<F> {
    let mut coeffs = domain::ifft_block_evals_to_coeffs(d, evals);
    let inv_shift = shift.inverse().expect("coset shift is never zero");
    apply_coset_shift(&mut coeffs, inv_shift);
    coeffs
}

fn commit_coeffs(pcs_params: &PcsParams, poly_id: &'static str, coeffs: &[F]) -> Commitment {
    let mut agg = pcs::Aggregator::new(pcs_params, poly_id);
    agg.add_block_coeffs(coeffs);
    agg.finalize()
}

/// Open a single coefficient-basis polynomial at a single point.
fn open_single(pcs_params: &PcsParams, commitment: Commitment, coeffs: &[F], zeta: F) -> OpeningProof {
    let hi_to_lo: Vec<F> = coeffs.iter().rev().copied().collect();
    let proofs = pcs::open_at_points_with_coeffs(
        pcs_params,
        &[commitment],
        |_poly, _z| F::zero(),
        |_poly, sink| sink(hi_to_lo.clone()),
        &[zeta],
    );
    proofs.into_iter().next().expect("single-point opening")
}

/// Bind `commitments` under `label`, then draw the corresponding challenge.
fn derive_randomness(fs: &mut Transcript, label: FsLabel, commitments: &[Commitment]) -> F {
    for c in commitments {
        fs.absorb_commitment_l(label, c);
    }
    fs.challenge_f_l(label)
}

/// Generate a proof that `t1` and `t2` are the same vector, permuted.
/// `t1.len()` must equal `t2.len()` and be a power of two.
pub fn prove(pcs_params: &PcsParams, t1: &[F], t2: &[F], fs: &mut Transcript) -> Result<Proof, PermutationError> {
    let s = t1.len();
    if t2.len() != s {
        return Err(PermutationError::SizeMismatch);
    }
    if s == 0 || !s.is_power_of_two() {
        return Err(PermutationError::BadSize);
    }

    let omega = F::get_root_of_unity(s as u64).ok_or(PermutationError::NoRootOfUnity)?;
    let time_domain = Domain::new_with_c(s, omega, F::from(1u64));
    let coset_shift = F::from(COSET_SHIFT);

    let ct1 = domain::ifft_block_evals_to_coeffs(&time_domain, t1);
    let ct2 = domain::ifft_block_evals_to_coeffs(&time_domain, t2);
    let t1_comm = commit_coeffs(pcs_params, "permutation.t1", &ct1);
    let t2_comm = commit_coeffs(pcs_params, "permutation.t2", &ct2);

    let epsilon = derive_randomness(fs, FsLabel::Epsilon, &[t1_comm, t2_comm]);

    let z_lagrange = evaluate_accumulation_polynomial(t1, t2, epsilon);
    let cz = domain::ifft_block_evals_to_coeffs(&time_domain, &z_lagrange);
    let z_comm = commit_coeffs(pcs_params, "permutation.z", &cz);

    let lz = coset_evals_from_coeffs(&time_domain, &cz, coset_shift);
    let lt1 = coset_evals_from_coeffs(&time_domain, &ct1, coset_shift);
    let lt2 = coset_evals_from_coeffs(&time_domain, &ct2, coset_shift);

    let num_first = evaluate_first_part_num(&lt1, &lt2, &lz, epsilon);
    let num_second = evaluate_second_part_num(&lz, s, coset_shift, omega);

    let omega_coeff = derive_randomness(fs, FsLabel::Omega, &[z_comm]);

    let one = F::from(1u64);
    let vanishing_on_coset_inv =
        (coset_shift.pow([s as u64]) - one).inverse().expect("coset is disjoint from H");
    let folded: Vec<F> = (0..s)
        .map(|i| (omega_coeff * num_second[i] + num_first[i]) * vanishing_on_coset_inv)
        .collect();
    let q_coeffs = coset_coeffs_from_evals(&time_domain, &folded, coset_shift);
    let q_comm = commit_coeffs(pcs_params, "permutation.q", &q_coeffs);

    let eta = derive_randomness(fs, FsLabel::Eta, &[q_comm]);

    let batched_opening = pcs::batch_open_single_point(
        pcs_params,
        &[t1_comm, t2_comm, z_comm, q_comm],
        &[ct1, ct2, cz.clone(), q_coeffs],
        eta,
        fs,
    );
    let shifted_z_opening = open_single(pcs_params, z_comm, &cz, eta * omega);

    Ok(Proof {
        size: s,
        g: omega,
        t1: t1_comm,
        t2: t2_comm,
        z: z_comm,
        q: q_comm,
        batched_opening,
        shifted_z_opening,
    })
}

/// Verify a permutation proof produced by [`prove`].
pub fn verify(pcs_params: &PcsParams, proof: &Proof, fs: &mut Transcript) -> Result<(), PermutationError> {
    if proof.batched_opening.values.len() != 4 {
        return Err(PermutationError::Shape);
    }

    let epsilon = derive_randomness(fs, FsLabel::Epsilon, &[proof.t1, proof.t2]);
    let omega_coeff = derive_randomness(fs, FsLabel::Omega, &[proof.z]);
    let eta = derive_randomness(fs, FsLabel::Eta, &[proof.q]);

    let t1_eval = proof.batched_opening.values[0];
    let t2_eval = proof.batched_opening.values[1];
    let z_eval = proof.batched_opening.values[2];
    let q_eval = proof.batched_opening.values[3];
    let z_shifted_eval = proof.shifted_z_opening.value;

    let one = F::from(1u64);
    let vanishing_at_eta = eta.pow([proof.size as u64]) - one;
    let l0_at_eta = vanishing_at_eta * (eta - one).inverse().expect("eta != 1");

    let rhs = vanishing_at_eta * q_eval;
    let first_part = (epsilon - t2_eval) * z_shifted_eval - (epsilon - t1_eval) * z_eval;
    let second_part = (z_eval - one) * l0_at_eta * omega_coeff;
    let lhs = second_part + first_part;
    if lhs != rhs {
        return Err(PermutationError::RelationFailed);
    }

    pcs::batch_verify_single_point(
        pcs_params,
        &[proof.t1, proof.t2, proof.z, proof.q],
        eta,
        &proof.batched_opening,
        fs,
    )?;

    let shifted_eta = eta * proof.g;
    pcs::verify_openings(
        pcs_params,
        &[proof.z],
        &[shifted_eta],
        &[z_shifted_eval],
        std::slice::from_ref(&proof.shifted_z_opening),
    )?;

    let half_order = proof.g.pow([(proof.size / 2) as u64]);
    if half_order == one {
        return Err(PermutationError::BadGenerator);
    }
    if half_order * half_order != one {
        return Err(PermutationError::BadGenerator);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(v: u64) -> F {
        F::from(v)
    }

    /// Relies on the `dev-srs` feature's lazily-initialized, auto-growing
    /// singleton SRS (deterministic seed) to back these params.
    fn params_and_srs(max_degree: usize) -> PcsParams {
        PcsParams { max_degree, basis: pcs::Basis::Coefficient, srs_placeholder: () }
    }

    #[test]
    #[cfg(feature = "dev-srs")]
    fn prove_then_verify_round_trips_on_a_permutation() {
        let t1 = vec![f(1), f(2), f(3), f(4)];
        let t2 = vec![f(3), f(1), f(4), f(2)]; // same multiset, permuted
        let pcs_params = params_and_srs(t1.len() - 1);

        let mut fs_p = Transcript::new("permutation-test");
        let proof = prove(&pcs_params, &t1, &t2, &mut fs_p).unwrap();

        let mut fs_v = Transcript::new("permutation-test");
        verify(&pcs_params, &proof, &mut fs_v).unwrap();
    }

    #[test]
    #[cfg(feature = "dev-srs")]
    fn non_permuted_vectors_fail_the_relation_check() {
        let t1 = vec![f(1), f(2), f(3), f(4)];
        let t2 = vec![f(5), f(6), f(7), f(8)]; // not a permutation of t1
        let pcs_params = params_and_srs(t1.len() - 1);

        let mut fs_p = Transcript::new("permutation-test");
        let proof = prove(&pcs_params, &t1, &t2, &mut fs_p).unwrap();

        let mut fs_v = Transcript::new("permutation-test");
        assert!(verify(&pcs_params, &proof, &mut fs_v).is_err());
    }

    #[test]
    #[cfg(feature = "dev-srs")]
    fn mismatched_lengths_are_rejected_before_any_fft() {
        let pcs_params = params_and_srs(3);
        let mut fs = Transcript::new("permutation-test");
        let err = prove(&pcs_params, &[f(1), f(2)], &[f(1)], &mut fs).unwrap_err();
        assert!(matches!(err, PermutationError::SizeMismatch));
    }
}
