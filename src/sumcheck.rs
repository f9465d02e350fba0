//! Generic sum-check prover/verifier
//!
//! The engine itself knows nothing about circuits or gates: it drives a
//! claim through `v` rounds, each producing a degree-bounded univariate
//! polynomial, via the small [`ProverClaim`]/[`VerifierClaim`] traits that
//! [`crate::claims`] implements for the GKR `eqTimesGateEval` claim. This
//! separation mirrors the gate/transcript injection called for in the
//! design notes: the round-polynomial bookkeeping here is reusable for any
//! claim shaped like "sum over the hypercube of a bounded-degree function".

#![forbid(unsafe_code)]

use crate::transcript::{FsLabel, Transcript};
use crate::F;

/// A claim being proved, from the prover's side. A claim of `vars_num()`
/// variables and degree bound `degree()` is driven through `vars_num()`
/// rounds: [`ProverClaim::combine`] starts the first round, then
/// [`ProverClaim::next`] is called once per subsequent round with the
/// previous round's verifier challenge, and finally
/// [`ProverClaim::prove_final_eval`] folds in the last challenge and emits
/// the final-evaluation payload.
pub trait ProverClaim {
    /// Number of sum-check rounds (bound variables).
    fn vars_num(&self) -> usize;
    /// Degree bound `D` of each round polynomial; `D` evaluations
    /// (at `x = 1..=D`) are sent per round.
    fn degree(&self) -> usize;
    /// Fold in the verifier-sampled combination coefficient and return the
    /// first round's `D` evaluations.
    fn combine(&mut self, combination_coeff: F) -> Vec<F>;
    /// Fold in the previous round's challenge and return the next round's
    /// `D` evaluations.
    fn next(&mut self, challenge: F) -> Vec<F>;
    /// Fold in the final challenge and return the final-evaluation payload
    /// (one evaluation per distinct input wire).
    fn prove_final_eval(&mut self, r: &[F]) -> Vec<F>;
}

/// A claim being checked, from the verifier's side.
pub trait VerifierClaim {
    /// Number of sum-check rounds (bound variables).
    fn vars_num(&self) -> usize;
    /// Degree bound of each round polynomial.
    fn degree(&self) -> usize;
    /// How many individual claims were combined into this one.
    fn claims_num(&self) -> usize;
    /// The claimed sum a verifier-sampled coefficient `a` combines the
    /// individual claims into.
    fn combined_sum(&self, a: F) -> F;
    /// Check the final-evaluation payload against the claimed sum-check
    /// outcome at the final point `r`, given the combination coefficient
    /// and the value the last round's polynomial was checked to produce.
    fn verify_final_eval(
        &self,
        r: &[F],
        combination_coeff: F,
        purported_value: F,
        final_evals: &[F],
    ) -> bool;
}

/// A sum-check proof: one round polynomial (given by its `D` evaluations at
/// `x = 1..=D`) per variable, plus the final-evaluation payload. Empty for
/// wires that need no interaction (see `gkr` module).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proof {
    /// Per-round polynomial evaluations at `x = 1, ..., D`.
    pub round_polys: Vec<Vec<F>>,
    /// Final-evaluation payload (input wire evaluations at the final
    /// point).
    pub final_eval_proof: Vec<F>,
}

impl Proof {
    /// A proof with no rounds and no final-evaluation payload.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Whether this is the empty proof.
    pub fn is_empty(&self) -> bool {
        self.round_polys.is_empty() && self.final_eval_proof.is_empty()
    }
}

/// Errors raised while verifying a sum-check proof.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SumcheckError {
    /// A round's polynomial did not have the expected number of
    /// coefficients for the claim's degree bound.
    #[error("round {round} has {got} evaluations, expected {expected}")]
    WrongDegree {
        /// Round index.
        round: usize,
        /// Evaluations found.
        got: usize,
        /// Evaluations expected (`D`).
        expected: usize,
    },
    /// `g_j(0) + g_j(1)` did not equal the previous round's claimed value.
    #[error("round {0} sum check failed")]
    RoundSumMismatch(usize),
    /// The final-evaluation payload failed the claim's check.
    #[error("final evaluation check failed")]
    FinalEvalMismatch,
}

/// Evaluate the degree-`D` polynomial implied by `D` evaluations at
/// `x = 1..=D` (`values`) and an inferred evaluation at `x = 0`
/// (`value_at_zero`), at an arbitrary point `x`, via Lagrange interpolation
/// over the integer nodes `0, 1, ..., D`.
pub fn interpolate(value_at_zero: F, values: &[F], x: F) -> F {
    let d = values.len();
    let nodes: Vec<F> = (0..=d as u64).map(F::from).collect();
    let mut ys = Vec::with_capacity(d + 1);
    ys.push(value_at_zero);
    ys.extend_from_slice(values);

    let mut acc = F::from(0u64);
    for i in 0..=d {
        let mut term = ys[i];
        for j in 0..=d {
            if i == j {
                continue;
            }
            term *= (x - nodes[j]) * (nodes[i] - nodes[j]).inverse().expect("distinct nodes");
        }
        acc += term;
    }
    acc
}

/// Run the sum-check protocol for `claim`, driving the transcript with the
/// fixed label sequence: [`FsLabel::CombinationCoeff`] once, then one
/// [`FsLabel::SumcheckRound`] challenge per round, absorbing each round's
/// polynomial before sampling the next challenge. Returns the proof and the
/// final challenge point `r` (one coordinate per round), which the caller
/// needs to register any claims the final-evaluation payload implies.
pub fn prove(claim: &mut impl ProverClaim, fs: &mut Transcript) -> (Proof, Vec<F>) {
    let v = claim.vars_num();
    debug_assert!(v > 0, "callers must route zero-round claims around the sum-check engine");
    let combination_coeff = fs.challenge_f_l(FsLabel::CombinationCoeff);
    let mut round_polys = Vec::with_capacity(v);
    let mut poly = claim.combine(combination_coeff);
    let mut challenges = Vec::with_capacity(v);
    for round in 0..v {
        fs.absorb_round_poly(&poly);
        let r = fs.challenge_f_l(FsLabel::SumcheckRound);
        challenges.push(r);
        round_polys.push(std::mem::take(&mut poly));
        if round + 1 < v {
            poly = claim.next(r);
        }
    }
    let final_eval_proof = claim.prove_final_eval(&challenges);
    (Proof { round_polys, final_eval_proof }, challenges)
}

/// Verify `proof` against `claim`, replaying the same fixed label sequence
/// the prover used. Returns the final challenge point `r` on success, for
/// the same reason [`prove`] returns it.
pub fn verify(
    claim: &impl VerifierClaim,
    proof: &Proof,
    fs: &mut Transcript,
) -> Result<Vec<F>, SumcheckError> {
    let v = claim.vars_num();
    let d = claim.degree();
    debug_assert!(v > 0, "callers must route zero-round claims around the sum-check engine");
    if proof.round_polys.len() != v {
        return Err(SumcheckError::WrongDegree {
            round: 0,
            got: proof.round_polys.len(),
            expected: v,
        });
    }
    let combination_coeff = fs.challenge_f_l(FsLabel::CombinationCoeff);
    let mut expected_sum = claim.combined_sum(combination_coeff);
    let mut challenges = Vec::with_capacity(v);

    for (round, poly) in proof.round_polys.iter().enumerate() {
        if poly.len() != d {
            return Err(SumcheckError::WrongDegree { round, got: poly.len(), expected: d });
        }
        let g1 = poly[0];
        let g0 = expected_sum - g1;
        fs.absorb_round_poly(poly);
        let r = fs.challenge_f_l(FsLabel::SumcheckRound);
        challenges.push(r);
        expected_sum = interpolate(g0, poly, r);
    }

    if !claim.verify_final_eval(
        &challenges,
        combination_coeff,
        expected_sum,
        &proof.final_eval_proof,
    ) {
        return Err(SumcheckError::FinalEvalMismatch);
    }
    Ok(challenges)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolate_recovers_linear_polynomial() {
        // g(x) = 2 + 3x ; values at x=1 is 5, inferred at x=0 is 2.
        let value_at_zero = F::from(2u64);
        let values = vec![F::from(5u64)];
        assert_eq!(interpolate(value_at_zero, &values, F::from(0u64)), value_at_zero);
        assert_eq!(interpolate(value_at_zero, &values, F::from(1u64)), values[0]);
        assert_eq!(interpolate(value_at_zero, &values, F::from(2u64)), F::from(8u64));
    }

    #[test]
    fn interpolate_recovers_quadratic_polynomial() {
        // g(x) = x^2 ; nodes 0,1,2 -> 0,1,4
        let value_at_zero = F::from(0u64);
        let values = vec![F::from(1u64), F::from(4u64)];
        assert_eq!(interpolate(value_at_zero, &values, F::from(3u64)), F::from(9u64));
    }
}
