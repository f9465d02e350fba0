//! Top-level GKR prove/verify
//!
//! Drives [`crate::sumcheck`] once per wire, in reverse topological order
//! (consumers before producers, so that a wire's claims are all registered
//! by the time it is its own turn), starting from a single random point
//! `rho` at which every output wire's claim is taken.

#![forbid(unsafe_code)]

use crate::circuit::{Circuit, CircuitError, WireAssignment, WireId};
use crate::claims::ClaimsManager;
use crate::sumcheck::{self, SumcheckError};
use crate::transcript::{FsLabel, Transcript};
use crate::F;

/// One sum-check proof per wire, indexed by [`WireId`] (empty for wires that
/// need no interaction: input wires with a single claim, and wires with no
/// claims at all).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Proof(pub Vec<sumcheck::Proof>);

/// Errors raised while proving or verifying a circuit's evaluation.
#[derive(Debug, thiserror::Error)]
pub enum GkrError {
    /// Propagated from completing the witness assignment.
    #[error(transparent)]
    Circuit(#[from] CircuitError),
    /// A wire's sum-check proof failed to verify.
    #[error("wire {0} sum-check failed: {1}")]
    Sumcheck(WireId, SumcheckError),
    /// The proof did not have one entry per circuit wire.
    #[error("proof has {got} entries, expected {expected}")]
    WrongLength {
        /// Entries found.
        got: usize,
        /// Entries expected (one per wire).
        expected: usize,
    },
    /// A wire needing no sum-check carried a non-empty proof.
    #[error("wire {0} needs no proof but one was supplied")]
    UnexpectedProof(WireId),
    /// A wire with a single, directly checkable claim did not match its
    /// assignment.
    #[error("wire {0}'s claim did not match its assignment")]
    DirectEvalMismatch(WireId),
    /// The circuit batches fewer than two instances; GKR's sum-check
    /// reduction only applies when there is at least one variable to bind.
    #[error("circuit has no batched variables to sum-check over")]
    NoInstancesToBatch,
}

fn instance_vars(assignment: &WireAssignment) -> usize {
    assignment.0.values().next().map(|ml| ml.num_vars()).unwrap_or(0)
}

/// Prove that `assignment` is a consistent evaluation of `circuit`.
/// `assignment` need only contain the input wires' tables; it is completed
/// in place.
pub fn prove(
    circuit: &Circuit,
    assignment: &mut WireAssignment,
    fs: &mut Transcript,
) -> Result<Proof, GkrError> {
    assignment.complete(circuit)?;
    let v = instance_vars(assignment);
    if v == 0 {
        return Err(GkrError::NoInstancesToBatch);
    }

    let order = circuit.topological_order();
    let mut manager = ClaimsManager::new(circuit, assignment);
    let mut proofs: Vec<sumcheck::Proof> = (0..circuit.len()).map(|_| sumcheck::Proof::empty()).collect();

    let rho = fs.challenge_points_l(FsLabel::Rho, v);

    for &wire in order.iter().rev() {
        if circuit.wire(wire).is_output() {
            let eval = assignment.0[&wire].evaluate(&rho);
            manager.add(wire, rho.clone(), eval);
        }

        let claims_num = manager.claims_num(wire);
        let no_proof_needed = (circuit.wire(wire).is_input() && claims_num == 1) || claims_num == 0;

        if !no_proof_needed {
            let mut active = manager.active_claim(wire);
            let (proof, r) = sumcheck::prove(&mut active, fs);
            if !proof.final_eval_proof.is_empty() {
                manager.add_for_input(wire, &r, &proof.final_eval_proof);
            }
            proofs[wire] = proof;
        }
        manager.delete(wire);
    }

    Ok(Proof(proofs))
}

/// Verify `proof` against `circuit` and the (possibly partial — only input
/// and output wires need entries) `assignment`.
pub fn verify(
    circuit: &Circuit,
    assignment: &WireAssignment,
    proof: &Proof,
    fs: &mut Transcript,
) -> Result<(), GkrError> {
    if proof.0.len() != circuit.len() {
        return Err(GkrError::WrongLength { got: proof.0.len(), expected: circuit.len() });
    }
    let v = instance_vars(assignment);
    if v == 0 {
        return Err(GkrError::NoInstancesToBatch);
    }

    let order = circuit.topological_order();
    let mut manager = ClaimsManager::new(circuit, assignment);
    let rho = fs.challenge_points_l(FsLabel::Rho, v);

    for &wire in order.iter().rev() {
        if circuit.wire(wire).is_output() {
            let eval = assignment.0[&wire].evaluate(&rho);
            manager.add(wire, rho.clone(), eval);
        }

        let wire_proof = &proof.0[wire];
        let claims_num = manager.claims_num(wire);
        let is_input = circuit.wire(wire).is_input();

        if (is_input && claims_num == 1) || claims_num == 0 {
            if !wire_proof.is_empty() {
                return Err(GkrError::UnexpectedProof(wire));
            }
            if claims_num == 1 {
                let lazy = manager.lazy_claim(wire);
                let table = assignment.0.get(&wire).ok_or(GkrError::DirectEvalMismatch(wire))?;
                let evaluation = table.evaluate(lazy.evaluation_point(0));
                if evaluation != lazy.claimed_evaluation(0) {
                    return Err(GkrError::DirectEvalMismatch(wire));
                }
            }
        } else {
            let lazy = manager.lazy_claim(wire);
            let r = sumcheck::verify(&lazy, wire_proof, fs).map_err(|e| GkrError::Sumcheck(wire, e))?;
            drop(lazy);
            if !wire_proof.final_eval_proof.is_empty() {
                manager.add_for_input(wire, &r, &wire_proof.final_eval_proof);
            }
        }
        manager.delete(wire);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Gate, Wire};

    #[derive(Debug)]
    struct Mul;
    impl Gate for Mul {
        fn evaluate(&self, inputs: &[F]) -> F {
            inputs[0] * inputs[1]
        }
        fn degree(&self) -> usize {
            2
        }
    }

    #[derive(Debug)]
    struct Add;
    impl Gate for Add {
        fn evaluate(&self, inputs: &[F]) -> F {
            inputs[0] + inputs[1]
        }
        fn degree(&self) -> usize {
            1
        }
    }

    /// y = x*x + x, over 4 instances (matches scenario S1).
    fn s1_circuit() -> Circuit {
        let wires = vec![
            Wire::input(),
            Wire::gated(Box::new(Mul), vec![0, 0]),
            Wire::gated(Box::new(Add), vec![1, 0]),
        ];
        Circuit::new(wires).unwrap()
    }

    fn f(v: u64) -> F {
        F::from(v)
    }

    #[test]
    fn prove_then_verify_round_trips() {
        let circuit = s1_circuit();
        let xs: Vec<F> = [1u64, 2, 3, 4].into_iter().map(F::from).collect();

        let mut prover_assignment = WireAssignment::new();
        prover_assignment.0.insert(0, crate::multilin::MultiLin::new(xs.clone()));
        let mut fs_p = Transcript::new("gkr-test");
        let proof = prove(&circuit, &mut prover_assignment, &mut fs_p).unwrap();

        let mut verifier_assignment = WireAssignment::new();
        verifier_assignment.0.insert(0, crate::multilin::MultiLin::new(xs.clone()));
        verifier_assignment.0.insert(2, prover_assignment.0[&2].clone());
        let mut fs_v = Transcript::new("gkr-test");
        verify(&circuit, &verifier_assignment, &proof, &mut fs_v).unwrap();
    }

    #[test]
    fn tampered_output_assignment_fails_verification() {
        let circuit = s1_circuit();
        let xs: Vec<F> = [1u64, 2, 3, 4].into_iter().map(F::from).collect();

        let mut prover_assignment = WireAssignment::new();
        prover_assignment.0.insert(0, crate::multilin::MultiLin::new(xs.clone()));
        let mut fs_p = Transcript::new("gkr-test");
        let proof = prove(&circuit, &mut prover_assignment, &mut fs_p).unwrap();

        let mut verifier_assignment = WireAssignment::new();
        verifier_assignment.0.insert(0, crate::multilin::MultiLin::new(xs));
        let mut tampered = prover_assignment.0[&2].clone();
        tampered.0[0] += f(1);
        verifier_assignment.0.insert(2, tampered);

        let mut fs_v = Transcript::new("gkr-test");
        assert!(verify(&circuit, &verifier_assignment, &proof, &mut fs_v).is_err());
    }

    #[test]
    fn mismatched_transcript_label_fails_verification() {
        let circuit = s1_circuit();
        let xs: Vec<F> = [1u64, 2, 3, 4].into_iter().map(F::from).collect();

        let mut prover_assignment = WireAssignment::new();
        prover_assignment.0.insert(0, crate::multilin::MultiLin::new(xs.clone()));
        let mut fs_p = Transcript::new("gkr-test");
        let proof = prove(&circuit, &mut prover_assignment, &mut fs_p).unwrap();

        let mut verifier_assignment = WireAssignment::new();
        verifier_assignment.0.insert(0, crate::multilin::MultiLin::new(xs));
        verifier_assignment.0.insert(2, prover_assignment.0[&2].clone());

        // A differently labeled transcript derives different challenges
        // throughout, so the same proof must fail.
        let mut fs_v = Transcript::new("gkr-test-WRONG-LABEL");
        assert!(verify(&circuit, &verifier_assignment, &proof, &mut fs_v).is_err());
    }
}
