//! Per-wire claim bookkeeping for the GKR sum-check reduction
//!
//! Each wire of a [`Circuit`] accumulates one claim per distinct consumer (or
//! a single claim, for an output wire, from the initial random point). A
//! [`ClaimsManager`] owns that bookkeeping and the [`Pool`] used to clone
//! preprocessor tables; it is threaded through [`crate::gkr`]'s prove/verify
//! loop as an explicit parameter rather than stored inside a claim, which
//! would create a claim <-> manager reference cycle.
//!
//! Input wires carry no [`Gate`]; claims about them are evaluated with a
//! virtual identity gate (a static, zero-sized [`IdentityGate`] borrowed for
//! the claim's lifetime) instead of mutating the circuit to install one.

#![forbid(unsafe_code)]

use std::collections::{HashMap, HashSet};

use crate::circuit::{Circuit, Gate, IdentityGate, WireAssignment, WireId};
use crate::multilin::{self, MultiLin};
use crate::pool::Pool;
use crate::sumcheck::{ProverClaim, VerifierClaim};
use crate::F;

static IDENTITY_GATE: IdentityGate = IdentityGate;

#[derive(Debug, Default)]
struct ClaimRecord {
    evaluation_points: Vec<Vec<F>>,
    claimed_evaluations: Vec<F>,
}

/// Owns the per-wire claim records and the scratch-table pool for one
/// prove or verify session.
pub struct ClaimsManager<'a> {
    circuit: &'a Circuit,
    assignment: &'a WireAssignment,
    records: HashMap<WireId, ClaimRecord>,
    pool: Pool,
}

impl<'a> ClaimsManager<'a> {
    /// Start a fresh manager. Every wire's claimed-evaluations buffer is
    /// sized to [`crate::circuit::Wire::num_claims`] up front, mirroring the
    /// statically known bound on how many claims a wire will ever receive.
    pub fn new(circuit: &'a Circuit, assignment: &'a WireAssignment) -> Self {
        let mut records = HashMap::with_capacity(circuit.len());
        for id in 0..circuit.len() {
            let n = circuit.wire(id).num_claims();
            records.insert(
                id,
                ClaimRecord {
                    evaluation_points: Vec::with_capacity(n),
                    claimed_evaluations: vec![F::from(0u64); n],
                },
            );
        }
        Self { circuit, assignment, records, pool: Pool::new() }
    }

    /// Record a single claim about `wire`'s evaluation at `point`.
    pub fn add(&mut self, wire: WireId, point: Vec<F>, evaluation: F) {
        let rec = self.records.get_mut(&wire).expect("wire has a claim record");
        let i = rec.evaluation_points.len();
        rec.claimed_evaluations[i] = evaluation;
        rec.evaluation_points.push(point);
    }

    /// Record one claim per distinct input of `wire`, all at the same
    /// `point`, taking each input's value from `evaluations` (indexed by
    /// input slot, as ordered in the wire's input list). An input wire used
    /// in more than one slot is only claimed once.
    pub fn add_for_input(&mut self, wire: WireId, point: &[F], evaluations: &[F]) {
        let inputs = self.circuit.wire(wire).inputs().to_vec();
        let mut seen = HashSet::new();
        for (slot, &input_wire) in inputs.iter().enumerate() {
            if seen.insert(input_wire) {
                self.add(input_wire, point.to_vec(), evaluations[slot]);
            }
        }
    }

    /// Drop the bookkeeping for `wire`; called once its claim has been
    /// proved or verified and will not be revisited.
    pub fn delete(&mut self, wire: WireId) {
        self.records.remove(&wire);
    }

    /// Number of claims currently recorded against `wire`.
    pub fn claims_num(&self, wire: WireId) -> usize {
        self.records[&wire].evaluation_points.len()
    }

    fn gate_for(&self, wire: WireId) -> &'a dyn Gate {
        let w = self.circuit.wire(wire);
        if w.is_input() {
            &IDENTITY_GATE
        } else {
            // SAFETY-free: the trait object lives as long as `self.circuit`
            // (`'a`), not as long as `&self`.
            let g: &dyn Gate = w.gate_ref().expect("non-input wire has a gate");
            g
        }
    }

    /// Build the verifier-side view of `wire`'s claim.
    pub fn lazy_claim(&self, wire: WireId) -> LazyClaim<'a, '_> {
        let rec = &self.records[&wire];
        let is_input = self.circuit.wire(wire).is_input();
        LazyClaim {
            gate: self.gate_for(wire),
            is_input,
            input_wire_assignment: if is_input { self.assignment.0.get(&wire) } else { None },
            evaluation_points: &rec.evaluation_points,
            claimed_evaluations: &rec.claimed_evaluations,
        }
    }

    /// Build the prover-side active claim for `wire`, cloning its input
    /// preprocessors (or, for an input wire, its own assignment) out of the
    /// shared pool.
    pub fn active_claim(&mut self, wire: WireId) -> ActiveClaim<'a> {
        let rec = &self.records[&wire];
        let evaluation_points = rec.evaluation_points.clone();
        let claimed_evaluations = rec.claimed_evaluations.clone();
        let w = self.circuit.wire(wire);
        let input_preprocessors = if w.is_input() {
            let table = &self.assignment.0[&wire];
            vec![MultiLin::new(self.pool.clone_from(&table.0))]
        } else {
            w.inputs()
                .iter()
                .map(|&inp| MultiLin::new(self.pool.clone_from(&self.assignment.0[&inp].0)))
                .collect()
        };
        ActiveClaim {
            gate: self.gate_for(wire),
            evaluation_points,
            claimed_evaluations,
            input_preprocessors,
            eq: MultiLin::new(vec![F::from(1u64)]),
        }
    }
}

/// Verifier-side view of a wire's accumulated claims: everything needed to
/// check a [`crate::sumcheck::Proof`] without the prover's witness data.
pub struct LazyClaim<'a, 'm> {
    gate: &'a dyn Gate,
    is_input: bool,
    input_wire_assignment: Option<&'m MultiLin>,
    evaluation_points: &'m [Vec<F>],
    claimed_evaluations: &'m [F],
}

impl<'a, 'm> LazyClaim<'a, 'm> {
    /// The `i`th recorded evaluation point. Used by callers that check a
    /// single claim directly, bypassing the sum-check engine entirely.
    pub fn evaluation_point(&self, i: usize) -> &[F] {
        &self.evaluation_points[i]
    }

    /// The `i`th recorded claimed evaluation.
    pub fn claimed_evaluation(&self, i: usize) -> F {
        self.claimed_evaluations[i]
    }
}

impl<'a, 'm> VerifierClaim for LazyClaim<'a, 'm> {
    fn vars_num(&self) -> usize {
        self.evaluation_points[0].len()
    }

    fn degree(&self) -> usize {
        1 + self.gate.degree()
    }

    fn claims_num(&self) -> usize {
        self.evaluation_points.len()
    }

    fn combined_sum(&self, a: F) -> F {
        let mut acc = F::from(0u64);
        for c in self.claimed_evaluations.iter().rev() {
            acc = acc * a + c;
        }
        acc
    }

    fn verify_final_eval(
        &self,
        r: &[F],
        combination_coeff: F,
        purported_value: F,
        final_evals: &[F],
    ) -> bool {
        let num_claims = self.evaluation_points.len();
        let mut evaluation = multilin::eq_eval(&self.evaluation_points[num_claims - 1], r);
        for i in (0..num_claims - 1).rev() {
            evaluation = evaluation * combination_coeff + multilin::eq_eval(&self.evaluation_points[i], r);
        }
        let gate_evaluation = if self.is_input {
            self.input_wire_assignment.expect("input wire has an assignment").evaluate(r)
        } else {
            self.gate.evaluate(final_evals)
        };
        evaluation * gate_evaluation == purported_value
    }
}

/// Prover-side active claim: the `eq`-combined, gate-applied sum the
/// sum-check engine drives to its final evaluation.
pub struct ActiveClaim<'a> {
    gate: &'a dyn Gate,
    evaluation_points: Vec<Vec<F>>,
    claimed_evaluations: Vec<F>,
    input_preprocessors: Vec<MultiLin>,
    eq: MultiLin,
}

impl<'a> ActiveClaim<'a> {
    /// `g_j(1), ..., g_j(D)`: the round polynomial's evaluations, computed
    /// from the current `eq`/input-preprocessor bookkeeping tables via their
    /// val/step decomposition (each is linear in the bound variable, so a
    /// single addition per table steps from `f(d)` to `f(d+1)`).
    fn compute_round_poly(&self) -> Vec<F> {
        let (mut e_val, e_step) = val_and_step(&self.eq.0);
        let mut pu_val = Vec::with_capacity(self.input_preprocessors.len());
        let mut pu_step = Vec::with_capacity(self.input_preprocessors.len());
        for p in &self.input_preprocessors {
            let (v, s) = val_and_step(&p.0);
            pu_val.push(v);
            pu_step.push(s);
        }

        let degree = 1 + self.gate.degree();
        let n = e_val.len();
        let mut round_poly = vec![F::from(0u64); degree];
        let mut gate_input = vec![F::from(0u64); pu_val.len()];

        for (d, slot) in round_poly.iter_mut().enumerate() {
            let not_last = d + 1 < degree;
            let mut acc = F::from(0u64);
            for i in 0..n {
                for (g, v) in gate_input.iter_mut().zip(pu_val.iter()) {
                    *g = v[i];
                }
                acc += self.gate.evaluate(&gate_input) * e_val[i];
                if not_last {
                    for (inp_i, v) in pu_val.iter_mut().enumerate() {
                        v[i] += pu_step[inp_i][i];
                    }
                    e_val[i] += e_step[i];
                }
            }
            *slot = acc;
        }
        round_poly
    }
}

/// Split `m` (length `2n`) into `val = m[n..]` and `step = m[n..] - m[..n]`,
/// so that `f(x) = val + x * step` recovers `m` at `x = 0, 1`.
fn val_and_step(m: &[F]) -> (Vec<F>, Vec<F>) {
    let half = m.len() / 2;
    let val = m[half..].to_vec();
    let step: Vec<F> = (0..half).map(|i| m[half + i] - m[i]).collect();
    (val, step)
}

impl<'a> ProverClaim for ActiveClaim<'a> {
    fn vars_num(&self) -> usize {
        self.evaluation_points[0].len()
    }

    fn degree(&self) -> usize {
        1 + self.gate.degree()
    }

    fn combine(&mut self, combination_coeff: F) -> Vec<F> {
        let claims_num = self.evaluation_points.len();
        let mut eq = multilin::eq(&self.evaluation_points[0]);
        let mut a_i = combination_coeff;
        for k in 1..claims_num {
            let eq_k = multilin::eq(&self.evaluation_points[k]);
            for (e, ek) in eq.iter_mut().zip(eq_k.iter()) {
                *e += a_i * ek;
            }
            if k + 1 < claims_num {
                a_i *= combination_coeff;
            }
        }
        self.eq = MultiLin::new(eq);
        self.compute_round_poly()
    }

    fn next(&mut self, challenge: F) -> Vec<F> {
        self.eq = self.eq.fold(challenge);
        for p in self.input_preprocessors.iter_mut() {
            *p = p.fold(challenge);
        }
        self.compute_round_poly()
    }

    fn prove_final_eval(&mut self, r: &[F]) -> Vec<F> {
        let last = *r.last().expect("at least one round");
        let mut evaluations = Vec::with_capacity(self.input_preprocessors.len());
        for p in self.input_preprocessors.iter_mut() {
            *p = p.fold(last);
            debug_assert_eq!(p.len(), 1);
            evaluations.push(p.0[0]);
        }
        evaluations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, Wire};

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
    fn add_for_input_dedups_repeated_slot() {
        let c = s1_circuit();
        let mut assignment = WireAssignment::new();
        assignment.0.insert(0, MultiLin::new(vec![f(1), f(2), f(3), f(4)]));
        assignment.complete(&c).unwrap();
        let mut mgr = ClaimsManager::new(&c, &assignment);
        // wire 1 = Mul(0,0): adding for input should only add one claim to wire 0.
        mgr.add_for_input(1, &[f(7), f(9)], &[f(11), f(13)]);
        assert_eq!(mgr.claims_num(0), 1);
    }

    #[test]
    fn active_claim_round_poly_has_expected_length() {
        let c = s1_circuit();
        let mut assignment = WireAssignment::new();
        assignment.0.insert(0, MultiLin::new(vec![f(1), f(2), f(3), f(4)]));
        assignment.complete(&c).unwrap();
        let mut mgr = ClaimsManager::new(&c, &assignment);
        mgr.add(2, vec![f(0), f(0)], assignment.0[&2].evaluate(&[f(0), f(0)]));
        let mut claim = mgr.active_claim(2);
        let poly = claim.combine(f(1));
        // wire 2 is Add (degree 1): round polynomial degree bound is 1+1=2.
        assert_eq!(poly.len(), 2);
    }

    #[test]
    fn lazy_claim_combined_sum_matches_horner() {
        let c = s1_circuit();
        let mut assignment = WireAssignment::new();
        assignment.0.insert(0, MultiLin::new(vec![f(1), f(2), f(3), f(4)]));
        assignment.complete(&c).unwrap();
        let mut mgr = ClaimsManager::new(&c, &assignment);
        mgr.add(2, vec![f(0), f(0)], f(2));
        mgr.add(2, vec![f(1), f(0)], f(6));
        let lazy = mgr.lazy_claim(2);
        let a = f(3);
        assert_eq!(lazy.combined_sum(a), f(2) + a * f(6));
    }
}
