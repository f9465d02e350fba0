//! Layered arithmetic circuits: gates, wires, topological order, assignment
//!
//! A [`Circuit`] is a flat, ordered list of [`Wire`]s. Each non-input wire
//! names a [`Gate`] and the indices of its input wires; input wires carry an
//! implicit identity gate. The list need not already be topologically
//! ordered on construction — [`Circuit::topological_order`] computes one
//! that stays close to the given order.

#![forbid(unsafe_code)]

use std::collections::HashMap;

use crate::multilin::MultiLin;
use crate::F;

/// A gate: a pointwise function of its inputs, plus its algebraic degree
/// (used to size sum-check round polynomials).
pub trait Gate: std::fmt::Debug {
    /// Evaluate the gate on concrete input values.
    fn evaluate(&self, inputs: &[F]) -> F;
    /// Total degree of the gate as a polynomial in its inputs.
    fn degree(&self) -> usize;
}

/// The implicit gate assigned to every input wire: returns its single input
/// unchanged.
#[derive(Debug, Clone, Copy)]
pub struct IdentityGate;

impl Gate for IdentityGate {
    fn evaluate(&self, inputs: &[F]) -> F {
        inputs[0]
    }
    fn degree(&self) -> usize {
        1
    }
}

/// Index of a wire within a [`Circuit`]'s wire list. Stable across
/// [`Circuit::topological_order`] (which reorders logically, not physically).
pub type WireId = usize;

/// One wire of the circuit: a gate (or `None` for an input wire) plus the
/// ids of its inputs.
pub struct Wire {
    gate: Option<Box<dyn Gate>>,
    inputs: Vec<WireId>,
    /// Number of distinct consumers; filled in by [`Circuit::topological_order`].
    fan_out: usize,
}

impl std::fmt::Debug for Wire {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wire")
            .field("is_input", &self.is_input())
            .field("inputs", &self.inputs)
            .field("fan_out", &self.fan_out)
            .finish()
    }
}

impl Wire {
    /// Create an input wire (no gate, no predecessors).
    pub fn input() -> Self {
        Self { gate: None, inputs: Vec::new(), fan_out: 0 }
    }

    /// Create a wire computed from `gate` applied to `inputs`.
    pub fn gated(gate: Box<dyn Gate>, inputs: Vec<WireId>) -> Self {
        Self { gate: Some(gate), inputs, fan_out: 0 }
    }

    /// Whether this wire has no predecessors (an input wire).
    pub fn is_input(&self) -> bool {
        self.inputs.is_empty()
    }

    /// Whether this wire is a circuit output (no consumers).
    pub fn is_output(&self) -> bool {
        self.fan_out == 0
    }

    /// Number of distinct claims this wire can accumulate: 1 if it is an
    /// output (the initial random-point claim), otherwise its fan-out.
    pub fn num_claims(&self) -> usize {
        if self.is_output() {
            1
        } else {
            self.fan_out
        }
    }

    /// Ids of this wire's inputs (empty for input wires).
    pub fn inputs(&self) -> &[WireId] {
        &self.inputs
    }

    /// The gate's degree, or `1` for input wires (identity gate).
    pub fn degree(&self) -> usize {
        self.gate.as_ref().map_or(1, |g| g.degree())
    }

    /// Borrow this wire's gate, or `None` for an input wire.
    pub fn gate_ref(&self) -> Option<&dyn Gate> {
        self.gate.as_deref()
    }

    /// Evaluate this wire's gate on concrete input values. Panics if called
    /// on an input wire (callers substitute the identity gate explicitly).
    pub fn evaluate(&self, inputs: &[F]) -> F {
        self.gate.as_ref().expect("evaluate called on input wire").evaluate(inputs)
    }
}

/// A layered arithmetic circuit: an ordered, acyclic list of wires.
#[derive(Debug)]
pub struct Circuit {
    wires: Vec<Wire>,
}

/// Errors from circuit construction or traversal.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CircuitError {
    /// A wire referenced an input index `>=` its own index (would create a
    /// back edge once reordered, or references a wire that doesn't exist).
    #[error("wire {wire} references out-of-range input {input}")]
    BadInputRef {
        /// The wire with the bad reference.
        wire: WireId,
        /// The out-of-range input index it named.
        input: WireId,
    },
    /// Assignment tables did not all share the same instance count.
    #[error("wire {wire} has {got} instances, expected {expected}")]
    InconsistentInstanceCount {
        /// The offending wire.
        wire: WireId,
        /// The length actually found.
        got: usize,
        /// The length every other wire agreed on.
        expected: usize,
    },
}

impl Circuit {
    /// Build a circuit from an explicit wire list. Input references need
    /// only point at a valid index in `wires`; the list need not already be
    /// in dependency order.
    pub fn new(wires: Vec<Wire>) -> Result<Self, CircuitError> {
        for (i, w) in wires.iter().enumerate() {
            for &inp in &w.inputs {
                if inp >= wires.len() {
                    return Err(CircuitError::BadInputRef { wire: i, input: inp });
                }
            }
        }
        let mut circuit = Self { wires };
        circuit.set_fan_outs();
        Ok(circuit)
    }

    fn set_fan_outs(&mut self) {
        for w in &mut self.wires {
            w.fan_out = 0;
        }
        for i in 0..self.wires.len() {
            let mut seen = std::collections::HashSet::new();
            for &inp in &self.wires[i].inputs {
                seen.insert(inp);
            }
            for inp in seen {
                self.wires[inp].fan_out += 1;
            }
        }
    }

    /// Number of wires.
    pub fn len(&self) -> usize {
        self.wires.len()
    }

    /// Whether the circuit has no wires.
    pub fn is_empty(&self) -> bool {
        self.wires.is_empty()
    }

    /// Borrow a wire by id.
    pub fn wire(&self, id: WireId) -> &Wire {
        &self.wires[id]
    }

    /// Compute a topological order over wire ids: every wire's inputs
    /// precede it. The "least ready" pointer keeps the result close to the
    /// original wire order rather than e.g. a DFS postorder.
    pub fn topological_order(&self) -> Vec<WireId> {
        let n = self.wires.len();
        let mut status: Vec<usize> = self.wires.iter().map(|w| w.inputs.len()).collect();
        let mut consumers: Vec<Vec<WireId>> = vec![Vec::new(); n];
        for (i, w) in self.wires.iter().enumerate() {
            let mut seen = std::collections::HashSet::new();
            for &inp in &w.inputs {
                if seen.insert(inp) {
                    consumers[inp].push(i);
                }
            }
        }

        let mut least_ready = 0usize;
        while least_ready < n && status[least_ready] != 0 {
            least_ready += 1;
        }

        let mut sorted = Vec::with_capacity(n);
        let mut done = vec![false; n];
        for _ in 0..n {
            let cur = least_ready;
            sorted.push(cur);
            done[cur] = true;
            status[cur] = usize::MAX;
            for &out in &consumers[cur] {
                status[out] -= 1;
                if status[out] == 0 && out < least_ready {
                    least_ready = out;
                }
            }
            least_ready += 1;
            while least_ready < n && (done[least_ready] || status[least_ready] != 0) {
                least_ready += 1;
            }
        }
        sorted
    }
}

/// Per-wire evaluation tables across all instances, indexed by [`WireId`].
#[derive(Debug, Default)]
pub struct WireAssignment(pub HashMap<WireId, MultiLin>);

impl WireAssignment {
    /// Start from a set of input-wire assignments; non-input wires are
    /// filled in by [`WireAssignment::complete`].
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Evaluate every non-input wire's gate pointwise, in topological order,
    /// from its inputs' tables. All input wires must already have an entry
    /// with a common table length `2^v`; that length is asserted across
    /// every wire filled in here.
    pub fn complete(&mut self, circuit: &Circuit) -> Result<(), CircuitError> {
        let order = circuit.topological_order();
        let num_instances = order
            .iter()
            .find_map(|&id| self.0.get(&id).map(MultiLin::len))
            .unwrap_or(1);

        for &id in &order {
            let wire = circuit.wire(id);
            if wire.is_input() {
                if let Some(table) = self.0.get(&id) {
                    if table.len() != num_instances {
                        return Err(CircuitError::InconsistentInstanceCount {
                            wire: id,
                            got: table.len(),
                            expected: num_instances,
                        });
                    }
                }
                continue;
            }
            let mut evals = Vec::with_capacity(num_instances);
            for k in 0..num_instances {
                let mut ins = Vec::with_capacity(wire.inputs().len());
                for &inp in wire.inputs() {
                    let table = self.0.get(&inp).ok_or(CircuitError::InconsistentInstanceCount {
                        wire: inp,
                        got: 0,
                        expected: num_instances,
                    })?;
                    if table.len() != num_instances {
                        return Err(CircuitError::InconsistentInstanceCount {
                            wire: inp,
                            got: table.len(),
                            expected: num_instances,
                        });
                    }
                    ins.push(table.0[k]);
                }
                evals.push(wire.evaluate(&ins));
            }
            self.0.insert(id, MultiLin::new(evals));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    /// y = x*x + x, matching scenario S1.
    fn s1_circuit() -> Circuit {
        let wires = vec![
            Wire::input(),                                  // 0: x
            Wire::gated(Box::new(Mul), vec![0, 0]),          // 1: x*x
            Wire::gated(Box::new(Add), vec![1, 0]),          // 2: x*x + x
        ];
        Circuit::new(wires).unwrap()
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let c = s1_circuit();
        let order = c.topological_order();
        let pos = |id: WireId| order.iter().position(|&x| x == id).unwrap();
        assert!(pos(0) < pos(1));
        assert!(pos(1) < pos(2));
    }

    #[test]
    fn output_wire_has_zero_fan_out() {
        let c = s1_circuit();
        assert!(c.wire(2).is_output());
        assert!(!c.wire(0).is_output());
        assert!(!c.wire(1).is_output());
    }

    #[test]
    fn repeated_input_slot_counts_once_for_fan_out() {
        // wire 1 uses wire 0 twice; fan_out of wire 0 must still be 1 from wire 1.
        let c = s1_circuit();
        assert_eq!(c.wire(0).fan_out, 2); // consumed by wire 1 (once, deduped) and wire 2
    }

    #[test]
    fn complete_assignment_matches_s1_vector() {
        let c = s1_circuit();
        let mut assignment = WireAssignment::new();
        let xs: Vec<F> = [1u64, 2, 3, 4].into_iter().map(F::from).collect();
        assignment.0.insert(0, MultiLin::new(xs));
        assignment.complete(&c).unwrap();
        let ys = &assignment.0[&2];
        let expect: Vec<F> = [2u64, 6, 12, 20].into_iter().map(F::from).collect();
        assert_eq!(ys.0, expect);
    }

    #[test]
    fn complete_is_idempotent() {
        let c = s1_circuit();
        let mut assignment = WireAssignment::new();
        let xs: Vec<F> = [1u64, 2, 3, 4].into_iter().map(F::from).collect();
        assignment.0.insert(0, MultiLin::new(xs));
        assignment.complete(&c).unwrap();
        let first = assignment.0[&2].clone();
        assignment.complete(&c).unwrap();
        assert_eq!(assignment.0[&2], first);
    }
}
