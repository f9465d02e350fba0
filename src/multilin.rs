//! Multilinear polynomials represented by their evaluation table
//!
//! A [`MultiLin`] holds the `2^v` evaluations of a multilinear polynomial on
//! the Boolean hypercube `{0,1}^v`, in lexicographic index order where the
//! first coordinate of an assignment is the most significant index bit (so
//! folding always collapses the current most-significant variable).

#![forbid(unsafe_code)]

use ark_ff::Zero;

use crate::F;

/// Evaluation-table representation of a multilinear polynomial.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiLin(pub Vec<F>);

impl MultiLin {
    /// Wrap a table of `2^v` evaluations. Panics if `table.len()` is not a
    /// power of two (including 1 = 2^0).
    pub fn new(table: Vec<F>) -> Self {
        assert!(table.len().is_power_of_two(), "MultiLin table length must be a power of two");
        Self(table)
    }

    /// Number of bound variables, `v` such that `len() == 2^v`.
    pub fn num_vars(&self) -> usize {
        self.0.len().trailing_zeros() as usize
    }

    /// Table length, `2^v`.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the table is empty (never true for a well-formed MultiLin).
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Collapse the current most-significant variable at challenge `r`,
    /// halving the table: `new[i] = low[i] + r * (high[i] - low[i])`.
    pub fn fold(&self, r: F) -> MultiLin {
        MultiLin(fold_table(&self.0, r))
    }

    /// Fold every remaining variable at the corresponding coordinate of
    /// `point`, in order, returning the single resulting evaluation.
    pub fn evaluate(&self, point: &[F]) -> F {
        assert_eq!(point.len(), self.num_vars(), "point length must match num_vars");
        let mut table = self.0.clone();
        for &r in point {
            table = fold_table(&table, r);
        }
        table[0]
    }
}

/// Halve `table` by folding its most-significant variable at `r`.
pub fn fold_table(table: &[F], r: F) -> Vec<F> {
    let half = table.len() / 2;
    let mut out = Vec::with_capacity(half);
    for i in 0..half {
        out.push(table[i] + r * (table[half + i] - table[i]));
    }
    out
}

/// Build the evaluation table of `eq(x, ·)`, the multilinear extension of
/// the Boolean equality function, over `{0,1}^{|x|}`.
///
/// `eq(x, b) = prod_i (x_i*b_i + (1-x_i)*(1-b_i))`, with the same
/// first-coordinate-is-most-significant-bit convention as [`MultiLin`].
pub fn eq(x: &[F]) -> Vec<F> {
    let m = x.len();
    let mut table = vec![F::zero(); 1 << m];
    if m == 0 {
        table[0] = F::from(1u64);
        return table;
    }
    table[0] = F::from(1u64);
    for (i, &xi) in x.iter().enumerate() {
        let n = 1usize << i;
        for j in (0..n).rev() {
            let temp = table[j] * xi;
            table[n + j] = table[j] - temp;
            table[j] = temp;
        }
    }
    table
}

/// Evaluate `eq(x, y) = prod_i (x_i*y_i + (1-x_i)*(1-y_i))` directly, without
/// materializing the `2^|x|`-entry table `eq(x)` builds.
pub fn eq_eval(x: &[F], y: &[F]) -> F {
    assert_eq!(x.len(), y.len(), "eq_eval operands must have the same length");
    let one = F::from(1u64);
    let mut acc = one;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        acc *= xi * yi + (one - xi) * (one - yi);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn f(v: u64) -> F {
        F::from(v)
    }

    #[test]
    fn eq_matches_brute_force_at_boolean_points() {
        let x = [f(1), f(0)];
        let table = eq(&x);
        assert_eq!(table.len(), 4);
        // b = (1,1): eq = x0*b0 + (1-x0)(1-b0) times same for coord 1
        // x=(1,0): eq(x,b) = [b0=1] * [b1=0]
        let expect = |b1: u64, b0: u64| -> F {
            let t0 = if b1 == 1 { x[0] } else { F::from(1u64) - x[0] };
            let t1 = if b0 == 1 { x[1] } else { F::from(1u64) - x[1] };
            t0 * t1
        };
        assert_eq!(table[0], expect(1, 1));
        assert_eq!(table[1], expect(1, 0));
        assert_eq!(table[2], expect(0, 1));
        assert_eq!(table[3], expect(0, 0));
    }

    #[test]
    fn fold_then_evaluate_agree() {
        let table = vec![f(2), f(6), f(12), f(20)];
        let ml = MultiLin::new(table);
        let point = [f(3), f(5)];
        let by_evaluate = ml.evaluate(&point);
        let folded_once = ml.fold(point[0]);
        let folded_twice = folded_once.fold(point[1]);
        assert_eq!(by_evaluate, folded_twice.0[0]);
    }

    #[test]
    fn evaluate_at_boolean_point_matches_table_entry() {
        // table index 2 (binary 10) => first coord = 1, second coord = 0.
        let table = vec![f(10), f(20), f(30), f(40)];
        let ml = MultiLin::new(table.clone());
        let got = ml.evaluate(&[f(1), f(0)]);
        assert_eq!(got, table[2]);
    }

    #[test]
    fn single_variable_fold() {
        let ml = MultiLin::new(vec![f(10), f(20)]);
        let folded = ml.fold(f(3));
        assert_eq!(folded.0, vec![f(10) + f(3) * (f(20) - f(10))]);
    }

    #[test]
    fn eq_eval_matches_table_lookup_at_boolean_point() {
        let x = [f(3), f(5)];
        let table = eq(&x);
        // table index 2 = binary 10 = (b0=1, b1=0)
        assert_eq!(eq_eval(&x, &[f(1), f(0)]), table[2]);
    }

    #[test]
    fn eq_eval_agrees_with_full_evaluate() {
        let x = [f(2), f(7), f(4)];
        let y = [f(9), f(1), f(6)];
        let table = eq(&x);
        let via_table = MultiLin::new(table).evaluate(&y);
        assert_eq!(eq_eval(&x, &y), via_table);
    }
}
