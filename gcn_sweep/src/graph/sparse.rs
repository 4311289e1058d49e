use rayon::prelude::*;

/// Sparse matrix in coordinate form. Entries are kept sorted by (row, col)
/// and coalesced, with exact zeros dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct SparseMatrix {
    rows: usize,
    cols: usize,
    entries: Vec<(usize, usize, f32)>,
}

impl SparseMatrix {
    pub fn from_triplets(rows: usize, cols: usize, triplets: Vec<(usize, usize, f32)>) -> Self {
        let mut triplets = triplets;
        triplets.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));

        let mut entries: Vec<(usize, usize, f32)> = Vec::with_capacity(triplets.len());
        for (r, c, v) in triplets {
            debug_assert!(r < rows && c < cols);
            match entries.last_mut() {
                Some(last) if last.0 == r && last.1 == c => last.2 += v,
                _ => entries.push((r, c, v)),
            }
        }
        entries.retain(|e| e.2 != 0.0);

        Self { rows, cols, entries }
    }

    pub fn identity(n: usize) -> Self {
        Self {
            rows: n,
            cols: n,
            entries: (0..n).map(|i| (i, i, 1.0)).collect(),
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn nnz(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[(usize, usize, f32)] {
        &self.entries
    }

    pub fn scale(&self, factor: f32) -> Self {
        Self::from_triplets(
            self.rows,
            self.cols,
            self.entries.iter().map(|&(r, c, v)| (r, c, v * factor)).collect(),
        )
    }

    pub fn add(&self, other: &Self) -> Self {
        assert_eq!((self.rows, self.cols), (other.rows, other.cols));
        let mut triplets = self.entries.clone();
        triplets.extend_from_slice(&other.entries);
        Self::from_triplets(self.rows, self.cols, triplets)
    }

    pub fn sub(&self, other: &Self) -> Self {
        self.add(&other.scale(-1.0))
    }

    /// Per-row sums of the entry values.
    pub fn row_sums(&self) -> Vec<f32> {
        let mut sums = vec![0.0; self.rows];
        for &(r, _, v) in &self.entries {
            sums[r] += v;
        }
        sums
    }

    fn row_lists(&self) -> Vec<Vec<(usize, f32)>> {
        let mut lists: Vec<Vec<(usize, f32)>> = vec![Vec::new(); self.rows];
        for &(r, c, v) in &self.entries {
            lists[r].push((c, v));
        }
        lists
    }

    /// Sparse-sparse product, one output row per input row in parallel.
    pub fn matmul(&self, other: &Self) -> Self {
        assert_eq!(self.cols, other.rows);
        let self_rows = self.row_lists();
        let other_rows = other.row_lists();

        let row_results: Vec<Vec<(usize, usize, f32)>> = (0..self.rows)
            .into_par_iter()
            .map(|i| {
                let mut acc = vec![0.0f32; other.cols];
                let mut seen = vec![false; other.cols];
                let mut touched: Vec<usize> = Vec::new();
                for &(k, v) in &self_rows[i] {
                    for &(j, w) in &other_rows[k] {
                        // a partial sum can cancel back to exactly 0.0, so
                        // membership must not be keyed on the running value
                        if !seen[j] {
                            seen[j] = true;
                            touched.push(j);
                        }
                        acc[j] += v * w;
                    }
                }
                touched.sort_unstable();
                touched
                    .into_iter()
                    .filter(|&j| acc[j] != 0.0)
                    .map(|j| (i, j, acc[j]))
                    .collect()
            })
            .collect();

        Self {
            rows: self.rows,
            cols: other.cols,
            entries: row_results.into_iter().flatten().collect(),
        }
    }

    pub fn matvec(&self, v: &[f32]) -> Vec<f32> {
        assert_eq!(self.cols, v.len());
        let mut out = vec![0.0; self.rows];
        for &(r, c, w) in &self.entries {
            out[r] += w * v[c];
        }
        out
    }

    /// Row-major dense copy, for tensor upload.
    pub fn to_dense(&self) -> Vec<f32> {
        let mut dense = vec![0.0; self.rows * self.cols];
        for &(r, c, v) in &self.entries {
            dense[r * self.cols + c] = v;
        }
        dense
    }
}

/// `D^-1 m`: every row scaled to unit sum. Zero rows stay zero. Used to
/// preprocess the feature matrix and for the `gcn_test1` support.
pub fn row_normalize(m: &SparseMatrix) -> SparseMatrix {
    let sums = m.row_sums();
    SparseMatrix::from_triplets(
        m.rows(),
        m.cols(),
        m.entries()
            .iter()
            .map(|&(r, c, v)| {
                let s = sums[r];
                // only exact-zero rows are dropped; a negative sum still
                // scales the row by its reciprocal
                (r, c, if s != 0.0 { v / s } else { 0.0 })
            })
            .collect(),
    )
}

/// `D^-1/2 m D^-1/2`. Rows whose sum is not strictly positive get a zero
/// scale factor instead of a NaN.
pub fn sym_normalize(m: &SparseMatrix) -> SparseMatrix {
    let inv_sqrt: Vec<f32> = m
        .row_sums()
        .iter()
        .map(|&s| if s > 0.0 { 1.0 / s.sqrt() } else { 0.0 })
        .collect();
    SparseMatrix::from_triplets(
        m.rows(),
        m.cols(),
        m.entries()
            .iter()
            .map(|&(r, c, v)| (r, c, v * inv_sqrt[r] * inv_sqrt[c]))
            .collect(),
    )
}

/// The renormalization trick: `D^-1/2 (A + I) D^-1/2`.
pub fn renormalized_adj(adj: &SparseMatrix) -> SparseMatrix {
    sym_normalize(&adj.add(&SparseMatrix::identity(adj.rows())))
}

/// Symmetric normalization of `A + sign*I`, with degrees taken from the
/// shifted matrix. `sign` is +1 or -1 for the two adjacency experiments.
pub fn alternate_normalize(adj: &SparseMatrix, sign: f32) -> SparseMatrix {
    sym_normalize(&adj.add(&SparseMatrix::identity(adj.rows()).scale(sign)))
}

/// Largest eigenvalue of a symmetric positive semi-definite matrix by power
/// iteration from a deterministic all-ones start vector.
fn largest_eigenvalue(m: &SparseMatrix) -> f32 {
    let n = m.rows();
    if n == 0 {
        return 0.0;
    }
    let mut v = vec![1.0f32; n];
    let mut lambda = 0.0f32;
    for _ in 0..100 {
        let w = m.matvec(&v);
        let norm = w.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm <= f32::EPSILON {
            return 0.0;
        }
        v = w.iter().map(|x| x / norm).collect();
        lambda = norm;
    }
    lambda
}

/// Chebyshev polynomial basis of the rescaled graph Laplacian, up to
/// `max_degree`. Returns `max_degree + 1` matrices: T_0 = I, T_1 = L_scaled,
/// T_k = 2 * L_scaled * T_{k-1} - T_{k-2}.
pub fn chebyshev_polynomials(adj: &SparseMatrix, max_degree: usize) -> Vec<SparseMatrix> {
    let n = adj.rows();
    let identity = SparseMatrix::identity(n);
    if max_degree == 0 {
        return vec![identity];
    }

    let laplacian = identity.sub(&sym_normalize(adj));
    let mut lambda_max = largest_eigenvalue(&laplacian);
    if lambda_max <= 0.0 {
        // spectral upper bound for a normalized Laplacian
        lambda_max = 2.0;
    }
    let scaled = laplacian.scale(2.0 / lambda_max).sub(&identity);

    let mut basis = vec![identity, scaled.clone()];
    for k in 2..=max_degree {
        let next = scaled.matmul(&basis[k - 1]).scale(2.0).sub(&basis[k - 2]);
        basis.push(next);
    }
    basis
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path_graph() -> SparseMatrix {
        // 0 - 1 - 2
        SparseMatrix::from_triplets(
            3,
            3,
            vec![(0, 1, 1.0), (1, 0, 1.0), (1, 2, 1.0), (2, 1, 1.0)],
        )
    }

    #[test]
    fn from_triplets_coalesces_and_drops_zeros() {
        let m = SparseMatrix::from_triplets(
            2,
            2,
            vec![(0, 0, 1.0), (0, 0, 2.0), (1, 1, 3.0), (1, 1, -3.0)],
        );
        assert_eq!(m.entries(), &[(0, 0, 3.0)]);
    }

    #[test]
    fn matmul_against_identity_is_identity_op() {
        let m = path_graph();
        let id = SparseMatrix::identity(3);
        assert_eq!(m.matmul(&id), m);
        assert_eq!(id.matmul(&m), m);
    }

    #[test]
    fn matmul_small_known_product() {
        let a = SparseMatrix::from_triplets(2, 2, vec![(0, 0, 1.0), (0, 1, 2.0), (1, 1, 3.0)]);
        let b = SparseMatrix::from_triplets(2, 2, vec![(0, 0, 4.0), (1, 0, 5.0), (1, 1, 6.0)]);
        let c = a.matmul(&b);
        // [[1,2],[0,3]] * [[4,0],[5,6]] = [[14,12],[15,18]]
        assert_eq!(
            c.entries(),
            &[(0, 0, 14.0), (0, 1, 12.0), (1, 0, 15.0), (1, 1, 18.0)]
        );
    }

    #[test]
    fn matmul_coalesces_columns_that_cancel_midway() {
        // the first two products of row 0 cancel to exactly 0.0 before the
        // third lands on the same column; the result must still hold a
        // single entry for (0, 0)
        let a = SparseMatrix::from_triplets(1, 3, vec![(0, 0, 1.0), (0, 1, -1.0), (0, 2, 1.0)]);
        let b = SparseMatrix::from_triplets(3, 1, vec![(0, 0, 1.0), (1, 0, 1.0), (2, 0, 1.0)]);
        let c = a.matmul(&b);
        assert_eq!(c.entries(), &[(0, 0, 1.0)]);
        assert_eq!(c.nnz(), 1);
        assert_eq!(c.scale(2.0).entries(), &[(0, 0, 2.0)]);
    }

    #[test]
    fn row_normalize_rows_sum_to_one() {
        let m = SparseMatrix::from_triplets(
            2,
            3,
            vec![(0, 0, 2.0), (0, 2, 2.0), (1, 1, 5.0)],
        );
        let n = row_normalize(&m);
        for (row, expected) in n.row_sums().iter().zip([1.0, 1.0]) {
            assert!((row - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn row_normalize_keeps_zero_rows() {
        let m = SparseMatrix::from_triplets(3, 3, vec![(0, 0, 4.0)]);
        let n = row_normalize(&m);
        assert_eq!(n.row_sums()[1], 0.0);
        assert_eq!(n.row_sums()[2], 0.0);
    }

    #[test]
    fn row_normalize_divides_negative_rows_by_their_sum() {
        let m = SparseMatrix::from_triplets(1, 2, vec![(0, 0, -1.0), (0, 1, -3.0)]);
        let n = row_normalize(&m);
        assert_eq!(n.entries(), &[(0, 0, 0.25), (0, 1, 0.75)]);
    }

    #[test]
    fn renormalized_adj_two_node_graph() {
        let adj = SparseMatrix::from_triplets(2, 2, vec![(0, 1, 1.0), (1, 0, 1.0)]);
        let s = renormalized_adj(&adj);
        // A + I has all row sums 2, so every entry becomes 1/2.
        for &(_, _, v) in s.entries() {
            assert!((v - 0.5).abs() < 1e-6);
        }
        assert_eq!(s.nnz(), 4);
    }

    #[test]
    fn alternate_normalize_negative_shift_guards_low_degree() {
        // degree-1 nodes get row sum 0 under A - I; their entries vanish.
        let adj = path_graph();
        let s = alternate_normalize(&adj, -1.0);
        for &(r, c, v) in s.entries() {
            assert!(v.is_finite(), "entry ({r},{c}) not finite");
        }
    }

    #[test]
    fn chebyshev_basis_length_and_first_term() {
        let adj = path_graph();
        let basis = chebyshev_polynomials(&adj, 3);
        assert_eq!(basis.len(), 4);
        assert_eq!(basis[0], SparseMatrix::identity(3));
        assert_eq!(chebyshev_polynomials(&adj, 0).len(), 1);
    }

    #[test]
    fn largest_eigenvalue_of_identity() {
        let lambda = largest_eigenvalue(&SparseMatrix::identity(4));
        assert!((lambda - 1.0).abs() < 1e-4);
    }
}
