//! Sparse system assembly and linear solve.
//!
//! Blocks stamp their local contributions into five coefficient matrices
//! (F, E, dE, dF, dC) and the source vector c. New coordinates may be
//! inserted on the first assembly pass only; afterwards the union pattern
//! is frozen, the LU factorization is analyzed symbolically exactly once,
//! and every Newton iteration merely refactorizes numerically.

use std::collections::HashMap;

use faer::linalg::solvers::Solve;
use faer::sparse::linalg::solvers::{Lu, SymbolicLu};
use faer::sparse::{SparseColMat, SymbolicSparseColMat};
use faer::Mat;
use nalgebra::DVector;

use crate::error::LinearSolveError;

/// Expected nonzero counts per matrix, used to size allocations.
///
/// `d` covers the three solution-gradient matrices combined
/// (|dE| + |dF| + |dC|).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TripletCounts {
    pub f: usize,
    pub e: usize,
    pub d: usize,
}

impl TripletCounts {
    pub fn new(f: usize, e: usize, d: usize) -> Self {
        Self { f, e, d }
    }

    /// Component-wise sum, for accumulating per-block counts.
    pub fn add(&mut self, other: TripletCounts) {
        self.f += other.f;
        self.e += other.e;
        self.d += other.d;
    }
}

/// One stamped coefficient matrix.
///
/// Coordinates are discovered during assembly; values are overwritten in
/// place on every later pass. Insertion order is preserved so value slots
/// stay stable across passes.
#[derive(Debug, Default)]
struct StampMatrix {
    coords: Vec<(usize, usize)>,
    slots: HashMap<(usize, usize), usize>,
    values: Vec<f64>,
}

impl StampMatrix {
    fn reserve(&mut self, nnz: usize) {
        self.coords.reserve(nnz);
        self.values.reserve(nnz);
        self.slots.reserve(nnz);
    }

    /// Write a coefficient, creating its slot on first touch.
    fn set(&mut self, row: usize, col: usize, value: f64) -> bool {
        match self.slots.get(&(row, col)) {
            Some(&slot) => {
                self.values[slot] = value;
                false
            }
            None => {
                let slot = self.coords.len();
                self.coords.push((row, col));
                self.values.push(value);
                self.slots.insert((row, col), slot);
                true
            }
        }
    }

    fn get(&self, row: usize, col: usize) -> f64 {
        self.slots
            .get(&(row, col))
            .map_or(0.0, |&slot| self.values[slot])
    }

    fn nnz(&self) -> usize {
        self.coords.len()
    }

    /// acc += M · x
    fn mul_add(&self, x: &DVector<f64>, acc: &mut DVector<f64>) {
        for (slot, &(row, col)) in self.coords.iter().enumerate() {
            acc[row] += self.values[slot] * x[col];
        }
    }
}

/// Which of the five stamped matrices a write targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatrixKind {
    F,
    E,
    DE,
    DF,
    DC,
}

/// Frozen Jacobian pattern with the one-time symbolic LU analysis.
struct JacobianCache {
    /// CSC layout of the union pattern F ∪ E ∪ dE ∪ dF ∪ dC
    symbolic: SymbolicSparseColMat<usize>,
    /// Entry coordinates sorted by (col, row), matching the CSC value order
    entries: Vec<(usize, usize)>,
    values: Vec<f64>,
    /// Slot → CSC position, one map per source matrix
    scatter: [Vec<usize>; 5],
    lu_symbolic: SymbolicLu<usize>,
    /// Total stamped slots when this cache was built
    stamped_slots: usize,
}

/// The global DAE system E·ẏ + F·y + c = 0 in stamped sparse form.
pub struct SparseSystem {
    n: usize,
    f: StampMatrix,
    e: StampMatrix,
    de: StampMatrix,
    df: StampMatrix,
    dc: StampMatrix,
    /// Source vector c
    pub c: DVector<f64>,
    /// Residual −(E·ẏ + F·y + c)
    pub residual: DVector<f64>,
    /// Newton increment from the last solve
    pub dy: DVector<f64>,
    cache: Option<JacobianCache>,
}

impl SparseSystem {
    /// Create an empty N×N system.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            f: StampMatrix::default(),
            e: StampMatrix::default(),
            de: StampMatrix::default(),
            df: StampMatrix::default(),
            dc: StampMatrix::default(),
            c: DVector::zeros(n),
            residual: DVector::zeros(n),
            dy: DVector::zeros(n),
            cache: None,
        }
    }

    /// System dimension.
    pub fn len(&self) -> usize {
        self.n
    }

    /// Whether the system is empty.
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    /// Pre-size the stamp storage from the model's triplet counts.
    pub fn reserve(&mut self, counts: TripletCounts) {
        self.f.reserve(counts.f);
        self.e.reserve(counts.e);
        self.de.reserve(counts.d);
        self.df.reserve(counts.d);
        self.dc.reserve(counts.d);
    }

    /// Stamp a coefficient into one of the five matrices.
    pub fn set(&mut self, kind: MatrixKind, row: usize, col: usize, value: f64) {
        debug_assert!(row < self.n && col < self.n, "stamp outside system");
        let inserted = self.matrix_mut(kind).set(row, col, value);
        if inserted {
            // New coordinate: any frozen pattern is stale.
            self.cache = None;
        }
    }

    /// Write an entry of the source vector c.
    pub fn set_c(&mut self, row: usize, value: f64) {
        self.c[row] = value;
    }

    /// Read back a stamped coefficient (test and output support).
    pub fn coeff(&self, kind: MatrixKind, row: usize, col: usize) -> f64 {
        self.matrix(kind).get(row, col)
    }

    /// Stamped nonzero count of one matrix.
    pub fn nnz(&self, kind: MatrixKind) -> usize {
        self.matrix(kind).nnz()
    }

    fn matrix(&self, kind: MatrixKind) -> &StampMatrix {
        match kind {
            MatrixKind::F => &self.f,
            MatrixKind::E => &self.e,
            MatrixKind::DE => &self.de,
            MatrixKind::DF => &self.df,
            MatrixKind::DC => &self.dc,
        }
    }

    fn matrix_mut(&mut self, kind: MatrixKind) -> &mut StampMatrix {
        match kind {
            MatrixKind::F => &mut self.f,
            MatrixKind::E => &mut self.e,
            MatrixKind::DE => &mut self.de,
            MatrixKind::DF => &mut self.df,
            MatrixKind::DC => &mut self.dc,
        }
    }

    fn stamped_slots(&self) -> usize {
        self.f.nnz() + self.e.nnz() + self.de.nnz() + self.df.nnz() + self.dc.nnz()
    }

    /// residual = −(E·ẏ + F·y + c)
    pub fn update_residual(&mut self, y: &DVector<f64>, ydot: &DVector<f64>) {
        self.residual.copy_from(&self.c);
        self.e.mul_add(ydot, &mut self.residual);
        self.f.mul_add(y, &mut self.residual);
        self.residual.neg_mut();
    }

    /// jacobian = F + dE + dF + dC + E · e_coeff
    ///
    /// `e_coeff = α_m / (α_f · γ · Δt)` is supplied by the integrator.
    pub fn update_jacobian(&mut self, e_coeff: f64) -> Result<(), LinearSolveError> {
        let stale = self
            .cache
            .as_ref()
            .is_none_or(|cache| cache.stamped_slots != self.stamped_slots());
        if stale {
            self.build_cache()?;
        }
        let cache = self.cache.as_mut().expect("cache built above");

        cache.values.fill(0.0);
        let sources = [
            (&self.f, 1.0),
            (&self.e, e_coeff),
            (&self.de, e_coeff),
            (&self.df, 1.0),
            (&self.dc, 1.0),
        ];
        for (k, (matrix, coeff)) in sources.into_iter().enumerate() {
            for (slot, &pos) in cache.scatter[k].iter().enumerate() {
                cache.values[pos] += coeff * matrix.values[slot];
            }
        }
        Ok(())
    }

    /// Solve jacobian · dy = residual via sparse LU.
    ///
    /// The symbolic analysis is reused from the frozen pattern; only the
    /// numeric factorization is redone per call.
    pub fn solve(&mut self) -> Result<(), LinearSolveError> {
        let cache = self
            .cache
            .as_ref()
            .ok_or(LinearSolveError::Factorization)?;

        let jacobian = SparseColMat::new(cache.symbolic.clone(), cache.values.clone());
        let lu = Lu::try_new_with_symbolic(cache.lu_symbolic.clone(), jacobian.as_ref())
            .map_err(|_| LinearSolveError::Factorization)?;

        let mut rhs = Mat::<f64>::from_fn(self.n, 1, |i, _| self.residual[i]);
        lu.solve_in_place(rhs.as_mut());

        for i in 0..self.n {
            self.dy[i] = rhs[(i, 0)];
        }
        if self.dy.iter().any(|v| !v.is_finite()) {
            return Err(LinearSolveError::NonFinite);
        }
        Ok(())
    }

    /// Freeze the union pattern and run the one-time symbolic analysis.
    fn build_cache(&mut self) -> Result<(), LinearSolveError> {
        let mut entries: Vec<(usize, usize)> = Vec::with_capacity(self.stamped_slots());
        for matrix in [&self.f, &self.e, &self.de, &self.df, &self.dc] {
            entries.extend_from_slice(&matrix.coords);
        }
        entries.sort_unstable_by_key(|&(row, col)| (col, row));
        entries.dedup();

        let mut col_ptr = vec![0usize; self.n + 1];
        for &(_, col) in &entries {
            col_ptr[col + 1] += 1;
        }
        for j in 0..self.n {
            col_ptr[j + 1] += col_ptr[j];
        }
        let row_idx: Vec<usize> = entries.iter().map(|&(row, _)| row).collect();

        let symbolic = SymbolicSparseColMat::new_checked(self.n, self.n, col_ptr, None, row_idx);
        let lu_symbolic = SymbolicLu::try_new(symbolic.as_ref())
            .map_err(|_| LinearSolveError::Factorization)?;

        let position = |row: usize, col: usize| -> usize {
            entries
                .binary_search_by(|&(er, ec)| (ec, er).cmp(&(col, row)))
                .expect("every stamped coordinate is in the union pattern")
        };
        let scatter: [Vec<usize>; 5] = [&self.f, &self.e, &self.de, &self.df, &self.dc].map(|matrix| {
            matrix
                .coords
                .iter()
                .map(|&(row, col)| position(row, col))
                .collect()
        });

        log::debug!(
            "froze Jacobian pattern: {} unknowns, {} nonzeros",
            self.n,
            entries.len()
        );

        let values = vec![0.0; entries.len()];
        self.cache = Some(JacobianCache {
            symbolic,
            entries,
            values,
            scatter,
            lu_symbolic,
            stamped_slots: self.stamped_slots(),
        });
        Ok(())
    }

    /// Dense copy of the assembled Jacobian (test support).
    #[doc(hidden)]
    pub fn jacobian_dense(&self) -> Option<Vec<Vec<f64>>> {
        let cache = self.cache.as_ref()?;
        let mut dense = vec![vec![0.0; self.n]; self.n];
        for (pos, &(row, col)) in cache.entries.iter().enumerate() {
            dense[row][col] = cache.values[pos];
        }
        Some(dense)
    }
}
