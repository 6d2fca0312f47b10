//! Reduced susceptance matrix (B') of the linearised network.
//!
//! ```text
//! B'[i,j] = -b_ij          for i ≠ j
//! B'[i,i] = Σ_k b_ik
//! ```
//!
//! One reference node per synchronous component is removed, which makes the
//! matrix invertible when every component is connected.

use sprs::{CsMat, TriMat};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SusceptanceError {
    #[error("no connection node to compute")]
    NoNodes,

    #[error("link {0} has zero or near-zero reactance")]
    ZeroReactance(String),

    #[error("link {link} references node index {node} outside the model")]
    UnknownNode { link: String, node: usize },
}

/// Edge of the DC model: an AC branch or an emulating HVDC link.
#[derive(Debug, Clone)]
pub struct Coupling {
    pub id: String,
    pub from: usize,
    pub to: usize,
    /// Per-unit susceptance
    pub b: f64,
}

#[derive(Debug, Clone)]
pub struct SusceptanceMatrix {
    matrix: CsMat<f64>,
    /// reduced index -> model node index
    order: Vec<usize>,
    /// model node index -> reduced index (None for reference nodes)
    node_to_reduced: Vec<Option<usize>>,
}

impl SusceptanceMatrix {
    pub fn assemble(
        n_nodes: usize,
        couplings: &[Coupling],
        references: &[usize],
    ) -> Result<Self, SusceptanceError> {
        if n_nodes == 0 {
            return Err(SusceptanceError::NoNodes);
        }

        let mut node_to_reduced = vec![None; n_nodes];
        let mut order = Vec::with_capacity(n_nodes);
        for (node, slot) in node_to_reduced.iter_mut().enumerate() {
            if !references.contains(&node) {
                *slot = Some(order.len());
                order.push(node);
            }
        }

        let n = order.len();
        let mut triplets = TriMat::new((n, n));
        for c in couplings {
            if c.from >= n_nodes || c.to >= n_nodes {
                return Err(SusceptanceError::UnknownNode {
                    link: c.id.clone(),
                    node: c.from.max(c.to),
                });
            }
            if !c.b.is_finite() {
                return Err(SusceptanceError::ZeroReactance(c.id.clone()));
            }
            let (i, j) = (node_to_reduced[c.from], node_to_reduced[c.to]);
            if let Some(i) = i {
                triplets.add_triplet(i, i, c.b);
            }
            if let Some(j) = j {
                triplets.add_triplet(j, j, c.b);
            }
            if let (Some(i), Some(j)) = (i, j) {
                triplets.add_triplet(i, j, -c.b);
                triplets.add_triplet(j, i, -c.b);
            }
        }

        Ok(Self {
            matrix: triplets.to_csr(),
            order,
            node_to_reduced,
        })
    }

    pub fn dim(&self) -> usize {
        self.order.len()
    }

    pub fn nnz(&self) -> usize {
        self.matrix.nnz()
    }

    pub fn reduced_index(&self, node: usize) -> Option<usize> {
        self.node_to_reduced.get(node).copied().flatten()
    }

    pub fn node_of(&self, reduced: usize) -> Option<usize> {
        self.order.get(reduced).copied()
    }

    /// Dense copy for the linear backends (duplicate triplets are already summed).
    pub fn to_dense(&self) -> Vec<Vec<f64>> {
        let n = self.dim();
        let mut dense = vec![vec![0.0; n]; n];
        for (value, (row, col)) in self.matrix.iter() {
            dense[row][col] += *value;
        }
        dense
    }
}
