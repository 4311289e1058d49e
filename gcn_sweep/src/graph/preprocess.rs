use crate::graph::error::SweepError;
use crate::graph::sparse::{
    alternate_normalize, chebyshev_polynomials, renormalized_adj, row_normalize, SparseMatrix,
};
use std::fmt;
use std::str::FromStr;

/// Which trainable architecture a variant instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelKind {
    Gcn,
    Mlp,
}

/// The model flag's value. Parsing rejects anything outside the fixed
/// dispatch table before any model is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelVariant {
    Gcn,
    GcnCheby,
    Dense,
    GcnTest1,
    GcnTest2,
    GcnTest3,
}

pub const ALL_VARIANTS: [ModelVariant; 6] = [
    ModelVariant::Gcn,
    ModelVariant::GcnCheby,
    ModelVariant::Dense,
    ModelVariant::GcnTest1,
    ModelVariant::GcnTest2,
    ModelVariant::GcnTest3,
];

impl FromStr for ModelVariant {
    type Err = SweepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gcn" => Ok(Self::Gcn),
            "gcn_cheby" => Ok(Self::GcnCheby),
            "dense" => Ok(Self::Dense),
            "gcn_test1" => Ok(Self::GcnTest1),
            "gcn_test2" => Ok(Self::GcnTest2),
            "gcn_test3" => Ok(Self::GcnTest3),
            other => Err(SweepError::InvalidModelVariant(other.to_string())),
        }
    }
}

impl fmt::Display for ModelVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Gcn => "gcn",
            Self::GcnCheby => "gcn_cheby",
            Self::Dense => "dense",
            Self::GcnTest1 => "gcn_test1",
            Self::GcnTest2 => "gcn_test2",
            Self::GcnTest3 => "gcn_test3",
        })
    }
}

impl ModelVariant {
    pub fn model_kind(self) -> ModelKind {
        match self {
            Self::Dense => ModelKind::Mlp,
            _ => ModelKind::Gcn,
        }
    }

    pub fn num_supports(self, max_degree: usize) -> usize {
        match self {
            Self::GcnCheby => 1 + max_degree,
            _ => 1,
        }
    }
}

/// Derives the support list for a variant from the raw adjacency matrix.
/// The `dense` variant still gets the renormalized adjacency even though
/// the MLP never reads it.
pub fn build_supports(
    variant: ModelVariant,
    adj: &SparseMatrix,
    max_degree: usize,
) -> Vec<SparseMatrix> {
    match variant {
        ModelVariant::Gcn | ModelVariant::Dense => vec![renormalized_adj(adj)],
        ModelVariant::GcnCheby => chebyshev_polynomials(adj, max_degree),
        ModelVariant::GcnTest1 => vec![row_normalize(adj)],
        ModelVariant::GcnTest2 => vec![alternate_normalize(adj, 1.0)],
        ModelVariant::GcnTest3 => vec![alternate_normalize(adj, -1.0)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square_graph() -> SparseMatrix {
        SparseMatrix::from_triplets(
            4,
            4,
            vec![
                (0, 1, 1.0),
                (1, 0, 1.0),
                (1, 2, 1.0),
                (2, 1, 1.0),
                (2, 3, 1.0),
                (3, 2, 1.0),
                (3, 0, 1.0),
                (0, 3, 1.0),
            ],
        )
    }

    #[test]
    fn support_count_matches_variant() {
        let adj = square_graph();
        let max_degree = 3;
        for variant in ALL_VARIANTS {
            let supports = build_supports(variant, &adj, max_degree);
            assert_eq!(
                supports.len(),
                variant.num_supports(max_degree),
                "variant {variant}"
            );
        }
    }

    #[test]
    fn variant_strings_round_trip() {
        for variant in ALL_VARIANTS {
            assert_eq!(variant.to_string().parse::<ModelVariant>().unwrap(), variant);
        }
    }

    #[test]
    fn unknown_variant_carries_offending_string() {
        let err = "gcn_test4".parse::<ModelVariant>().unwrap_err();
        assert!(matches!(
            err,
            SweepError::InvalidModelVariant(s) if s == "gcn_test4"
        ));
    }

    #[test]
    fn dense_maps_to_mlp_everything_else_to_gcn() {
        assert_eq!(ModelVariant::Dense.model_kind(), ModelKind::Mlp);
        for variant in ALL_VARIANTS {
            if variant != ModelVariant::Dense {
                assert_eq!(variant.model_kind(), ModelKind::Gcn);
            }
        }
    }
}
