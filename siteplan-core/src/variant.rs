//! Scoring strategy identifiers.
//!
//! # Examples
//! ```
//! use siteplan_core::ScoringVariant;
//!
//! assert_eq!(ScoringVariant::GraphSage.as_str(), "graphsage");
//! assert_eq!("gat".parse::<ScoringVariant>(), Ok(ScoringVariant::Gat));
//! ```

use crate::config::ConfigError;

/// Selects which node scorer produces the per-candidate scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ScoringVariant {
    /// Fixed convex combination of the scaled features.
    WeightedSum,
    /// Ridge regression followed by graph diffusion.
    #[default]
    RidgeDiffusion,
    /// Two-layer graph convolution.
    Gcn,
    /// Two-layer GraphSAGE with concatenated neighbour means.
    #[cfg_attr(feature = "serde", serde(rename = "graphsage"))]
    GraphSage,
    /// Two-layer graph attention.
    Gat,
}

impl ScoringVariant {
    /// Every variant in declaration order.
    pub const ALL: [Self; 5] = [
        Self::WeightedSum,
        Self::RidgeDiffusion,
        Self::Gcn,
        Self::GraphSage,
        Self::Gat,
    ];

    /// Return the variant identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::WeightedSum => "weighted_sum",
            Self::RidgeDiffusion => "ridge_diffusion",
            Self::Gcn => "gcn",
            Self::GraphSage => "graphsage",
            Self::Gat => "gat",
        }
    }

    /// Report whether the variant trains a message-passing network.
    #[must_use]
    pub const fn is_graph_network(&self) -> bool {
        matches!(self, Self::Gcn | Self::GraphSage | Self::Gat)
    }
}

impl std::fmt::Display for ScoringVariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ScoringVariant {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|variant| variant.as_str() == wanted)
            .ok_or_else(|| ConfigError::UnknownVariant(s.to_owned()))
    }
}
