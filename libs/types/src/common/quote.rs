//! Oracle quote conventions

use serde::{Deserialize, Serialize};

/// Direction of an oracle's answer relative to USD
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuoteKind {
    /// Answer is the USD price of one unit of the asset (CAD/USD feeds)
    UsdPerAsset,
    /// Answer is the amount of asset one USD buys
    AssetPerUsd,
    /// Asset is the numeraire itself; no oracle is consulted
    Pegged,
}

impl QuoteKind {
    pub const fn requires_oracle(self) -> bool {
        !matches!(self, Self::Pegged)
    }
}
