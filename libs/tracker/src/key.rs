use std::fmt;

/// Quote marker for the synthetic network-fee entity.
pub const NETWORK_FEE: &str = "network-fee";

const GAS_ASSET: &str = "GWEI";

/// Identifies one tracked entity: an asset quoted in a currency, or the
/// network-fee marker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    pub asset: String,
    pub quote: String,
}

impl EntityKey {
    pub fn spot(asset: impl Into<String>, quote: impl Into<String>) -> Self {
        Self {
            asset: asset.into().trim().to_uppercase(),
            quote: quote.into().trim().to_uppercase(),
        }
    }

    pub fn network_fee() -> Self {
        Self {
            asset: GAS_ASSET.to_string(),
            quote: NETWORK_FEE.to_string(),
        }
    }

    pub fn is_network_fee(&self) -> bool {
        self.quote == NETWORK_FEE
    }

    /// Ticker symbol of a spot entity, e.g. `BTCUSDT`.
    ///
    /// `None` for the network fee: it is read from the gas oracle, which takes
    /// no symbol.
    pub fn symbol(&self) -> Option<String> {
        (!self.is_network_fee()).then(|| format!("{}{}", self.asset, self.quote))
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.asset, self.quote)
    }
}

/// Opaque handle of an external display slot (a voice channel id on Discord).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub u64);

impl SlotId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
