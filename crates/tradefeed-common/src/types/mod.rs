//! Trade data types shared across tradefeed

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// Column Names
// ============================================================================

/// Column holding the traded token's address.
pub const TOKEN_ADDRESS: &str = "token_address";

/// Column holding the trade price denominated in SOL.
pub const PRICE_IN_SOL: &str = "price_in_sol";

/// Column holding the block timestamp of the trade.
pub const BLOCK_TIME: &str = "block_time";

/// Placeholder used when a row carries no token address.
pub const UNKNOWN_TOKEN: &str = "UNKNOWN";

/// One line of a trade capture file, keyed by header column name.
pub type RawRow = HashMap<String, String>;

/// A normalized trade, ready to be published.
///
/// Every field is always populated; defaults are applied during
/// normalization. Fields are private so a record cannot be changed once
/// built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    token_address: String,
    price_in_sol: f64,
    block_time: String,
}

impl TradeRecord {
    /// Build a record. A non-finite price is stored as `0`, since JSON has
    /// no representation for NaN or infinity.
    pub fn new(
        token_address: impl Into<String>,
        price_in_sol: f64,
        block_time: impl Into<String>,
    ) -> Self {
        Self {
            token_address: token_address.into(),
            price_in_sol: if price_in_sol.is_finite() { price_in_sol } else { 0.0 },
            block_time: block_time.into(),
        }
    }

    pub fn token_address(&self) -> &str {
        &self.token_address
    }

    pub fn price_in_sol(&self) -> f64 {
        self.price_in_sol
    }

    pub fn block_time(&self) -> &str {
        &self.block_time
    }

    /// Encode as the JSON message body sent to the broker.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl std::fmt::Display for TradeRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{ token_address: {}, price_in_sol: {}, block_time: {} }}",
            self.token_address, self.price_in_sol, self.block_time
        )
    }
}
