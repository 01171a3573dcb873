//! Tick Types
//!
//! Canonical representation of a real-time market tick. A tick is keyed by
//! its instrument token and carries at minimum a last-traded price; all
//! other vendor fields (depth, volume, OI, ...) are passed through verbatim.
//!
//! # Wire Format (JSON)
//! ```json
//! {
//!   "instrument_token": 256265,
//!   "last_price": 22150.5,
//!   "volume_traded": 1820450,
//!   "oi": 12843
//! }
//! ```

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Opaque positive integer identifying a tradable instrument.
///
/// Assigned by the upstream vendor; supplied by downstream consumers.
pub type InstrumentToken = u64;

/// One real-time price/quote update for a single instrument.
///
/// Transient - never persisted beyond the latest value per instrument.
/// `last_price` is optional: partial and derived packets arrive without it
/// and are still broadcast downstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    /// Instrument this update belongs to.
    pub instrument_token: InstrumentToken,

    /// Last-traded price, when present in the packet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_price: Option<Decimal>,

    /// Remaining vendor fields, passed through untouched.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Tick {
    /// Create a price-only tick.
    #[must_use]
    pub fn with_price(instrument_token: InstrumentToken, last_price: Decimal) -> Self {
        Self {
            instrument_token,
            last_price: Some(last_price),
            extra: serde_json::Map::new(),
        }
    }

    /// Whether this tick carries a last-traded price.
    #[must_use]
    pub const fn has_price(&self) -> bool {
        self.last_price.is_some()
    }
}

/// A batch of ticks delivered in one upstream frame.
pub type TickBatch = Vec<Tick>;

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn deserialize_price_tick() {
        let json = r#"{"instrument_token": 256265, "last_price": 22150.5}"#;
        let tick: Tick = serde_json::from_str(json).unwrap();

        assert_eq!(tick.instrument_token, 256265);
        assert_eq!(tick.last_price, Some(Decimal::from_str("22150.5").unwrap()));
        assert!(tick.has_price());
    }

    #[test]
    fn deserialize_priceless_tick() {
        let json = r#"{"instrument_token": 408065, "oi": 12843}"#;
        let tick: Tick = serde_json::from_str(json).unwrap();

        assert!(!tick.has_price());
        assert_eq!(tick.extra.get("oi").and_then(serde_json::Value::as_u64), Some(12843));
    }

    #[test]
    fn vendor_fields_survive_round_trip() {
        let json = r#"{"instrument_token":1,"last_price":10,"volume_traded":99,"depth":{"buy":[]}}"#;
        let tick: Tick = serde_json::from_str(json).unwrap();
        let out = serde_json::to_string(&tick).unwrap();

        let value: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(value["volume_traded"], 99);
        assert!(value["depth"]["buy"].is_array());
    }

    #[test]
    fn price_formats_as_decimal_string() {
        let tick = Tick::with_price(256265, Decimal::from_str("22150.5").unwrap());
        assert_eq!(tick.last_price.unwrap().to_string(), "22150.5");
    }
}
