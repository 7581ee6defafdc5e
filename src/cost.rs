//! Token cost attribution
//!
//! Every model call produces a [`CostRecord`] priced in the display
//! currency; a session's [`CostLedger`] accumulates them.

mod fx;
mod ledger;

#[allow(unused_imports)] // Public API re-exports
pub use fx::{
    ExchangeRateSource, FixedRate, FrankfurterRates, FxError, FxRates, DEFAULT_CURRENCY,
    DEFAULT_FALLBACK_RATE, DEFAULT_FX_URL,
};
pub use ledger::{CostLedger, CostRecord};
