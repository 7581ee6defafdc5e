//! Cost records and the per-session running total

use crate::llm::{Pricing, Usage};
use serde::Serialize;

const TOKENS_PER_PRICE_UNIT: f64 = 1_000_000.0;

/// Monetary cost of one model invocation
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct CostRecord {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
}

impl CostRecord {
    /// Price `usage` at USD `pricing`, converted with `fx_rate`
    #[allow(clippy::cast_precision_loss)] // token counts stay far below 2^52
    pub fn compute(usage: Usage, pricing: Pricing, fx_rate: f64) -> Self {
        let input_cost =
            usage.input_tokens as f64 / TOKENS_PER_PRICE_UNIT * pricing.input_per_million * fx_rate;
        let output_cost = usage.output_tokens as f64 / TOKENS_PER_PRICE_UNIT
            * pricing.output_per_million
            * fx_rate;

        Self {
            input_tokens: usage.input_tokens,
            output_tokens: usage.output_tokens,
            input_cost,
            output_cost,
            total_cost: input_cost + output_cost,
        }
    }
}

/// Running spend for one session; only ever grows
#[derive(Debug, Clone, Default)]
pub struct CostLedger {
    total_spent: f64,
    calls: u32,
}

impl CostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Negative costs cannot arise from `compute`, but a
    /// misconfigured rate must not make the total go backwards.
    pub fn record(&mut self, record: &CostRecord) {
        if record.total_cost.is_finite() && record.total_cost > 0.0 {
            self.total_spent += record.total_cost;
        }
        self.calls += 1;
    }

    pub fn total_spent(&self) -> f64 {
        self.total_spent
    }

    pub fn calls(&self) -> u32 {
        self.calls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const FLASH: Pricing = Pricing {
        input_per_million: 0.30,
        output_per_million: 2.50,
    };

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    #[test]
    fn test_compute_matches_formula() {
        let record = CostRecord::compute(Usage::new(1_000_000, 200_000), FLASH, 88.0);
        assert!(close(record.input_cost, 0.30 * 88.0));
        assert!(close(record.output_cost, 0.2 * 2.50 * 88.0));
        assert!(close(record.total_cost, record.input_cost + record.output_cost));
        assert_eq!(record.input_tokens, 1_000_000);
    }

    #[test]
    fn test_zero_usage_costs_nothing() {
        let record = CostRecord::compute(Usage::default(), FLASH, 88.0);
        assert!(close(record.total_cost, 0.0));
    }

    #[test]
    fn test_ledger_ignores_negative_and_nan() {
        let mut ledger = CostLedger::new();
        ledger.record(&CostRecord {
            total_cost: -1.0,
            ..Default::default()
        });
        ledger.record(&CostRecord {
            total_cost: f64::NAN,
            ..Default::default()
        });
        assert!(close(ledger.total_spent(), 0.0));
        assert_eq!(ledger.calls(), 2);
    }

    proptest! {
        #[test]
        fn prop_total_is_sum_and_monotonic(
            calls in proptest::collection::vec((0u64..2_000_000, 0u64..500_000), 1..30),
            rate in 0.5f64..120.0,
        ) {
            let mut ledger = CostLedger::new();
            let mut expected = 0.0;
            let mut previous = 0.0;
            for (input, output) in calls {
                let record = CostRecord::compute(Usage::new(input, output), FLASH, rate);
                expected += record.total_cost;
                ledger.record(&record);
                prop_assert!(ledger.total_spent() >= previous);
                previous = ledger.total_spent();
            }
            prop_assert!(close(ledger.total_spent(), expected));
        }
    }
}
