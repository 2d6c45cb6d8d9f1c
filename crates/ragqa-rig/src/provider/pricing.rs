//! Per-model token prices.

use ragqa_core::Cost;

use crate::TRACING_TARGET_PROVIDER;

/// Default embedding price in US dollars per million tokens.
pub const DEFAULT_EMBEDDING_PRICE_PER_MILLION: f64 = 0.02;

/// Models that reject a sampling temperature.
const FIXED_TEMPERATURE_PREFIXES: [&str; 3] = ["gpt-5-mini", "o1", "o3"];

/// Price of a generation model in US dollars per million tokens.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPrice {
    /// Price of input tokens.
    pub input: f64,
    /// Price of output tokens.
    pub output: f64,
}

impl ModelPrice {
    const fn new(input: f64, output: f64) -> Self {
        Self { input, output }
    }

    /// Returns the cost of a call.
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> Cost {
        Cost::per_million(input_tokens, self.input) + Cost::per_million(output_tokens, self.output)
    }
}

const MODEL_PRICES: &[(&str, ModelPrice)] = &[
    ("gpt-4.1", ModelPrice::new(5.00, 15.00)),
    ("gpt-4.1-mini", ModelPrice::new(0.40, 1.60)),
    ("gpt-4.1-nano", ModelPrice::new(0.10, 0.40)),
    ("gpt-4o", ModelPrice::new(5.00, 15.00)),
    ("gpt-4o-mini", ModelPrice::new(0.15, 0.60)),
];

/// Looks up the price of a model.
///
/// Dated snapshots (`gpt-4o-2024-08-06`) resolve to the longest listed
/// model name they extend.
pub fn model_price(model: &str) -> Option<ModelPrice> {
    MODEL_PRICES
        .iter()
        .filter(|(name, _)| {
            model == *name
                || model
                    .strip_prefix(name)
                    .is_some_and(|rest| rest.starts_with('-'))
        })
        .max_by_key(|(name, _)| name.len())
        .map(|(_, price)| *price)
}

/// Returns the cost of a generation call, or zero for unpriced models.
pub fn generation_cost(model: &str, input_tokens: u64, output_tokens: u64) -> Cost {
    match model_price(model) {
        Some(price) => price.cost(input_tokens, output_tokens),
        None => {
            tracing::warn!(
                target: TRACING_TARGET_PROVIDER,
                model,
                "No price listed for model, reporting zero cost"
            );
            Cost::ZERO
        }
    }
}

/// Returns false for models that only accept their default temperature.
pub fn supports_temperature(model: &str) -> bool {
    !FIXED_TEMPERATURE_PREFIXES
        .iter()
        .any(|prefix| model.starts_with(prefix))
}
