//! Model pricing table.

use serde::{Deserialize, Serialize};

/// Model id prefixes and their (input, output) USD price per 1M tokens.
/// More specific prefixes come first.
const PRICING_TABLE: &[(&str, f64, f64)] = &[
    ("gpt-4o-mini", 0.15, 0.60),
    ("gpt-4o", 2.50, 10.00),
    ("gpt-4-turbo", 10.00, 30.00),
    ("gpt-3.5-turbo", 0.50, 1.50),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub model: String,
    pub input_cost_per_1m: f64,
    pub output_cost_per_1m: f64,
    pub currency: String,
}

impl ModelPricing {
    pub fn new(model: &str, input: f64, output: f64) -> Self {
        Self {
            model: model.into(),
            input_cost_per_1m: input,
            output_cost_per_1m: output,
            currency: "USD".into(),
        }
    }

    /// Known pricing for `model`, matched case-insensitively by prefix.
    pub fn for_model(model: &str) -> Option<Self> {
        let m = model.to_lowercase();
        PRICING_TABLE
            .iter()
            .find(|(prefix, _, _)| m.starts_with(prefix))
            .map(|(_, input, output)| Self::new(model, *input, *output))
    }

    /// Known pricing for `model`, or the default tier (gpt-4o rates) for unrecognized ids.
    pub fn for_model_or_default(model: &str) -> Self {
        Self::for_model(model).unwrap_or_else(|| Self::default_tier(model))
    }

    pub fn default_tier(model: &str) -> Self {
        Self::new(model, 2.50, 10.00)
    }

    pub fn input_cost(&self, tokens: u64) -> f64 {
        tokens as f64 * self.input_cost_per_1m / 1_000_000.0
    }

    pub fn output_cost(&self, tokens: u64) -> f64 {
        tokens as f64 * self.output_cost_per_1m / 1_000_000.0
    }

    pub fn cost(&self, prompt_tokens: u64, completion_tokens: u64) -> f64 {
        self.input_cost(prompt_tokens) + self.output_cost(completion_tokens)
    }
}
