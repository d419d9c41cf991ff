// src/core/cost.rs — Token cost tracking

use std::collections::HashMap;

use serde::Serialize;

use crate::provider::TokenUsage;

/// Running token counts and spend per model, with a per-phase breakdown.
#[derive(Debug, Default, Clone)]
pub struct CostTracker {
    pub total_usd: f64,
    pub by_model: HashMap<String, f64>,
    pub by_phase: HashMap<String, f64>,
    /// Token counts per model (input, output).
    pub tokens_by_model: HashMap<String, (u64, u64)>,
    /// Number of API calls per model.
    pub calls_by_model: HashMap<String, u64>,
}

impl CostTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, model: &str, usage: &TokenUsage) {
        let cost = calculate_cost(model, usage);
        self.total_usd += cost;
        *self.by_model.entry(model.into()).or_default() += cost;
        let tokens = self.tokens_by_model.entry(model.into()).or_insert((0, 0));
        tokens.0 += usage.input_tokens as u64;
        tokens.1 += usage.output_tokens as u64;
        *self.calls_by_model.entry(model.into()).or_default() += 1;
    }

    pub fn record_with_phase(&mut self, model: &str, usage: &TokenUsage, phase: &str) {
        self.record(model, usage);
        *self.by_phase.entry(phase.into()).or_default() += calculate_cost(model, usage);
    }

    /// Current spend estimate recomputed from the raw token counts and the
    /// price table.
    pub fn estimate(&self) -> f64 {
        self.tokens_by_model
            .iter()
            .filter_map(|(model, (input, output))| {
                model_pricing(model).map(|(pin, pout)| {
                    (*input as f64 / 1_000_000.0) * pin + (*output as f64 / 1_000_000.0) * pout
                })
            })
            .sum()
    }

    /// Total tokens used (input + output across all models).
    pub fn total_tokens(&self) -> u64 {
        self.tokens_by_model.values().map(|(i, o)| i + o).sum()
    }

    /// Total API calls across all models.
    pub fn total_calls(&self) -> u64 {
        self.calls_by_model.values().sum()
    }

    pub fn summary(&self) -> String {
        format!(
            "${:.6} total ({} calls, {} tokens, {} models)",
            self.total_usd,
            self.total_calls(),
            self.total_tokens(),
            self.by_model.len()
        )
    }

    /// Cost per phase as a vec of (phase, cost_usd), most expensive first.
    pub fn phase_breakdown(&self) -> Vec<(String, f64)> {
        let mut phases: Vec<_> = self.by_phase.iter().map(|(k, v)| (k.clone(), *v)).collect();
        phases.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        phases
    }

    /// Per-model breakdown, most expensive first.
    pub fn model_breakdown(&self) -> Vec<ModelCostEntry> {
        let mut entries: Vec<_> = self
            .tokens_by_model
            .iter()
            .map(|(model, (input, output))| ModelCostEntry {
                model: model.clone(),
                cost_usd: self.by_model.get(model).copied().unwrap_or(0.0),
                calls: self.calls_by_model.get(model).copied().unwrap_or(0),
                input_tokens: *input,
                output_tokens: *output,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.cost_usd
                .partial_cmp(&a.cost_usd)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.model.cmp(&b.model))
        });
        entries
    }

    /// Full cost analytics report.
    pub fn analytics_report(&self) -> String {
        let mut report = String::new();
        report.push_str("═══ Cost Analytics ═══\n");
        report.push_str(&format!("Total: ${:.6}\n", self.total_usd));
        report.push_str(&format!("Total tokens: {}\n", self.total_tokens()));
        report.push_str(&format!("Total API calls: {}\n", self.total_calls()));

        if !self.tokens_by_model.is_empty() {
            report.push_str("\nBy Model:\n");
            for entry in self.model_breakdown() {
                let priced = if model_pricing(&entry.model).is_some() {
                    ""
                } else {
                    " [unpriced]"
                };
                report.push_str(&format!(
                    "  {}: ${:.6} ({} calls, {}in/{}out tokens){}\n",
                    entry.model,
                    entry.cost_usd,
                    entry.calls,
                    entry.input_tokens,
                    entry.output_tokens,
                    priced,
                ));
            }
        }

        if !self.by_phase.is_empty() {
            report.push_str("\nBy Phase:\n");
            for (phase, cost) in self.phase_breakdown() {
                let pct = if self.total_usd > 0.0 {
                    cost / self.total_usd * 100.0
                } else {
                    0.0
                };
                report.push_str(&format!("  {}: ${:.6} ({:.1}%)\n", phase, cost, pct));
            }
        }

        report
    }
}

/// Per-model cost breakdown entry.
#[derive(Debug, Clone, Serialize)]
pub struct ModelCostEntry {
    pub model: String,
    pub cost_usd: f64,
    pub calls: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// Calculate cost in USD for a given model and token usage.
pub fn calculate_cost(model: &str, usage: &TokenUsage) -> f64 {
    let Some((input_price, output_price)) = model_pricing(model) else {
        return 0.0;
    };
    (usage.input_tokens as f64 / 1_000_000.0) * input_price
        + (usage.output_tokens as f64 / 1_000_000.0) * output_price
}

/// Returns (input_price_per_mtok, output_price_per_mtok) for a cost key, or
/// `None` when the model is not in the price table.
pub fn model_pricing(model: &str) -> Option<(f64, f64)> {
    let prices = match model {
        "gpt-4o" => (2.50, 10.00),
        "gpt-4o-mini" => (0.150, 0.60),
        "o1-preview" => (15.00, 60.00),
        "o1-mini" => (3.00, 12.00),
        "o1" => (15.00, 60.00),
        "claude-3-5-sonnet" => (3.00, 12.00),
        "deepseek-chat" => (1.00, 5.00),
        _ => return None,
    };
    Some(prices)
}
