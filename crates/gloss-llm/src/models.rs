//! Model registry: aliases, provider ids, generation defaults, and the
//! static per-token rate table used for cost accounting.

use gloss_domain::GenerationArgs;

/// One registered model
#[derive(Debug, Clone)]
pub struct ModelInfo {
    /// Short alias used throughout the pipeline and in cache keys
    pub alias: &'static str,
    /// Provider-side model identifier
    pub provider_id: &'static str,
    /// $ per 1M input tokens
    pub input_cost_per_mtok: f64,
    /// $ per 1M output tokens
    pub output_cost_per_mtok: f64,
}

/// The static model table. Rates are list prices per 1M tokens.
const MODELS: &[ModelInfo] = &[
    ModelInfo {
        alias: "gpt-4.1",
        provider_id: "gpt-4.1-2025-04-14",
        input_cost_per_mtok: 2.0,
        output_cost_per_mtok: 8.0,
    },
    ModelInfo {
        alias: "gpt-4o",
        provider_id: "gpt-4o",
        input_cost_per_mtok: 2.5,
        output_cost_per_mtok: 10.0,
    },
    ModelInfo {
        alias: "gpt-4o-mini",
        provider_id: "gpt-4o-mini",
        input_cost_per_mtok: 0.15,
        output_cost_per_mtok: 0.6,
    },
    ModelInfo {
        alias: "o3-mini",
        provider_id: "o3-mini",
        input_cost_per_mtok: 1.1,
        output_cost_per_mtok: 4.4,
    },
    ModelInfo {
        alias: "deepseek-chat",
        provider_id: "deepseek-chat",
        input_cost_per_mtok: 0.27,
        output_cost_per_mtok: 1.1,
    },
    ModelInfo {
        alias: "deepseek-reasoner",
        provider_id: "deepseek-reasoner",
        input_cost_per_mtok: 0.55,
        output_cost_per_mtok: 2.19,
    },
];

/// Look up a model by alias
pub fn resolve(alias: &str) -> Option<&'static ModelInfo> {
    MODELS.iter().find(|m| m.alias == alias)
}

/// Default generation arguments per model. Reasoning models run warmer and
/// longer; everything else is pinned for reproducibility.
pub fn default_args(alias: &str) -> GenerationArgs {
    match alias {
        "deepseek-reasoner" => GenerationArgs {
            temperature: Some(0.6),
            max_tokens: Some(8192),
            seed: None,
            top_p: None,
        },
        "o3-mini" => GenerationArgs {
            temperature: None,
            max_tokens: Some(8192),
            seed: Some(42),
            top_p: None,
        },
        _ => GenerationArgs {
            temperature: Some(0.0),
            max_tokens: Some(4096),
            seed: Some(42),
            top_p: None,
        },
    }
}

/// Price of a call mix in dollars: tokens x per-model rate
pub fn price(info: &ModelInfo, input_tokens: u64, output_tokens: u64) -> f64 {
    let input = input_tokens as f64 / 1_000_000.0 * info.input_cost_per_mtok;
    let output = output_tokens as f64 / 1_000_000.0 * info.output_cost_per_mtok;
    input + output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_known_alias() {
        let info = resolve("gpt-4.1").unwrap();
        assert_eq!(info.provider_id, "gpt-4.1-2025-04-14");
    }

    #[test]
    fn test_resolve_unknown_alias() {
        assert!(resolve("no-such-model").is_none());
    }

    #[test]
    fn test_price_sums_both_directions() {
        let info = resolve("gpt-4.1").unwrap();
        // 1M input at $2 + 0.5M output at $8
        let cost = price(info, 1_000_000, 500_000);
        assert!((cost - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_default_args_pinned_for_standard_models() {
        let args = default_args("gpt-4.1");
        assert_eq!(args.temperature, Some(0.0));
        assert_eq!(args.seed, Some(42));
    }

    #[test]
    fn test_default_args_reasoner() {
        let args = default_args("deepseek-reasoner");
        assert_eq!(args.temperature, Some(0.6));
        assert_eq!(args.max_tokens, Some(8192));
        assert_eq!(args.seed, None);
    }
}
