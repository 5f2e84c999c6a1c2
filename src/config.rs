// Configuration module for reading Search.toml
// Every tunable of the engine, the rollout stand-ins and the match runner lives here

use crate::search::budget::Budget;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure containing all tunable parameters
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct Config {
    pub search: SearchConfig,
    pub budget: BudgetConfig,
    pub candidates: CandidateConfig,
    pub rollout: RolloutConfig,
    pub evaluation: EvaluationConfig,
    pub match_play: MatchConfig,
    pub debug: DebugConfig,
    pub profiling: ProfilingConfig,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SearchVariant {
    /// Mutate a single incumbent, keep it only when a challenger scores better
    HillClimb,
    /// Fixed population of joint actions scored round robin
    Table,
}

/// Local-search parameters
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct SearchConfig {
    pub variant: SearchVariant,
    /// Probability that each agent's choice is redrawn in a challenger
    pub mutation_rate: f64,
    /// Pick the best mean over the whole table instead of the final incumbent
    pub select_from_table: bool,
    pub max_population: usize,
    /// Rollouts evaluated per step; values above 1 run on the rayon pool
    pub batch_size: usize,
    /// Fixed engine seed; a random one is drawn when absent
    pub seed: Option<u64>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BudgetKind {
    Time,
    Iterations,
}

/// Per-decision budget
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct BudgetConfig {
    pub kind: BudgetKind,
    pub millis: u64,
    pub count: u64,
}

impl BudgetConfig {
    pub fn to_budget(&self) -> Budget {
        match self.kind {
            BudgetKind::Time => Budget::Time(Duration::from_millis(self.millis)),
            BudgetKind::Iterations => Budget::Iterations(self.count),
        }
    }
}

/// Candidate generation rules
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct CandidateConfig {
    /// No further workers are trained once a side owns this many
    pub max_workers: usize,
    /// Workers closer than this to a resource field or stockpile do not build
    pub build_clearance: i32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyKind {
    RandomBiased,
    Passive,
}

/// Rollout simulation parameters
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct RolloutConfig {
    pub lookahead_ticks: u32,
    pub discount: f64,
    pub discount_period_ticks: f64,
    /// Keep executing the evaluated joint action's intents during playout
    pub follow_intents: bool,
    pub own_policy: PolicyKind,
    pub opponent_policy: PolicyKind,
    /// Weight of attack, harvest and return actions in the random policy
    pub bias: u32,
    pub wait_ticks: u32,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationKind {
    SimpleSqrt,
    Economy,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct EvaluationConfig {
    pub kind: EvaluationKind,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OpponentKind {
    Engine,
    RandomBiased,
    Passive,
}

/// Match runner settings
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct MatchConfig {
    pub map: String,
    pub max_ticks: u32,
    pub starting_currency: i32,
    pub resource_amount: i32,
    pub opponent: OpponentKind,
}

/// Debug configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct DebugConfig {
    pub enabled: bool,
    pub log_file_path: String,
}

/// Performance profiling configuration
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct ProfilingConfig {
    pub enabled: bool,
    pub log_to_stderr: bool,
}

impl Config {
    /// Loads configuration from a TOML file
    ///
    /// # Arguments
    /// * `path` - Path to the Search.toml configuration file
    ///
    /// # Returns
    /// * `Result<Config, String>` - Parsed configuration or error message
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        let contents = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        Self::from_toml_str(&contents)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, String> {
        toml::from_str(contents).map_err(|e| format!("Failed to parse config file: {}", e))
    }

    /// Loads default configuration from Search.toml in the project root
    pub fn load_default() -> Result<Self, String> {
        Self::from_file("Search.toml")
    }

    /// Creates a configuration with hardcoded default values as fallback
    /// This should match the constants defined in Search.toml
    pub fn default_hardcoded() -> Self {
        Config {
            search: SearchConfig {
                variant: SearchVariant::HillClimb,
                mutation_rate: 0.2,
                select_from_table: false,
                max_population: 100,
                batch_size: 1,
                seed: None,
            },
            budget: BudgetConfig {
                kind: BudgetKind::Time,
                millis: 100,
                count: 200,
            },
            candidates: CandidateConfig {
                max_workers: 3,
                build_clearance: 3,
            },
            rollout: RolloutConfig {
                lookahead_ticks: 100,
                discount: 0.99,
                discount_period_ticks: 10.0,
                follow_intents: true,
                own_policy: PolicyKind::RandomBiased,
                opponent_policy: PolicyKind::RandomBiased,
                bias: 5,
                wait_ticks: 10,
            },
            evaluation: EvaluationConfig {
                kind: EvaluationKind::SimpleSqrt,
            },
            match_play: MatchConfig {
                map: "bases_workers_8x8".to_string(),
                max_ticks: 3000,
                starting_currency: 5,
                resource_amount: 20,
                opponent: OpponentKind::RandomBiased,
            },
            debug: DebugConfig {
                enabled: false,
                log_file_path: "search_debug.jsonl".to_string(),
            },
            profiling: ProfilingConfig {
                enabled: false,
                log_to_stderr: true,
            },
        }
    }

    /// Attempts to load from file, falls back to hardcoded defaults on error
    pub fn load_or_default() -> Self {
        Self::load_default().unwrap_or_else(|e| {
            eprintln!("Warning: Could not load Search.toml ({}), using hardcoded defaults", e);
            Self::default_hardcoded()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_can_be_created() {
        let config = Config::default_hardcoded();
        assert_eq!(config.search.variant, SearchVariant::HillClimb);
        assert_eq!(config.rollout.lookahead_ticks, 100);
        assert_eq!(config.budget.to_budget(), Budget::Time(Duration::from_millis(100)));
    }

    #[test]
    fn test_search_toml_can_be_parsed() {
        // This test ensures Search.toml is valid and can be parsed
        let result = Config::from_file("Search.toml");
        assert!(
            result.is_ok(),
            "Failed to parse Search.toml: {:?}",
            result.err()
        );
    }

    #[test]
    fn test_all_config_values_match_hardcoded_defaults() {
        let file_config = Config::from_file("Search.toml").expect("Search.toml should be parseable");
        let hardcoded_config = Config::default_hardcoded();

        assert_eq!(file_config.search, hardcoded_config.search);
        assert_eq!(file_config.budget, hardcoded_config.budget);
        assert_eq!(file_config.candidates, hardcoded_config.candidates);
        assert_eq!(file_config.rollout, hardcoded_config.rollout);
        assert_eq!(file_config.evaluation, hardcoded_config.evaluation);
        assert_eq!(file_config.match_play, hardcoded_config.match_play);
        assert_eq!(file_config.debug, hardcoded_config.debug);
        assert_eq!(file_config.profiling, hardcoded_config.profiling);
    }

    #[test]
    fn test_seed_is_optional() {
        let text = include_str!("../Search.toml").replace("# seed = 42", "seed = 42");
        let config = Config::from_toml_str(&text).unwrap();
        assert_eq!(config.search.seed, Some(42));
    }

    #[test]
    fn test_iteration_budget_kind() {
        let text = include_str!("../Search.toml").replace("kind = \"time\"", "kind = \"iterations\"");
        let config = Config::from_toml_str(&text).unwrap();
        assert_eq!(config.budget.to_budget(), Budget::Iterations(200));
    }

    #[test]
    fn test_load_or_default_works() {
        let config = Config::load_or_default();
        assert_eq!(config.candidates.max_workers, 3);
    }

    #[test]
    fn test_invalid_toml_returns_error() {
        let result = Config::from_file("nonexistent.toml");
        assert!(result.is_err());
        assert!(Config::from_toml_str("[search]\nvariant = \"genetic\"").is_err());
    }
}
