//! Genetic optimizer configuration.
//!
//! The optimizer evolves populations of 8-card decks. Every knob has a serde
//! default so a partial JSON document (or none at all) yields a usable config,
//! and selected fields can be overridden from `GA_*` environment variables.

use std::env;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Genetic optimizer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticConfig {
    /// Total individuals, split evenly across islands.
    #[serde(default = "default_population_size")]
    pub population_size: usize,
    /// Generation budget.
    #[serde(default = "default_generations")]
    pub generations: usize,
    /// Probability an offspring is mutated.
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Probability two parents are recombined.
    #[serde(default = "default_crossover_rate")]
    pub crossover_rate: f64,
    /// Fraction of the 8 slots replaced when mutation fires.
    #[serde(default = "default_mutation_intensity")]
    pub mutation_intensity: f64,
    /// Individuals copied unchanged into the next generation.
    #[serde(default = "default_elite_count")]
    pub elite_count: usize,
    /// Contestants per tournament.
    #[serde(default = "default_tournament_size")]
    pub tournament_size: usize,
    /// Evaluate fitness on the rayon pool.
    #[serde(default = "default_true")]
    pub parallel_evaluations: bool,
    /// Stop after this many generations without improvement (0 disables).
    #[serde(default = "default_convergence_generations")]
    pub convergence_generations: usize,
    /// Stop once the best fitness reaches this value (0 disables).
    #[serde(default)]
    pub target_fitness: f64,
    /// Split the population into islands with ring migration.
    #[serde(default)]
    pub island_model: bool,
    /// Number of islands.
    #[serde(default = "default_island_count")]
    pub island_count: usize,
    /// Generations between migrations.
    #[serde(default = "default_migration_interval")]
    pub migration_interval: usize,
    /// Individuals copied per migration.
    #[serde(default = "default_migration_size")]
    pub migration_size: usize,
    /// Distinct decks retained in the hall of fame.
    #[serde(default = "default_hall_of_fame_size")]
    pub hall_of_fame_size: usize,
    /// Known-good decks placed in the initial population.
    #[serde(default)]
    pub seed_population: Vec<Vec<String>>,
    /// Random seed for reproducibility.
    #[serde(default)]
    pub random_seed: Option<u64>,
}

fn default_population_size() -> usize {
    100
}

fn default_generations() -> usize {
    200
}

fn default_mutation_rate() -> f64 {
    0.1
}

fn default_crossover_rate() -> f64 {
    0.8
}

fn default_mutation_intensity() -> f64 {
    0.3
}

fn default_elite_count() -> usize {
    2
}

fn default_tournament_size() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_convergence_generations() -> usize {
    30
}

fn default_island_count() -> usize {
    4
}

fn default_migration_interval() -> usize {
    15
}

fn default_migration_size() -> usize {
    2
}

fn default_hall_of_fame_size() -> usize {
    10
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: default_population_size(),
            generations: default_generations(),
            mutation_rate: default_mutation_rate(),
            crossover_rate: default_crossover_rate(),
            mutation_intensity: default_mutation_intensity(),
            elite_count: default_elite_count(),
            tournament_size: default_tournament_size(),
            parallel_evaluations: true,
            convergence_generations: default_convergence_generations(),
            target_fitness: 0.0,
            island_model: false,
            island_count: default_island_count(),
            migration_interval: default_migration_interval(),
            migration_size: default_migration_size(),
            hall_of_fame_size: default_hall_of_fame_size(),
            seed_population: Vec::new(),
            random_seed: None,
        }
    }
}

/// Invalid genetic parameter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeneticConfigError {
    #[error("population_size must be positive")]
    EmptyPopulation,
    #[error("generations must be positive")]
    NoGenerations,
    #[error("{name} must be in [0, 1], got {value}")]
    OutOfUnitRange { name: &'static str, value: f64 },
    #[error("elite_count ({elite}) must be less than population_size ({population})")]
    TooManyElites { elite: usize, population: usize },
    #[error("tournament_size must be in 1..={population}, got {size}")]
    InvalidTournament { size: usize, population: usize },
    #[error("target_fitness must be non-negative, got {0}")]
    NegativeTarget(f64),
    #[error("island model requires at least 2 islands, got {0}")]
    TooFewIslands(usize),
    #[error("migration_interval must be positive")]
    NoMigrationInterval,
    #[error("migration_size must be in 1..{limit} (population per island), got {size}")]
    InvalidMigrationSize { size: usize, limit: usize },
    #[error("elite_count ({elite}) must be less than the smallest island ({per_island})")]
    TooManyElitesPerIsland { elite: usize, per_island: usize },
}

impl GeneticConfig {
    /// Check every parameter, reporting the first violation.
    pub fn validate(&self) -> Result<(), GeneticConfigError> {
        if self.population_size == 0 {
            return Err(GeneticConfigError::EmptyPopulation);
        }
        if self.generations == 0 {
            return Err(GeneticConfigError::NoGenerations);
        }
        for (name, value) in [
            ("mutation_rate", self.mutation_rate),
            ("crossover_rate", self.crossover_rate),
            ("mutation_intensity", self.mutation_intensity),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(GeneticConfigError::OutOfUnitRange { name, value });
            }
        }
        if self.elite_count >= self.population_size {
            return Err(GeneticConfigError::TooManyElites {
                elite: self.elite_count,
                population: self.population_size,
            });
        }
        if self.tournament_size == 0 || self.tournament_size > self.population_size {
            return Err(GeneticConfigError::InvalidTournament {
                size: self.tournament_size,
                population: self.population_size,
            });
        }
        if self.target_fitness < 0.0 {
            return Err(GeneticConfigError::NegativeTarget(self.target_fitness));
        }
        if self.island_model {
            if self.island_count < 2 {
                return Err(GeneticConfigError::TooFewIslands(self.island_count));
            }
            if self.migration_interval == 0 {
                return Err(GeneticConfigError::NoMigrationInterval);
            }
            // Islands hold floor(population / islands) or one more.
            let limit = self.population_size / self.island_count;
            if self.elite_count >= limit {
                return Err(GeneticConfigError::TooManyElitesPerIsland {
                    elite: self.elite_count,
                    per_island: limit,
                });
            }
            if self.migration_size == 0 || self.migration_size >= limit {
                return Err(GeneticConfigError::InvalidMigrationSize {
                    size: self.migration_size,
                    limit,
                });
            }
        }
        Ok(())
    }

    /// Number of sub-populations actually evolved.
    pub fn islands(&self) -> usize {
        if self.island_model {
            self.island_count.max(1)
        } else {
            1
        }
    }

    /// Override fields from `GA_*` environment variables.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| env::var(key).ok());
    }

    /// Override fields from `GA_*` keys resolved by `lookup`.
    ///
    /// Empty values are skipped. Values that fail to parse or fall outside
    /// the field's range are logged and ignored. Boolean flags are set by
    /// any non-empty value: `1` or `true` enables, anything else disables.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let positive = |n: &usize| *n > 0;
        let any = |_: &usize| true;
        let unit = |v: &f64| (0.0..=1.0).contains(v);

        override_field(&lookup, "GA_POPULATION_SIZE", positive, &mut self.population_size);
        override_field(&lookup, "GA_GENERATIONS", positive, &mut self.generations);
        override_field(&lookup, "GA_MUTATION_RATE", unit, &mut self.mutation_rate);
        override_field(&lookup, "GA_CROSSOVER_RATE", unit, &mut self.crossover_rate);
        override_field(&lookup, "GA_MUTATION_INTENSITY", unit, &mut self.mutation_intensity);
        override_field(&lookup, "GA_ELITE_COUNT", any, &mut self.elite_count);
        override_field(&lookup, "GA_TOURNAMENT_SIZE", positive, &mut self.tournament_size);
        override_field(
            &lookup,
            "GA_CONVERGENCE_GENERATIONS",
            any,
            &mut self.convergence_generations,
        );
        override_field(
            &lookup,
            "GA_TARGET_FITNESS",
            |v: &f64| v.is_finite() && *v >= 0.0,
            &mut self.target_fitness,
        );
        override_field(&lookup, "GA_ISLAND_COUNT", positive, &mut self.island_count);
        override_field(&lookup, "GA_MIGRATION_INTERVAL", positive, &mut self.migration_interval);
        override_field(&lookup, "GA_MIGRATION_SIZE", positive, &mut self.migration_size);

        override_flag(&lookup, "GA_PARALLEL_EVALUATIONS", &mut self.parallel_evaluations);
        override_flag(&lookup, "GA_ISLAND_MODEL", &mut self.island_model);
    }
}

fn lookup_value<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

fn override_field<F, T, V>(lookup: &F, key: &str, valid: V, field: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    V: Fn(&T) -> bool,
{
    let Some(raw) = lookup_value(lookup, key) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(value) if valid(&value) => *field = value,
        Ok(_) => log::warn!("ignoring out-of-range {key}={raw:?}"),
        Err(_) => log::warn!("ignoring unparsable {key}={raw:?}"),
    }
}

fn override_flag<F>(lookup: &F, key: &str, field: &mut bool)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup_value(lookup, key) {
        *field = raw == "1" || raw.eq_ignore_ascii_case("true");
    }
}

/// Snapshot reported after every generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneticProgress {
    /// Generations completed (0 = initial population).
    pub generation: usize,
    /// Best fitness seen so far.
    pub best_fitness: f64,
    /// Mean fitness over all islands.
    pub avg_fitness: f64,
    /// Number of islands.
    pub populations: usize,
}

/// Reason a genetic run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Generation budget used up.
    MaxGenerations,
    /// Best fitness reached the target.
    TargetReached,
    /// No improvement for the convergence window.
    Converged,
    /// Cancelled by the caller.
    Cancelled,
}

/// Uniqueness bonus settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniquenessConfig {
    /// Apply the bonus at all.
    #[serde(default)]
    pub enabled: bool,
    /// Multiplier applied to the deck uniqueness score.
    #[serde(default = "default_uniqueness_weight")]
    pub weight: f64,
    /// Cards below this uniqueness count as 0.
    #[serde(default = "default_min_uniqueness")]
    pub min_uniqueness_threshold: f64,
    /// Combine per-card scores with a geometric instead of arithmetic mean.
    #[serde(default)]
    pub use_geometric_mean: bool,
}

fn default_uniqueness_weight() -> f64 {
    0.15
}

fn default_min_uniqueness() -> f64 {
    0.5
}

impl Default for UniquenessConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            weight: default_uniqueness_weight(),
            min_uniqueness_threshold: default_min_uniqueness(),
            use_geometric_mean: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::ffi::OsString;

    #[test]
    fn test_default_config_is_valid() {
        let config = GeneticConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.islands(), 1);

        let parsed: GeneticConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_validation_rules() {
        let base = GeneticConfig::default();

        let config = GeneticConfig {
            population_size: 0,
            ..base.clone()
        };
        assert_eq!(config.validate(), Err(GeneticConfigError::EmptyPopulation));

        let config = GeneticConfig {
            mutation_rate: 1.5,
            ..base.clone()
        };
        assert!(matches!(
            config.validate(),
            Err(GeneticConfigError::OutOfUnitRange {
                name: "mutation_rate",
                ..
            })
        ));

        let config = GeneticConfig {
            elite_count: 100,
            ..base.clone()
        };
        assert!(matches!(
            config.validate(),
            Err(GeneticConfigError::TooManyElites { .. })
        ));

        let config = GeneticConfig {
            tournament_size: 0,
            ..base.clone()
        };
        assert!(matches!(
            config.validate(),
            Err(GeneticConfigError::InvalidTournament { .. })
        ));

        let config = GeneticConfig {
            target_fitness: -1.0,
            ..base.clone()
        };
        assert_eq!(
            config.validate(),
            Err(GeneticConfigError::NegativeTarget(-1.0))
        );
    }

    #[test]
    fn test_island_validation() {
        let base = GeneticConfig {
            island_model: true,
            ..Default::default()
        };
        assert!(base.validate().is_ok());
        assert_eq!(base.islands(), 4);

        let config = GeneticConfig {
            island_count: 1,
            ..base.clone()
        };
        assert_eq!(config.validate(), Err(GeneticConfigError::TooFewIslands(1)));

        let config = GeneticConfig {
            migration_interval: 0,
            ..base.clone()
        };
        assert_eq!(
            config.validate(),
            Err(GeneticConfigError::NoMigrationInterval)
        );

        let config = GeneticConfig {
            migration_size: 25,
            ..base
        };
        assert_eq!(
            config.validate(),
            Err(GeneticConfigError::InvalidMigrationSize {
                size: 25,
                limit: 25
            })
        );
    }

    #[test]
    fn test_island_elites_fit_smallest_island() {
        // 12 over 4 islands leaves 3 per island.
        let base = GeneticConfig {
            island_model: true,
            population_size: 12,
            island_count: 4,
            migration_size: 1,
            tournament_size: 3,
            ..Default::default()
        };
        assert!(GeneticConfig { elite_count: 2, ..base.clone() }.validate().is_ok());
        assert_eq!(
            GeneticConfig { elite_count: 3, ..base.clone() }.validate(),
            Err(GeneticConfigError::TooManyElitesPerIsland {
                elite: 3,
                per_island: 3
            })
        );

        // A single population only checks the total.
        let config = GeneticConfig {
            island_model: false,
            elite_count: 3,
            ..base
        };
        assert!(config.validate().is_ok());
    }

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> + use<> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_overrides_use_full_names() {
        let mut config = GeneticConfig::default();
        config.apply_overrides(lookup(&[
            ("GA_POPULATION_SIZE", "60"),
            ("GA_GENERATIONS", "12"),
            ("GA_MUTATION_RATE", "0.25"),
            ("GA_ELITE_COUNT", "0"),
            ("GA_CONVERGENCE_GENERATIONS", "0"),
            ("GA_TARGET_FITNESS", "7.5"),
            ("GA_PARALLEL_EVALUATIONS", "0"),
            ("GA_ISLAND_MODEL", "1"),
            ("GA_ISLAND_COUNT", "3"),
        ]));
        assert_eq!(config.population_size, 60);
        assert_eq!(config.generations, 12);
        assert_eq!(config.mutation_rate, 0.25);
        assert_eq!(config.elite_count, 0);
        assert_eq!(config.convergence_generations, 0);
        assert_eq!(config.target_fitness, 7.5);
        assert!(!config.parallel_evaluations);
        assert!(config.island_model);
        assert_eq!(config.island_count, 3);

        // Short names are not recognised.
        let mut config = GeneticConfig::default();
        config.apply_overrides(lookup(&[("GA_POPULATION", "60"), ("GA_PARALLEL_EVAL", "0")]));
        assert_eq!(config, GeneticConfig::default());
    }

    #[test]
    fn test_override_flags() {
        let cases = [
            ("1", true),
            ("true", true),
            ("TRUE", true),
            ("yes", false),
            ("0", false),
        ];
        for (raw, expected) in cases {
            let mut config = GeneticConfig {
                parallel_evaluations: !expected,
                ..Default::default()
            };
            config.apply_overrides(lookup(&[("GA_PARALLEL_EVALUATIONS", raw)]));
            assert_eq!(config.parallel_evaluations, expected, "{raw}");
        }

        let mut config = GeneticConfig::default();
        config.apply_overrides(lookup(&[("GA_PARALLEL_EVALUATIONS", "  ")]));
        assert!(config.parallel_evaluations);
    }

    #[test]
    fn test_out_of_range_overrides_ignored() {
        let mut config = GeneticConfig::default();
        config.apply_overrides(lookup(&[
            ("GA_POPULATION_SIZE", "0"),
            ("GA_GENERATIONS", "-5"),
            ("GA_MUTATION_RATE", "1.5"),
            ("GA_CROSSOVER_RATE", "-0.1"),
            ("GA_MUTATION_INTENSITY", "NaN"),
            ("GA_ELITE_COUNT", "many"),
            ("GA_TOURNAMENT_SIZE", "0"),
            ("GA_TARGET_FITNESS", "-1"),
            ("GA_ISLAND_COUNT", "0"),
            ("GA_MIGRATION_INTERVAL", "0"),
            ("GA_MIGRATION_SIZE", "0"),
        ]));
        assert_eq!(config, GeneticConfig::default());
    }

    /// Sets an environment variable for the guard's lifetime.
    struct EnvGuard {
        key: &'static str,
        previous: Option<OsString>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let previous = env::var_os(key);
            // SAFETY: no other test reads or writes GA_GENERATIONS.
            unsafe { env::set_var(key, value) };
            Self { key, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // SAFETY: see EnvGuard::set.
            unsafe {
                match &self.previous {
                    Some(value) => env::set_var(self.key, value),
                    None => env::remove_var(self.key),
                }
            }
        }
    }

    #[test]
    fn test_env_overrides_read_process_environment() {
        let _guard = EnvGuard::set("GA_GENERATIONS", "17");
        let mut config = GeneticConfig::default();
        config.apply_env_overrides();
        assert_eq!(config.generations, 17);
    }

    #[test]
    fn test_uniqueness_defaults() {
        let config: UniquenessConfig = serde_json::from_str("{}").unwrap();
        assert!(!config.enabled);
        assert_eq!(config.weight, 0.15);
        assert_eq!(config.min_uniqueness_threshold, 0.5);
    }
}
