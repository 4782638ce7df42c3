//! Deck Discovery CLI - Explore a deck space from JSON configuration.

use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use deck_discovery::{
    compute::{CancelToken, DeckGenerator, DeckSpaceCalculator, format_large_number},
    schema::{
        CardCandidate, CardRole, GeneratorConfig, GeneratorConstraints, GeneratorStrategy,
        GeneticConfig,
    },
};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <config.json> [count]", args[0]);
        eprintln!();
        eprintln!("Generate decks from a JSON generator configuration.");
        eprintln!();
        eprintln!("Arguments:");
        eprintln!("  config.json  Path to generator configuration file");
        eprintln!("  count        Number of decks to generate (default: 10)");
        eprintln!();
        eprintln!("Example configuration is generated with --example flag.");
        eprintln!("Genetic settings can be overridden with GA_* environment variables.");
        std::process::exit(1);
    }

    if args[1] == "--example" {
        print_example_config();
        return;
    }

    let config_path = PathBuf::from(&args[1]);
    let count: usize = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(10);

    // Load configuration
    let config_str = fs::read_to_string(&config_path).unwrap_or_else(|e| {
        eprintln!("Error reading config file: {}", e);
        std::process::exit(1);
    });

    let mut config: GeneratorConfig = serde_json::from_str(&config_str).unwrap_or_else(|e| {
        eprintln!("Error parsing config: {}", e);
        std::process::exit(1);
    });

    if config.strategy == GeneratorStrategy::Genetic {
        let mut genetic = config.genetic.take().unwrap_or_default();
        genetic.apply_env_overrides();
        config.genetic = Some(genetic);
    }

    println!("Deck Discovery");
    println!("==============");
    println!("Strategy: {}", config.strategy);
    println!("Candidates: {}", config.candidates.len());
    println!("Workers: {}", config.workers.max(1));
    println!();

    // Deck space
    let mut calculator = DeckSpaceCalculator::new(&config.candidates);
    if let Some(composition) = config.composition {
        calculator = calculator.with_composition(composition);
    }
    let space = calculator.calculate_stats();

    println!("Deck space:");
    println!(
        "  Total combinations: {}",
        format_large_number(Some(&space.total_combinations))
    );
    println!(
        "  Valid combinations: {}",
        format_large_number(Some(&space.valid_combinations))
    );
    for (role, cards) in &space.cards_by_role {
        println!("  {:<16} {}", format!("{}:", role), cards);
    }
    println!("  By average elixir:");
    for (label, estimate) in &space.by_elixir_range {
        println!("    {:<18} {}", label, format_large_number(Some(estimate)));
    }
    println!();

    // Generate
    println!("Generating {} decks...", count);
    let start = Instant::now();
    let cancel = CancelToken::new();

    let decks = DeckGenerator::generate_parallel(&config, count, &cancel).unwrap_or_else(|e| {
        eprintln!("Error generating decks: {}", e);
        std::process::exit(1);
    });

    let elapsed = start.elapsed();
    let lookup = DeckGenerator::new(config).unwrap_or_else(|e| {
        eprintln!("Error building generator: {}", e);
        std::process::exit(1);
    });

    for (i, deck) in decks.iter().enumerate() {
        println!(
            "  {:>3}. [{:.1}] {}",
            i + 1,
            lookup.average_elixir(deck),
            deck.join(", ")
        );
    }
    println!();
    println!(
        "Time: {:.2}s ({} decks, {:.1} decks/s)",
        elapsed.as_secs_f32(),
        decks.len(),
        decks.len() as f32 / elapsed.as_secs_f32().max(f32::EPSILON)
    );
}

fn print_example_config() {
    let cards: [(&str, u32, CardRole, f64); 10] = [
        ("Hog Rider", 4, CardRole::WinCondition, 9.1),
        ("Cannon", 3, CardRole::Building, 7.4),
        ("Fireball", 4, CardRole::SpellBig, 8.2),
        ("The Log", 2, CardRole::SpellSmall, 8.8),
        ("Musketeer", 4, CardRole::Support, 7.9),
        ("Valkyrie", 4, CardRole::Support, 7.6),
        ("Ice Spirit", 1, CardRole::Cycle, 7.1),
        ("Skeletons", 1, CardRole::Cycle, 6.8),
        ("Tesla", 4, CardRole::Building, 7.0),
        ("Miner", 3, CardRole::WinCondition, 8.5),
    ];
    let candidates = cards
        .iter()
        .map(|&(name, elixir, role, score)| CardCandidate::new(name, elixir, Some(role), score))
        .collect();

    let config = GeneratorConfig {
        constraints: Some(GeneratorConstraints::default()),
        sample_size: 100,
        seed: 42,
        genetic: Some(GeneticConfig::default()),
        ..GeneratorConfig::new(GeneratorStrategy::SmartSample, candidates)
    };

    println!("Example configuration (config.json):");
    match serde_json::to_string_pretty(&config) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Error serializing example: {}", e),
    }
}
