use vault_robots::config::{Cli, Config};
use vault_robots::map::Map;
use vault_robots::scenario::{generate_random_grid, Scenario};
use vault_robots::solver::{answer_code, KeySolver, Solver};

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::io;
use std::path::Path;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = if let Some(config_file) = cli.config.as_ref() {
        let config_str = std::fs::read_to_string(config_file)?;
        Config::from_yaml_str(&config_str)
            .with_context(|| format!("error with config file: {config_file}"))?
    } else {
        Config::default()
    }
    .override_from_command_line(&cli)?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .with_context(|| format!("invalid log level: {}", config.log_level))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
    if cli.config.is_none() {
        info!("No config file specified, using default config");
    }

    if let Some(scenario_path) = config.scenario_path.as_deref() {
        run_scenario(&config, scenario_path)
    } else if config.random_mazes > 0 {
        run_random(&config)
    } else {
        run_single(&config)
    }
}

fn solve_and_report(map: &Map, source: &str, config: &Config) -> anyhow::Result<i64> {
    let mut solver = KeySolver::new(map).with_context(|| format!("invalid maze: {source}"))?;
    let solution = solver.solve(config)?;

    if config.print_plan {
        if let Some(solution) = &solution {
            for line in solver.describe_plan(solution) {
                println!("{line}");
            }
        }
    }

    let answer = answer_code(solution.map(|solution| solution.cost));
    if let Some(output_path) = &config.output_path {
        solver.stats().append_record(output_path, source, answer)?;
    }
    Ok(answer)
}

fn run_single(config: &Config) -> anyhow::Result<()> {
    let (map, source) = match &config.map_path {
        Some(map_path) => (
            Map::from_file(map_path).with_context(|| format!("error loading map: {map_path}"))?,
            map_path.as_str(),
        ),
        None => (
            Map::from_reader(io::stdin().lock()).context("error reading map from stdin")?,
            "stdin",
        ),
    };

    let answer = solve_and_report(&map, source, config)?;
    println!("{answer}");
    Ok(())
}

fn run_random(config: &Config) -> anyhow::Result<()> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    for index in 0..config.random_mazes {
        let grid = generate_random_grid(
            config.random_rows,
            config.random_cols,
            config.max_keys,
            config.wall_prob,
            &mut rng,
        );
        let map = Map::from_grid(&grid)?;
        debug!("random maze {index}:\n{map}");

        let source = format!("random-{}-{index}", config.seed);
        let answer = solve_and_report(&map, &source, config)?;
        println!("{source}: {answer}");
    }
    Ok(())
}

fn run_scenario(config: &Config, scenario_path: &str) -> anyhow::Result<()> {
    let scenario = Scenario::load_from_file(scenario_path)
        .with_context(|| format!("error loading scenario: {scenario_path}"))?;
    let base_dir = Path::new(scenario_path).parent().unwrap_or(Path::new("."));
    if let Some(name) = &scenario.name {
        info!("running scenario {name}");
    }

    let reports = scenario.run(config, base_dir)?;
    let mut mismatches = 0;
    for report in &reports {
        println!("{}: {}", report.name, report.answer);
        if !report.matched {
            mismatches += 1;
        }
        if let Some(output_path) = &config.output_path {
            report
                .stats
                .append_record(output_path, &report.name, report.answer)?;
        }
    }

    if mismatches > 0 {
        bail!("{mismatches} of {} cases did not match", reports.len());
    }
    Ok(())
}
