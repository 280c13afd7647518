use anyhow::{anyhow, bail, Context};
use clap::Parser;
use serde::Deserialize;

use crate::algorithm::{Heuristic, SearchLimits};
use crate::common::NUM_AGENTS;

#[derive(Parser, Debug)]
#[command(
    name = "Vault Robots",
    about = "Minimum total steps for four robots to collect every key in a vault maze.",
    version = "0.1"
)]
pub struct Cli {
    #[arg(long, help = "Path to a YAML config file")]
    pub config: Option<String>,

    #[arg(long, help = "Path to the maze file, stdin when omitted")]
    pub map_path: Option<String>,

    #[arg(long, help = "Path to a YAML scenario file with expected answers")]
    pub scenario_path: Option<String>,

    #[arg(long, help = "Append one JSON line per solved maze to this file")]
    pub output_path: Option<String>,

    #[arg(long, value_enum, help = "A* heuristic")]
    pub heuristic: Option<Heuristic>,

    #[arg(long, help = "Give up after expanding this many search nodes")]
    pub max_expansions: Option<usize>,

    #[arg(long, help = "Give up after pushing this many search nodes, bounds search memory")]
    pub max_pushes: Option<usize>,

    #[arg(long, help = "Build the reachability graph on all cores")]
    pub parallel: bool,

    #[arg(long, help = "Print which robot takes which key")]
    pub print_plan: bool,

    #[arg(long, help = "Generate and solve this many random mazes")]
    pub random_mazes: Option<usize>,

    #[arg(long, help = "Seed for the random number generator")]
    pub seed: Option<u64>,

    #[arg(long, help = "Rows of generated mazes")]
    pub random_rows: Option<usize>,

    #[arg(long, help = "Columns of generated mazes")]
    pub random_cols: Option<usize>,

    #[arg(long, help = "Upper bound on keys in generated mazes")]
    pub max_keys: Option<usize>,

    #[arg(long, help = "Probability of an inner wall in generated mazes")]
    pub wall_prob: Option<f64>,

    #[arg(long, help = "Log filter, e.g. info or vault_robots=debug")]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub map_path: Option<String>,
    pub scenario_path: Option<String>,
    pub output_path: Option<String>,
    pub heuristic: Heuristic,
    pub max_expansions: Option<usize>,
    pub max_pushes: Option<usize>,
    pub parallel: bool,
    pub print_plan: bool,
    pub random_mazes: usize,
    pub seed: u64,
    pub random_rows: usize,
    pub random_cols: usize,
    pub max_keys: usize,
    pub wall_prob: f64,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            map_path: None,
            scenario_path: None,
            output_path: None,
            heuristic: Heuristic::default(),
            max_expansions: None,
            max_pushes: None,
            parallel: false,
            print_plan: false,
            random_mazes: 0,
            seed: 0,
            random_rows: 10,
            random_cols: 10,
            max_keys: 3,
            wall_prob: 0.2,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        serde_yaml::from_str(yaml).context("invalid config yaml")
    }

    /// Command-line values win over the config file.
    pub fn override_from_command_line(mut self, cli: &Cli) -> anyhow::Result<Self> {
        if let Some(map_path) = &cli.map_path {
            self.map_path = Some(map_path.clone());
        }
        if let Some(scenario_path) = &cli.scenario_path {
            self.scenario_path = Some(scenario_path.clone());
        }
        if let Some(output_path) = &cli.output_path {
            self.output_path = Some(output_path.clone());
        }
        if let Some(heuristic) = cli.heuristic {
            self.heuristic = heuristic;
        }
        if let Some(max_expansions) = cli.max_expansions {
            self.max_expansions = Some(max_expansions);
        }
        if let Some(max_pushes) = cli.max_pushes {
            self.max_pushes = Some(max_pushes);
        }
        self.parallel |= cli.parallel;
        self.print_plan |= cli.print_plan;
        if let Some(random_mazes) = cli.random_mazes {
            self.random_mazes = random_mazes;
        }
        if let Some(seed) = cli.seed {
            self.seed = seed;
        }
        if let Some(random_rows) = cli.random_rows {
            self.random_rows = random_rows;
        }
        if let Some(random_cols) = cli.random_cols {
            self.random_cols = random_cols;
        }
        if let Some(max_keys) = cli.max_keys {
            self.max_keys = max_keys;
        }
        if let Some(wall_prob) = cli.wall_prob {
            self.wall_prob = wall_prob;
        }
        if let Some(log_level) = &cli.log_level {
            self.log_level = log_level.clone();
        }

        self.validate()?;
        Ok(self)
    }

    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            max_expansions: self.max_expansions,
            max_pushes: self.max_pushes,
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_expansions == Some(0) {
            bail!("max expansions must be positive when set");
        }
        if self.max_pushes == Some(0) {
            bail!("max pushes must be positive when set");
        }
        if self.scenario_path.is_some() && self.random_mazes > 0 {
            bail!("choose either a scenario file or random mazes, not both");
        }

        if self.random_mazes > 0 {
            if !(0.0..1.0).contains(&self.wall_prob) {
                return Err(anyhow!(
                    "wall probability must be in [0, 1), got {}",
                    self.wall_prob
                ));
            }
            if self.max_keys == 0 || self.max_keys > 26 {
                return Err(anyhow!(
                    "max keys must be between 1 and 26, got {}",
                    self.max_keys
                ));
            }
            if self.random_rows < 3 || self.random_cols < 3 {
                return Err(anyhow!(
                    "random mazes need at least 3x3 cells, got {}x{}",
                    self.random_rows,
                    self.random_cols
                ));
            }
            // Starts, keys and doors are placed on distinct cells off the last row and column.
            let free_cells = (self.random_rows - 1) * (self.random_cols - 1);
            let needed = NUM_AGENTS + 2 * self.max_keys;
            if free_cells < needed {
                return Err(anyhow!(
                    "a {}x{} maze cannot hold {} robots and {} keys with doors",
                    self.random_rows,
                    self.random_cols,
                    NUM_AGENTS,
                    self.max_keys
                ));
            }
        }
        Ok(())
    }
}
