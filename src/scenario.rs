use anyhow::{anyhow, Context, Result};
use rand::prelude::*;
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{info, warn};

use crate::common::NUM_AGENTS;
use crate::config::Config;
use crate::map::Map;
use crate::solver::{answer_code, KeySolver, Solver};
use crate::stat::Stats;

/// A batch of mazes with the answers they should produce.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub cases: Vec<Case>,
}

/// One maze, either inline or in a file next to the scenario.
/// `expected` uses -1 for "cannot collect every key".
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Case {
    pub name: String,
    #[serde(default)]
    pub grid: Option<Vec<String>>,
    #[serde(default)]
    pub map: Option<String>,
    #[serde(default)]
    pub expected: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CaseReport {
    pub name: String,
    pub answer: i64,
    pub expected: Option<i64>,
    pub matched: bool,
    pub stats: Stats,
}

impl Case {
    pub fn load_map(&self, base_dir: &Path) -> Result<Map> {
        match (&self.grid, &self.map) {
            (Some(grid), None) => Ok(Map::from_lines(grid.iter().map(String::as_str))?),
            (None, Some(map)) => {
                let path = base_dir.join(map);
                let path = path
                    .to_str()
                    .ok_or_else(|| anyhow!("non UTF-8 map path {path:?}"))?;
                Map::from_file(path).with_context(|| format!("error with map file: {path}"))
            }
            _ => Err(anyhow!(
                "case {} needs exactly one of `grid` or `map`",
                self.name
            )),
        }
    }
}

impl Scenario {
    pub fn load_from_file(path: &str) -> Result<Scenario> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let scenario = serde_yaml::from_reader(reader)?;
        Ok(scenario)
    }

    /// Solves every case. Map paths are resolved against `base_dir`.
    pub fn run(&self, config: &Config, base_dir: &Path) -> Result<Vec<CaseReport>> {
        let mut reports = Vec::with_capacity(self.cases.len());
        for case in &self.cases {
            let map = case.load_map(base_dir)?;
            let mut solver = KeySolver::new(&map)
                .with_context(|| format!("case {} has an invalid maze", case.name))?;
            let solution = solver
                .solve(config)
                .with_context(|| format!("case {} failed", case.name))?;

            let answer = answer_code(solution.map(|solution| solution.cost));
            let matched = case.expected.map_or(true, |expected| expected == answer);
            if matched {
                info!("case {}: {answer}", case.name);
            } else {
                warn!(
                    "case {}: got {answer}, expected {:?}",
                    case.name, case.expected
                );
            }

            reports.push(CaseReport {
                name: case.name.clone(),
                answer,
                expected: case.expected,
                matched,
                stats: solver.stats().clone(),
            });
        }
        Ok(reports)
    }
}

/// Random maze with no walls on its border, four robots,
/// between one and `max_keys` keys and one door per key.
///
/// Robots, keys and doors never share a cell and sit off the last row and column;
/// walls are then scattered over the remaining inner cells with probability `wall_prob`.
///
/// # Panics
///
/// Panics if `(rows - 1) * (cols - 1)` cannot hold the four robots.
pub fn generate_random_grid<R: Rng + ?Sized>(
    rows: usize,
    cols: usize,
    max_keys: usize,
    wall_prob: f64,
    rng: &mut R,
) -> Vec<Vec<char>> {
    let mut grid = vec![vec!['.'; cols]; rows];

    let mut cells: Vec<(usize, usize)> = (0..rows.saturating_sub(1))
        .flat_map(|x| (0..cols.saturating_sub(1)).map(move |y| (x, y)))
        .collect();
    assert!(
        cells.len() >= NUM_AGENTS,
        "a {rows}x{cols} maze cannot hold {NUM_AGENTS} robots"
    );
    cells.shuffle(rng);

    let max_keys = max_keys.min(26).min((cells.len() - NUM_AGENTS) / 2);
    let num_keys = if max_keys == 0 {
        0
    } else {
        rng.gen_range(1..=max_keys)
    };

    let (starts, rest) = cells.split_at(NUM_AGENTS);
    for &(x, y) in starts {
        grid[x][y] = '@';
    }
    for (letter, (&(key_x, key_y), &(door_x, door_y))) in rest[..num_keys]
        .iter()
        .zip(&rest[num_keys..2 * num_keys])
        .enumerate()
    {
        grid[key_x][key_y] = (b'a' + letter as u8) as char;
        grid[door_x][door_y] = (b'A' + letter as u8) as char;
    }

    for x in 1..rows.saturating_sub(1) {
        for y in 1..cols.saturating_sub(1) {
            if grid[x][y] == '.' && rng.gen_bool(wall_prob) {
                grid[x][y] = '#';
            }
        }
    }

    grid
}
