use anyhow::Context;
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use tracing::info;

#[derive(Debug, Clone, Default, Serialize)]
pub struct Stats {
    pub costs: Option<usize>,
    pub time_us: usize,
    pub bfs_expand_cells: usize,
    pub raw_variants: usize,
    pub filtered_variants: usize,
    pub a_star_expand_nodes: usize,
    pub a_star_push_nodes: usize,
    pub a_star_stale_nodes: usize,
}

#[derive(Serialize)]
struct Record<'a> {
    source: &'a str,
    answer: i64,
    stats: &'a Stats,
}

impl Stats {
    pub(crate) fn merge_bfs(&mut self, other: &Stats) {
        self.bfs_expand_cells += other.bfs_expand_cells;
        self.raw_variants += other.raw_variants;
    }

    pub fn print(&self) {
        info!(
            "Cost {:?} Time(microseconds) {:?} BFS expand cells: {:?} Variants raw/filtered: {:?}/{:?} A* expand nodes: {:?} pushed: {:?} stale: {:?}",
            self.costs,
            self.time_us,
            self.bfs_expand_cells,
            self.raw_variants,
            self.filtered_variants,
            self.a_star_expand_nodes,
            self.a_star_push_nodes,
            self.a_star_stale_nodes
        );
    }

    /// Appends one JSON line describing a solved maze to `path`.
    pub fn append_record(&self, path: &str, source: &str, answer: i64) -> anyhow::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("cannot open output file {path}"))?;
        let line = serde_json::to_string(&Record {
            source,
            answer,
            stats: self,
        })?;
        writeln!(file, "{line}")?;
        Ok(())
    }
}
