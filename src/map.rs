use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::str::FromStr;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("map is empty")]
    Empty,
    #[error("row {row} has {len} cells, expected {expected} like the first row")]
    RaggedRow {
        row: usize,
        len: usize,
        expected: usize,
    },
    #[error("invalid tile {tile:?} at ({row}, {col})")]
    InvalidTile { tile: char, row: usize, col: usize },
    #[error("expected exactly {expected} robot starts '@', found {found}")]
    AgentCount { expected: usize, found: usize },
    #[error("key '{key}' appears twice, at {first:?} and {second:?}")]
    DuplicateKey {
        key: char,
        first: (usize, usize),
        second: (usize, usize),
    },
    #[error("failed to read map: {0}")]
    Io(#[from] io::Error),
}

/// A single maze cell. Keys and doors carry their letter offset (`'a'` / `'A'` is 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tile {
    Open,
    Wall,
    Start,
    Key(u8),
    Door(u8),
}

impl Tile {
    pub fn from_char(ch: char) -> Option<Self> {
        match ch {
            '.' => Some(Tile::Open),
            '#' => Some(Tile::Wall),
            '@' => Some(Tile::Start),
            'a'..='z' => Some(Tile::Key(ch as u8 - b'a')),
            'A'..='Z' => Some(Tile::Door(ch as u8 - b'A')),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Tile::Open => '.',
            Tile::Wall => '#',
            Tile::Start => '@',
            Tile::Key(letter) => (b'a' + letter) as char,
            Tile::Door(letter) => (b'A' + letter) as char,
        }
    }
}

/// Immutable rectangular maze. Positions are `(row, col)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Map {
    pub height: usize,
    pub width: usize,
    pub grid: Vec<Vec<Tile>>,
}

impl Map {
    pub fn from_file(path: &str) -> Result<Self, MapError> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, MapError> {
        let lines = reader.lines().collect::<io::Result<Vec<_>>>()?;
        Self::from_lines(lines.iter().map(String::as_str))
    }

    pub fn from_lines<'a, I: IntoIterator<Item = &'a str>>(lines: I) -> Result<Self, MapError> {
        let mut rows: Vec<Vec<char>> = lines
            .into_iter()
            .map(|line| line.trim_end_matches('\r').chars().collect())
            .collect();
        while rows.last().is_some_and(|row| row.is_empty()) {
            rows.pop();
        }
        Self::from_grid(&rows)
    }

    /// Validates a character grid: known alphabet, all rows as long as the first.
    pub fn from_grid(rows: &[Vec<char>]) -> Result<Self, MapError> {
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(MapError::Empty);
        }

        let mut grid = Vec::with_capacity(rows.len());
        for (row, chars) in rows.iter().enumerate() {
            if chars.len() != width {
                return Err(MapError::RaggedRow {
                    row,
                    len: chars.len(),
                    expected: width,
                });
            }
            let tiles = chars
                .iter()
                .enumerate()
                .map(|(col, &tile)| {
                    Tile::from_char(tile).ok_or(MapError::InvalidTile { tile, row, col })
                })
                .collect::<Result<Vec<_>, _>>()?;
            grid.push(tiles);
        }

        Ok(Map {
            height: grid.len(),
            width,
            grid,
        })
    }

    pub fn tile(&self, x: usize, y: usize) -> Tile {
        self.grid[x][y]
    }

    pub fn get_neighbors(&self, x: usize, y: usize) -> Vec<(usize, usize)> {
        let directions = [(-1, 0), (1, 0), (0, -1), (0, 1)]; // Up, down, left, right
        let mut neighbors = Vec::with_capacity(directions.len());

        for &(dx, dy) in &directions {
            let new_x = x as isize + dx;
            let new_y = y as isize + dy;
            if new_x >= 0
                && new_y >= 0
                && (new_x as usize) < self.height
                && (new_y as usize) < self.width
                && self.grid[new_x as usize][new_y as usize] != Tile::Wall
            {
                neighbors.push((new_x as usize, new_y as usize));
            }
        }

        neighbors
    }

    /// Row-major iterator over every cell.
    pub fn cells(&self) -> impl Iterator<Item = ((usize, usize), Tile)> + '_ {
        self.grid.iter().enumerate().flat_map(|(x, row)| {
            row.iter()
                .enumerate()
                .map(move |(y, &tile)| ((x, y), tile))
        })
    }
}

impl FromStr for Map {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_lines(s.lines())
    }
}

impl fmt::Display for Map {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in &self.grid {
            let line: String = row.iter().map(|tile| tile.to_char()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_map() {
        let map = Map::from_file("map_file/test/four_rooms.map").unwrap();

        assert_eq!(map.height, 7);
        assert_eq!(map.width, 7);

        assert_eq!(map.tile(0, 0), Tile::Wall);
        assert_eq!(map.tile(1, 1), Tile::Key(0));
        assert_eq!(map.tile(2, 2), Tile::Start);

        let neighbors = map.get_neighbors(1, 1);
        assert_eq!(neighbors.len(), 2);
        assert!(neighbors.contains(&(2, 1)));
        assert!(neighbors.contains(&(1, 2)));
    }

    #[test]
    fn test_round_trip_display() {
        let text = "#####\n#@aA#\n#####\n";
        let map: Map = text.parse().unwrap();
        assert_eq!(map.to_string(), text);
        assert_eq!(map.tile(1, 3), Tile::Door(0));
    }

    #[test]
    fn test_trailing_blank_lines_and_carriage_returns() {
        let map = Map::from_lines(["@.a\r", "..b\r", "", ""]).unwrap();
        assert_eq!(map.height, 2);
        assert_eq!(map.width, 3);
    }

    #[test]
    fn test_ragged_rows_rejected() {
        let err = Map::from_lines(["@@@@", "..."]).unwrap_err();
        assert!(matches!(
            err,
            MapError::RaggedRow {
                row: 1,
                len: 3,
                expected: 4
            }
        ));
    }

    #[test]
    fn test_invalid_tile_rejected() {
        let err = Map::from_lines(["@@@@", "..?."]).unwrap_err();
        assert!(matches!(
            err,
            MapError::InvalidTile {
                tile: '?',
                row: 1,
                col: 2
            }
        ));
    }

    #[test]
    fn test_empty_map_rejected() {
        assert!(matches!(Map::from_lines([""]), Err(MapError::Empty)));
        assert!(matches!("".parse::<Map>(), Err(MapError::Empty)));
    }

    #[test]
    fn test_neighbors_stop_at_border_and_walls() {
        let map: Map = "@#\n..".parse().unwrap();
        assert_eq!(map.get_neighbors(0, 0), vec![(1, 0)]);
        assert_eq!(map.get_neighbors(1, 1), vec![(1, 0)]);
    }
}
