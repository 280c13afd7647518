use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};

use crate::map::{Map, MapError, Tile};

/// Number of robots sharing the vault.
pub const NUM_AGENTS: usize = 4;

/// Bit `i` stands for the key of rank `i` in sorted letter order.
pub type KeyMask = u32;

/// One way of walking between two points: the doors it crosses and its length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Variant {
    pub door_mask: KeyMask,
    pub distance: usize,
}

impl Variant {
    pub fn new(door_mask: KeyMask, distance: usize) -> Self {
        Variant {
            door_mask,
            distance,
        }
    }

    /// True when every door on this path is opened by `keys`.
    pub fn is_open_with(&self, keys: KeyMask) -> bool {
        self.door_mask & !keys == 0
    }

    /// `self` is at least as good as `other`: needs a subset of its doors and is no longer.
    pub fn dominates(&self, other: &Variant) -> bool {
        self.door_mask & other.door_mask == self.door_mask && self.distance <= other.distance
    }
}

/// Search node of the key-collection search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct State {
    pub agents: [usize; NUM_AGENTS],
    pub keys: KeyMask,
}

impl State {
    pub fn initial() -> Self {
        let mut agents = [0; NUM_AGENTS];
        for (agent, point) in agents.iter_mut().enumerate() {
            *point = agent;
        }
        State { agents, keys: 0 }
    }

    pub fn collected(&self) -> usize {
        self.keys.count_ones() as usize
    }

    pub fn has_key(&self, key: usize) -> bool {
        self.keys & (1 << key) != 0
    }

    pub fn move_agent(&self, agent: usize, key: usize) -> Self {
        let mut agents = self.agents;
        agents[agent] = NUM_AGENTS + key;
        State {
            agents,
            keys: self.keys | (1 << key),
        }
    }
}

pub fn full_mask(num_keys: usize) -> KeyMask {
    if num_keys >= KeyMask::BITS as usize {
        KeyMask::MAX
    } else {
        (1 << num_keys) - 1
    }
}

/// Robot starts followed by keys in letter order.
///
/// Index `i < NUM_AGENTS` is the start of robot `i`, index `NUM_AGENTS + k` is
/// key rank `k`.
#[derive(Debug, Clone)]
pub struct PointsOfInterest {
    pub positions: Vec<(usize, usize)>,
    pub key_letters: Vec<u8>,
    index: HashMap<(usize, usize), usize>,
    key_rank: [Option<u8>; 26],
}

impl PointsOfInterest {
    pub fn locate(map: &Map) -> Result<Self, MapError> {
        let mut starts = Vec::new();
        let mut keys: BTreeMap<u8, (usize, usize)> = BTreeMap::new();

        for (position, tile) in map.cells() {
            match tile {
                Tile::Start => starts.push(position),
                Tile::Key(letter) => {
                    if let Some(&first) = keys.get(&letter) {
                        return Err(MapError::DuplicateKey {
                            key: Tile::Key(letter).to_char(),
                            first,
                            second: position,
                        });
                    }
                    keys.insert(letter, position);
                }
                _ => {}
            }
        }

        if starts.len() != NUM_AGENTS {
            return Err(MapError::AgentCount {
                expected: NUM_AGENTS,
                found: starts.len(),
            });
        }

        let mut key_rank = [None; 26];
        let mut key_letters = Vec::with_capacity(keys.len());
        let mut positions = starts;
        for (rank, (letter, position)) in keys.into_iter().enumerate() {
            key_rank[letter as usize] = Some(rank as u8);
            key_letters.push(letter);
            positions.push(position);
        }

        let mut orphan_doors = [false; 26];
        for (position, tile) in map.cells() {
            if let Tile::Door(letter) = tile {
                if key_rank[letter as usize].is_none() && !orphan_doors[letter as usize] {
                    orphan_doors[letter as usize] = true;
                    warn!(
                        "door '{}' at {position:?} has no key, treating it as a wall",
                        tile.to_char()
                    );
                }
            }
        }

        let index = positions
            .iter()
            .enumerate()
            .map(|(point, &position)| (position, point))
            .collect();
        debug!("points of interest: {positions:?}");

        Ok(PointsOfInterest {
            positions,
            key_letters,
            index,
            key_rank,
        })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn num_keys(&self) -> usize {
        self.key_letters.len()
    }

    pub fn index_of(&self, position: (usize, usize)) -> Option<usize> {
        self.index.get(&position).copied()
    }

    /// Rank of the key with the given letter offset, if the map holds that key.
    pub fn key_rank(&self, letter: u8) -> Option<usize> {
        self.key_rank
            .get(letter as usize)
            .copied()
            .flatten()
            .map(usize::from)
    }

    /// Door bit for a door letter, `None` for doors that can never open.
    pub fn door_bit(&self, letter: u8) -> Option<KeyMask> {
        self.key_rank(letter).map(|rank| 1 << rank)
    }

    pub fn key_char(&self, key: usize) -> char {
        Tile::Key(self.key_letters[key]).to_char()
    }
}
