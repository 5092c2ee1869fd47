use crate::board::ChessMove;
use crate::types::{Score, MATE, MAX_PLY};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TTFlag {
    Exact,
    LowerBound, // Beta cutoff (score >= beta)
    UpperBound, // Failed low (score <= alpha)
}

#[derive(Clone, Copy)]
pub struct TTEntry {
    pub depth: u8,
    pub score: Score,
    pub flag: TTFlag,
    pub best_move: Option<ChessMove>,
    pub age: u8,
}

/// Fixed-capacity, direct-mapped transposition table keyed by `hash & mask`. No verification key
/// is stored: a colliding entry is used as-is (see spec §4.5 — acceptable given 64-bit hash space
/// and that consumers re-verify `best_move` legality before playing it).
pub struct TranspositionTable {
    entries: Vec<Option<TTEntry>>,
    mask: usize,
    generation: u8,
    pub hits: u64,
    pub misses: u64,
}

impl TranspositionTable {
    /// Create a new TT sized for a memory budget in MB. Capacity is the largest power of two
    /// whose footprint fits the budget, floor 1024 entries.
    pub fn new(mb: usize) -> Self {
        let entry_bytes = std::mem::size_of::<Option<TTEntry>>();
        let num_entries = (mb * 1024 * 1024) / entry_bytes;
        // Largest power of two <= num_entries (not next_power_of_two()/2, which would
        // needlessly halve an already-power-of-two count).
        let size = if num_entries.is_power_of_two() {
            num_entries
        } else {
            num_entries.next_power_of_two() / 2
        };
        let size = size.max(1024);

        Self {
            entries: vec![None; size],
            mask: size - 1,
            generation: 0,
            hits: 0,
            misses: 0,
        }
    }

    pub fn len_slots(&self) -> usize {
        self.entries.len()
    }

    /// Bump the generation counter at the start of each search. Does not clear entries.
    pub fn new_search(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    pub fn generation(&self) -> u8 {
        self.generation
    }

    /// Probe for `hash`, renormalizing any stored mate score to `ply`.
    pub fn probe(&mut self, hash: u64, ply: usize) -> Option<TTEntry> {
        let idx = hash as usize & self.mask;
        match self.entries[idx] {
            Some(mut entry) => {
                self.hits += 1;
                entry.score = renormalize(entry.score, ply);
                Some(entry)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Given a probed (already ply-renormalized) entry, decide whether it can directly resolve
    /// this node given the current depth/window, per the bound semantics in spec §3/§4.6.2.
    pub fn usable_score(entry: &TTEntry, depth: u8, alpha: Score, beta: Score) -> Option<Score> {
        if entry.depth < depth {
            return None;
        }
        match entry.flag {
            TTFlag::Exact => Some(entry.score),
            TTFlag::LowerBound if entry.score >= beta => Some(entry.score),
            TTFlag::UpperBound if entry.score <= alpha => Some(entry.score),
            _ => None,
        }
    }

    /// Store a search result for `hash`, denormalizing any mate score to be ply-independent
    /// (relative to the stored node, not the root) before writing it into the slot.
    pub fn store(
        &mut self,
        hash: u64,
        depth: u8,
        score: Score,
        flag: TTFlag,
        best_move: Option<ChessMove>,
        ply: usize,
    ) {
        let idx = hash as usize & self.mask;
        let candidate = TTEntry {
            depth,
            score: denormalize(score, ply),
            flag,
            best_move,
            age: self.generation,
        };

        let replace = match &self.entries[idx] {
            None => true,
            Some(existing) => {
                candidate.age > existing.age
                    || (candidate.age == existing.age && candidate.depth >= existing.depth)
                    || existing.age < self.generation.saturating_sub(2)
            }
        };

        if replace {
            self.entries[idx] = Some(candidate);
        }
    }

    /// Drop all entries, bump generation, and reset hit/miss counters. Invoked on `ucinewgame`.
    pub fn clear(&mut self) {
        for slot in self.entries.iter_mut() {
            *slot = None;
        }
        self.generation = self.generation.wrapping_add(1);
        self.hits = 0;
        self.misses = 0;
    }
}

/// Mate scores are denormalized on store — made relative to the stored node rather than the
/// root — so the same position reached at a different ply doesn't carry a stale mate distance.
fn denormalize(score: Score, ply: usize) -> Score {
    if score >= MATE - MAX_PLY as Score {
        score + ply as Score
    } else if score <= -MATE + MAX_PLY as Score {
        score - ply as Score
    } else {
        score
    }
}

/// Inverse of `denormalize`, applied on probe.
fn renormalize(score: Score, ply: usize) -> Score {
    if score >= MATE - MAX_PLY as Score {
        score - ply as Score
    } else if score <= -MATE + MAX_PLY as Score {
        score + ply as Score
    } else {
        score
    }
}
