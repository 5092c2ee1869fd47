use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::board::{Board, ChessMove, MoveGen};
use crate::config::EngineConfig;
use crate::time;
use crate::tt::TranspositionTable;
use crate::types::{Score, SearchResult};

/// Clock state for a `go` command, as parsed from UCI `wtime`/`btime`/`winc`/`binc`/`movestogo`.
/// `None` fields mean the corresponding token was absent.
#[derive(Clone, Copy, Debug, Default)]
pub struct TimeControl {
    pub our_time_ms: Option<u64>,
    pub our_inc_ms: Option<u64>,
    pub movestogo: Option<u32>,
    pub movetime_ms: Option<u64>,
    pub infinite: bool,
}

/// Per-search counters, reset at the start of every `choose_move` call.
#[derive(Default)]
pub struct Stats {
    pub nodes: u64,
}

#[derive(Debug)]
pub enum EngineError {
    /// No legal move exists in the given position (checkmate or stalemate at the root). Not a
    /// search failure — the caller decides how to report it (§7).
    NoLegalMoves,
}

/// Owns the transposition table and the stop flag shared with the UCI thread, and turns a
/// position plus a time control into a chosen move. This is the facade seam between the UCI
/// layer and the search core (§5).
pub struct Engine {
    pub config: EngineConfig,
    pub tt: TranspositionTable,
    pub stop: Arc<AtomicBool>,
    pub stats: Stats,
    /// Zobrist hashes of the game played so far, set whole by the UCI `position` command and
    /// extended/unwound in place by the search as it walks the tree (§3, §5). Must be empty again
    /// once `choose_move` returns.
    pub position_history: Vec<u64>,
    start: Option<Instant>,
    hard_limit_ms: Option<u64>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let tt = TranspositionTable::new(config.tt_mb);
        Self {
            config,
            tt,
            stop: Arc::new(AtomicBool::new(false)),
            stats: Stats::default(),
            position_history: Vec::new(),
            start: None,
            hard_limit_ms: None,
        }
    }

    /// Resize the table, discarding its contents. Used for `setoption name Hash value <mb>`.
    pub fn resize_hash(&mut self, mb: usize) {
        self.config.tt_mb = mb;
        self.tt = TranspositionTable::new(mb);
    }

    pub fn new_game(&mut self) {
        self.tt.clear();
    }

    /// Compute the soft (`budget_ms`) and hard (`hard_limit_ms`) search time limits for this move,
    /// per §6.3. `None` means "no clock-based limit" (depth-only or fixed `movetime`).
    fn compute_budget(&self, tc: &TimeControl) -> (Option<u64>, Option<u64>) {
        if tc.infinite {
            return (None, None);
        }
        if let Some(movetime) = tc.movetime_ms {
            return (Some(movetime), Some(movetime));
        }
        if let Some(our_time) = tc.our_time_ms {
            let expected_moves = tc.movestogo.filter(|&m| m > 0).unwrap_or(40) as f64;
            let base = 0.6 * (our_time as f64) / expected_moves;
            let inc_part = 0.8 * tc.our_inc_ms.unwrap_or(0) as f64;
            let mut budget = (base + inc_part - 300.0).round();
            if budget < 100.0 {
                budget = 100.0;
            }
            if our_time > 300 {
                budget = budget.min((our_time - 300) as f64);
            }
            let budget = budget as u64;
            let hard_limit = ((budget as f64) * 0.9).floor() as u64;
            return (Some(budget), Some(hard_limit));
        }
        // No clock info at all: fall back to configured fixed time, else depth-only.
        match self.config.time_ms {
            Some(ms) => (Some(ms), Some(((ms as f64) * 0.9).floor() as u64)),
            None => (None, None),
        }
    }

    /// True once the hard time limit has elapsed, or the UCI thread asked us to stop. Polled from
    /// inside the search loop; the `Ordering::Relaxed` load keeps the hot path cheap, while the
    /// setter (on the UCI thread) uses `SeqCst` so the write is never reordered away.
    pub fn should_stop(&self) -> bool {
        if self.stop.load(Ordering::Relaxed) {
            return true;
        }
        if let (Some(start), Some(limit)) = (self.start, self.hard_limit_ms) {
            return time::elapsed_ms(start) >= limit;
        }
        false
    }

    /// Run iterative deepening from `board` under `tc`, returning the chosen move and the
    /// deepest completed result. Emits `info` lines to stdout per completed depth unless disabled
    /// in config.
    pub fn choose_move(&mut self, board: &Board, tc: TimeControl) -> Result<SearchResult, EngineError> {
        let mut legal_moves = MoveGen::new_legal(board);
        let Some(first) = legal_moves.next() else {
            return Err(EngineError::NoLegalMoves);
        };
        // Exactly one legal move: return it immediately, no search invoked (§4.6.1 step 1).
        if legal_moves.next().is_none() {
            return Ok(SearchResult { best_move: Some(first), score: 0, depth: 0, nodes: 0, pv: vec![first] });
        }

        self.stats = Stats::default();
        self.stop.store(false, Ordering::SeqCst);
        self.tt.new_search();

        let (budget_ms, hard_limit_ms) = self.compute_budget(&tc);
        self.start = Some(time::now());
        self.hard_limit_ms = hard_limit_ms;

        if self.config.logging.emit_depth_log {
            eprintln!(
                "# budget_ms={:?} hard_limit_ms={:?} wtime={:?} binc={:?}",
                budget_ms, hard_limit_ms, tc.our_time_ms, tc.our_inc_ms
            );
        }

        let max_depth = self.config.max_depth;
        let mut result = SearchResult::default();
        let mut best_move_so_far: Option<ChessMove> = None;

        for depth in 1..=max_depth {
            if depth > 1 {
                if self.stop.load(Ordering::Relaxed) {
                    break;
                }
                if let Some(budget) = budget_ms {
                    if time::elapsed_ms(self.start.unwrap()) >= budget {
                        break;
                    }
                }
            }

            let iter = crate::search::search_root(self, board, depth, best_move_so_far);

            // A stopped mid-depth iteration's result is unreliable except at depth 1, where we
            // have no prior result to fall back on and must report whatever came back.
            if depth > 1 && self.should_stop() {
                break;
            }

            result = iter;
            best_move_so_far = result.best_move;

            self.emit_info(&result);

            if crate::types::is_mate_score(result.score) {
                break;
            }
        }

        self.start = None;
        Ok(result)
    }

    /// Emit a UCI `info` line for a completed iteration: depth, nodes, nps, score, and (unless
    /// disabled) the full principal variation. The whole line is gated by `config.logging.emit_pv`
    /// — with it off, depth progress is only visible on stderr via the budget/diagnostic log.
    pub fn emit_info(&self, result: &SearchResult) {
        if !self.config.logging.emit_pv {
            return;
        }

        let elapsed = self.start.map(time::elapsed_ms).unwrap_or(0);
        let nps = time::nps(self.stats.nodes, elapsed.max(1));

        let score_str = if let Some(mate_plies) = mate_distance(result.score) {
            format!("mate {}", mate_plies)
        } else {
            format!("cp {}", result.score)
        };

        let mut line = format!(
            "info depth {} nodes {} nps {} score {}",
            result.depth, self.stats.nodes, nps, score_str
        );

        if !result.pv.is_empty() {
            let pv_str = result.pv.iter().map(|m| m.to_string()).collect::<Vec<_>>().join(" ");
            line.push_str(&format!(" pv {}", pv_str));
        }
        println!("{}", line);
    }
}

/// Convert an engine score into a signed mate distance in full moves (UCI `score mate N`), or
/// `None` if the score isn't a mate score.
fn mate_distance(score: Score) -> Option<i32> {
    if !crate::types::is_mate_score(score) {
        return None;
    }
    let plies_to_mate = crate::types::MATE - score.abs();
    let full_moves = (plies_to_mate + 1) / 2;
    Some(if score > 0 { full_moves } else { -full_moves })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_uses_clock_formula() {
        let engine = Engine::new(EngineConfig::default());
        let tc = TimeControl { our_time_ms: Some(60_000), our_inc_ms: Some(1000), movestogo: None, movetime_ms: None, infinite: false };
        let (budget, hard) = engine.compute_budget(&tc);
        // base = 0.6*60000/40 = 900; inc = 0.8*1000 = 800; budget = round(900+800-300) = 1400
        assert_eq!(budget, Some(1400));
        assert_eq!(hard, Some(1260));
    }

    #[test]
    fn test_budget_floor_is_100ms() {
        let engine = Engine::new(EngineConfig::default());
        let tc = TimeControl { our_time_ms: Some(500), our_inc_ms: None, movestogo: None, movetime_ms: None, infinite: false };
        let (budget, _) = engine.compute_budget(&tc);
        assert_eq!(budget, Some(100));
    }

    #[test]
    fn test_movetime_overrides_clock() {
        let engine = Engine::new(EngineConfig::default());
        let tc = TimeControl { our_time_ms: Some(60_000), our_inc_ms: Some(0), movestogo: None, movetime_ms: Some(2500), infinite: false };
        let (budget, hard) = engine.compute_budget(&tc);
        assert_eq!(budget, Some(2500));
        assert_eq!(hard, Some(2500));
    }

    #[test]
    fn test_infinite_has_no_limit() {
        let engine = Engine::new(EngineConfig::default());
        let tc = TimeControl { infinite: true, ..Default::default() };
        let (budget, hard) = engine.compute_budget(&tc);
        assert_eq!(budget, None);
        assert_eq!(hard, None);
    }

    #[test]
    fn test_no_clock_falls_back_to_config_time_ms() {
        let engine = Engine::new(EngineConfig::default());
        let tc = TimeControl::default();
        let (budget, hard) = engine.compute_budget(&tc);
        assert_eq!(budget, Some(1500));
        assert_eq!(hard, Some(1350));
    }

    #[test]
    fn test_mate_distance_signs() {
        assert_eq!(mate_distance(crate::types::mate_in(3)), Some(2));
        assert_eq!(mate_distance(crate::types::mated_in(4)), Some(-2));
        assert_eq!(mate_distance(150), None);
    }

    #[test]
    fn test_choose_move_no_legal_moves_errors() {
        let mut engine = Engine::new(EngineConfig::default());
        // Fool's mate position: black has just been checkmated.
        let board: Board = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3"
            .parse()
            .unwrap();
        let result = engine.choose_move(&board, TimeControl::default());
        assert!(matches!(result, Err(EngineError::NoLegalMoves)));
    }
}
