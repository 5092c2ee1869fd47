use crate::board::{Board, BoardStatus, ChessMove};
use crate::engine::Engine;
use crate::evaluation::{evaluate, is_insufficient_material};
use crate::movegen::{order_captures, order_moves};
use crate::tt::{TTFlag, TranspositionTable};
use crate::types::{mated_in, Score, SearchResult, DELTA_MARGIN, INF, MAX_Q_DEPTH};

/// Checkmate/stalemate/insufficient-material/repetition/fifty-move terminal check, shared by
/// negamax and quiescence (§4.6.2 step 3, §4.6.3 step 3). `None` means "not terminal, keep
/// searching".
fn terminal_score(board: &Board, history: &[u64], ply: usize) -> Option<Score> {
    if ply > 0 && history.contains(&board.get_hash()) {
        return Some(0);
    }
    if board.halfmove_clock() >= 100 {
        return Some(0);
    }
    match board.status() {
        BoardStatus::Checkmate => Some(mated_in(ply)),
        BoardStatus::Stalemate => Some(0),
        BoardStatus::Ongoing => {
            if is_insufficient_material(board) {
                Some(0)
            } else {
                None
            }
        }
    }
}

/// Run one full-width iterative-deepening iteration at `depth` from the root position. Called
/// once per completed depth from `Engine::choose_move`'s loop (§4.6.1).
///
/// `hint` is the previous iteration's best move, used as an ordering fallback when the TT has no
/// entry yet for the root (e.g. the very first depth, or after a resize/clear).
pub fn search_root(
    engine: &mut Engine,
    board: &Board,
    depth: u8,
    hint: Option<ChessMove>,
) -> SearchResult {
    let hash = board.get_hash();
    let tt_move = engine.tt.probe(hash, 0).and_then(|e| e.best_move);
    let moves = order_moves(board, tt_move.or(hint));

    let mut alpha: Score = -INF;
    let beta: Score = INF;
    let mut best_score: Score = -INF;
    let mut best_move: Option<ChessMove> = None;

    for scored in &moves {
        let new_board = board.make_move_new(scored.mv);
        let score = -negamax(engine, &new_board, depth - 1, 1, -INF, -alpha);

        if engine.should_stop() {
            if depth > 1 {
                // Abandon this iteration entirely; the caller keeps the prior depth's result.
                return SearchResult {
                    best_move: None,
                    score: 0,
                    depth,
                    nodes: engine.stats.nodes,
                    pv: Vec::new(),
                };
            }
            // No prior iteration to fall back to: commit whatever partial result we have.
            if best_move.is_none() {
                best_move = Some(scored.mv);
                best_score = score;
            }
            break;
        }

        if best_move.is_none() || score > best_score {
            best_score = score;
            best_move = Some(scored.mv);
        }
        if score > alpha {
            alpha = score;
        }
    }

    if let Some(mv) = best_move {
        engine.tt.store(hash, depth, best_score, TTFlag::Exact, Some(mv), 0);
    }

    let pv = extract_pv(board, &mut engine.tt, depth as usize);

    SearchResult {
        best_move,
        score: best_score,
        depth,
        nodes: engine.stats.nodes,
        pv,
    }
}

/// Negamax with alpha-beta pruning and a transposition table (§4.6.2). Fail-soft: always returns
/// the best score found, even on a beta cutoff (load-bearing for the TT flag computation below —
/// do not make this fail-hard to match quiescence).
fn negamax(engine: &mut Engine, board: &Board, depth: u8, ply: usize, mut alpha: Score, beta: Score) -> Score {
    engine.stats.nodes += 1;
    if engine.stats.nodes % 1024 == 0 && engine.should_stop() {
        return 0;
    }

    if let Some(score) = terminal_score(board, &engine.position_history, ply) {
        return score;
    }

    let hash = board.get_hash();
    let mut tt_move = None;
    if let Some(entry) = engine.tt.probe(hash, ply) {
        tt_move = entry.best_move;
        if let Some(score) = TranspositionTable::usable_score(&entry, depth, alpha, beta) {
            return score;
        }
    }

    if depth == 0 {
        return if engine.config.quiescence {
            quiescence(engine, board, ply, 0, alpha, beta)
        } else {
            evaluate(board)
        };
    }

    let moves = order_moves(board, tt_move);
    if moves.is_empty() {
        // Guarded by the terminal check above (checkmate/stalemate), but defended anyway.
        return 0;
    }

    engine.position_history.push(hash);

    let mut best: Score = -INF;
    let mut best_move: Option<ChessMove> = None;
    let alpha0 = alpha;

    for scored in &moves {
        let new_board = board.make_move_new(scored.mv);
        let score = -negamax(engine, &new_board, depth - 1, ply + 1, -beta, -alpha);

        if score > best {
            best = score;
            best_move = Some(scored.mv);
        }
        if score > alpha {
            alpha = score;
        }
        if alpha >= beta {
            break;
        }
    }

    engine.position_history.pop();

    let flag = if best <= alpha0 {
        TTFlag::UpperBound
    } else if best >= beta {
        TTFlag::LowerBound
    } else {
        TTFlag::Exact
    };
    engine.tt.store(hash, depth, best, flag, best_move, ply);

    best
}

/// Capture-only horizon extension (§4.6.3). Fail-hard: clamps to `alpha`/`beta` rather than
/// returning the raw best score — deliberately asymmetric with negamax's fail-soft return, do not
/// "fix" this.
fn quiescence(engine: &mut Engine, board: &Board, ply: usize, q_depth: usize, mut alpha: Score, beta: Score) -> Score {
    engine.stats.nodes += 1;

    if q_depth >= MAX_Q_DEPTH {
        return evaluate(board);
    }
    if engine.should_stop() {
        return evaluate(board);
    }
    if let Some(score) = terminal_score(board, &engine.position_history, ply) {
        return score;
    }

    let stand_pat = evaluate(board);
    if stand_pat >= beta {
        return beta;
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }
    if stand_pat + DELTA_MARGIN < alpha {
        return alpha;
    }

    let captures = order_captures(board);
    for scored in &captures {
        let new_board = board.make_move_new(scored.mv);
        let score = -quiescence(engine, &new_board, ply + 1, q_depth + 1, -beta, -alpha);

        if score >= beta {
            return beta;
        }
        if score > alpha {
            alpha = score;
        }
    }

    alpha
}

/// Walk the TT's best-move chain from `board` out to `max_moves` plies, stopping at a missing
/// entry, an illegal (stale/collided) TT move, or a repeated position (§4.6.1 step e).
fn extract_pv(board: &Board, tt: &mut TranspositionTable, max_moves: usize) -> Vec<ChessMove> {
    let mut pv = Vec::new();
    let mut current = *board;
    let mut seen: Vec<u64> = Vec::new();

    for _ in 0..max_moves {
        let hash = current.get_hash();
        if seen.contains(&hash) {
            break;
        }
        seen.push(hash);

        let Some(entry) = tt.probe(hash, 0) else {
            break;
        };
        let Some(mv) = entry.best_move else {
            break;
        };
        if !current.legal(mv) {
            break;
        }
        pv.push(mv);
        current = current.make_move_new(mv);
    }

    pv
}
