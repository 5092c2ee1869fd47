use arrayvec::ArrayVec;
use crate::board::{BitBoard, Board, ChessMove, MoveGen, Piece, EMPTY};

use crate::pst::MVV_VALUE;
use crate::types::Score;

pub struct ScoredMove {
    pub mv: ChessMove,
    pub score: Score,
}

/// Generates and orders moves for position.
/// Priority: (1) Hash move, (2) Captures by MVV-LVA, (3) Remaining quiet moves (promotions get a
/// bonus in either pass).
pub fn order_moves(board: &Board, hash_move: Option<ChessMove>) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();

    let mut movegen = MoveGen::new_legal(board);

    // First pass: captures (pieces on enemy squares)
    let targets = board.color_combined(!board.side_to_move());
    movegen.set_iterator_mask(targets);

    for mv in &mut movegen {
        let score = if Some(mv) == hash_move {
            100_000
        } else {
            let mut s: Score = 10_000; // Base capture bonus (above all quiet moves)
            if let Some(victim) = board.piece_on(mv.get_dest()) {
                let victim_idx = piece_to_index(victim);
                let attacker = board.piece_on(mv.get_source()).unwrap();
                let attacker_idx = piece_to_index(attacker);
                // MVV-LVA: high victim value ...  low attacker index = good capture
                s += MVV_VALUE[victim_idx] * 10 - MVV_VALUE[attacker_idx];
            }
            if mv.get_promotion().is_some() {
                s += 9000;
            }
            s
        };
        scored.push(ScoredMove { mv, score });
    }

    // Second pass: en passant captures (destination square is empty, so missed above)
    if let Some(ep_sq) = board.en_passant() {
        movegen.set_iterator_mask(BitBoard::from_square(ep_sq));
        for mv in &mut movegen {
            let score = if Some(mv) == hash_move {
                100_000
            } else {
                // Pawn captures pawn via en passant
                10_000 + MVV_VALUE[0] * 10
            };
            scored.push(ScoredMove { mv, score });
        }
    }

    // Third pass: quiet moves
    movegen.set_iterator_mask(!EMPTY);
    for mv in &mut movegen {
        let score = if Some(mv) == hash_move {
            100_000
        } else if mv.get_promotion().is_some() {
            9000
        } else {
            0
        };
        scored.push(ScoredMove { mv, score });
    }

    scored.sort_unstable_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Generates only capture moves for quiescence search, ordered by MVV-LVA.
pub fn order_captures(board: &Board) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();

    let mut movegen = MoveGen::new_legal(board);
    let targets = board.color_combined(!board.side_to_move());
    movegen.set_iterator_mask(targets);

    for mv in &mut movegen {
        let mut score: Score = 0;
        if let Some(victim) = board.piece_on(mv.get_dest()) {
            let victim_idx = piece_to_index(victim);
            let attacker = board.piece_on(mv.get_source()).unwrap();
            let attacker_idx = piece_to_index(attacker);
            score = MVV_VALUE[victim_idx] * 10 - MVV_VALUE[attacker_idx];
        }
        if mv.get_promotion().is_some() {
            score += 9000;
        }
        scored.push(ScoredMove { mv, score });
    }

    // En passant captures (destination square is empty, so missed above)
    if let Some(ep_sq) = board.en_passant() {
        movegen.set_iterator_mask(BitBoard::from_square(ep_sq));
        for mv in &mut movegen {
            // Pawn captures pawn via en passant
            let score = MVV_VALUE[0] * 10;
            scored.push(ScoredMove { mv, score });
        }
    }

    scored.sort_unstable_by(|a, b| b.score.cmp(&a.score));
    scored
}

fn piece_to_index(piece: Piece) -> usize {
    match piece {
        Piece::Pawn => 0,
        Piece::Knight => 1,
        Piece::Bishop => 2,
        Piece::Rook => 3,
        Piece::Queen => 4,
        Piece::King => 5,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, Square};
    use std::str::FromStr;

    #[test]
    fn test_hash_move_sorts_first() {
        let board = Board::default();
        let hash_move = ChessMove::new(Square::new(12), Square::new(28), None); // e2e4
        let scored = order_moves(&board, Some(hash_move));
        assert_eq!(scored[0].mv, hash_move);
        assert_eq!(scored[0].score, 100_000);
    }

    #[test]
    fn test_captures_score_above_quiets() {
        let board =
            Board::from_str("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2").unwrap();
        let scored = order_moves(&board, None);
        let capture = scored.iter().find(|sm| board.piece_on(sm.mv.get_dest()).is_some());
        let quiet = scored.iter().find(|sm| board.piece_on(sm.mv.get_dest()).is_none());
        if let (Some(capture), Some(quiet)) = (capture, quiet) {
            assert!(capture.score > quiet.score);
        }
    }

    #[test]
    fn test_mvv_lva_uses_attacker_value_not_piece_index() {
        // Knight on c4 and bishop on c3 can both capture the rook on e5. Knight and bishop share
        // the same MVV_VALUE (3), so their captures must score identically -- they would differ
        // if the attacker term used the piece's kind index (1 vs 2) instead of its MVV_VALUE.
        let board = Board::from_str("6k1/8/8/4r3/2N5/2B5/8/6K1 w - - 0 1").unwrap();
        let captures = order_captures(&board);
        let knight_capture = captures
            .iter()
            .find(|sm| sm.mv.get_source().to_string() == "c4")
            .expect("knight capture of e5 must be present");
        let bishop_capture = captures
            .iter()
            .find(|sm| sm.mv.get_source().to_string() == "c3")
            .expect("bishop capture of e5 must be present");
        assert_eq!(knight_capture.score, bishop_capture.score);
    }

    #[test]
    fn test_order_captures_only_returns_captures() {
        let board =
            Board::from_str("rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2").unwrap();
        let captures = order_captures(&board);
        for sm in &captures {
            assert!(
                board.piece_on(sm.mv.get_dest()).is_some() || board.en_passant() == Some(sm.mv.get_dest()),
                "order_captures must only emit captures"
            );
        }
    }
}

// Priority order:
// 1. Hash move (from TT) — the move that was best last time we searched this position (100,000)
// 2. Captures by MVV-LVA — Most Valuable Victim, Least Valuable Attacker (10,000+)
// 3. Promotions (+9,000 bonus)
// 4. Remaining quiet moves (0)
