use crate::board::{BitBoard, Board, BoardStatus, Color, File, MoveGen, Piece, Rank, Square, ALL_SQUARES};

use crate::pst::{self, EG_TABLE, MG_TABLE, PHASE_WEIGHT, MAX_PHASE};
use crate::types::{Score, MATE};

const MATERIAL_VALUES: [Score; 6] = [100, 320, 330, 500, 900, 0];

const MOBILITY_WEIGHT: Score = 10;
const BISHOP_PAIR_BONUS: Score = 40;
const DOUBLED_PAWN_PENALTY: Score = 10;
const ISOLATED_PAWN_PENALTY: Score = 10;
const PASSED_PAWN_BONUS: [Score; 8] = [0, 10, 20, 30, 40, 50, 60, 70];
const KING_SHIELD_BONUS: Score = 5;
const ROOK_OPEN_FILE_BONUS: Score = 10;
const ROOK_SEMI_OPEN_FILE_BONUS: Score = 5;
const KING_SAFETY_PHASE_CUTOFF: i32 = 12;

/// Maps a Piece to our PST index (0-5)
fn piece_index(piece: Piece) -> usize {
    match piece {
        Piece::Pawn => pst::PAWN,
        Piece::Knight => pst::KNIGHT,
        Piece::Bishop => pst::BISHOP,
        Piece::Rook => pst::ROOK,
        Piece::Queen => pst::QUEEN,
        Piece::King => pst::KING,
    }
}

/// Converts a Square (A1=0, H8=63) to our PST index.
/// Tables are stored with a8=0, h1=63 (rank 8 first, rank 1 last).
/// For White: flip rank -> index = sq ^ 56 (maps rank 1->8, 2->7, etc.)
/// For Black: use square index directly (already mirrors White's perspective)
fn pst_index_white(sq: Square) -> usize {
    sq.to_index() ^ 56
}

fn pst_index_black(sq: Square) -> usize {
    sq.to_index()
}

/// Evaluates board position from the side-to-move's perspective.
pub fn evaluate(board: &Board) -> Score {
    match board.status() {
        BoardStatus::Checkmate => return -MATE,
        BoardStatus::Stalemate => return 0,
        BoardStatus::Ongoing => {}
    }
    if is_insufficient_material(board) {
        return 0;
    }

    let mut mg_score: [Score; 2] = [0, 0]; // [white, black]
    let mut eg_score: [Score; 2] = [0, 0];
    let mut material: [Score; 2] = [0, 0];
    let mut phase: i32 = 0;

    for sq in ALL_SQUARES {
        if let Some(piece) = board.piece_on(sq) {
            let color = board.color_on(sq).unwrap();
            let idx = piece_index(piece);
            let side = color.to_index();

            material[side] += MATERIAL_VALUES[idx];

            let pst_idx = if color == Color::White {
                pst_index_white(sq)
            } else {
                pst_index_black(sq)
            };
            mg_score[side] += MG_TABLE[idx][pst_idx];
            eg_score[side] += EG_TABLE[idx][pst_idx];

            phase += PHASE_WEIGHT[idx];
        }
    }
    if phase > MAX_PHASE {
        phase = MAX_PHASE;
    }

    let material_term = material[0] - material[1];
    let pst_term = pst::tapered_score(mg_score[0] - mg_score[1], eg_score[0] - eg_score[1], phase);
    let mobility_term = mobility(board) * MOBILITY_WEIGHT;
    let bishop_pair_term = bishop_pair(board);
    let pawn_term = pawn_structure(board);
    let king_safety_term = if phase > KING_SAFETY_PHASE_CUTOFF {
        king_safety(board)
    } else {
        0
    };
    let rook_term = rook_placement(board);

    let score = material_term
        + pst_term
        + mobility_term
        + bishop_pair_term
        + pawn_term
        + king_safety_term
        + rook_term;

    if board.side_to_move() == Color::White {
        score
    } else {
        -score
    }
}

/// King-vs-king, king+minor-vs-king, or same-colored-bishop endgames: no side can force mate.
pub(crate) fn is_insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() {
        return false;
    }

    let minors = board.pieces(Piece::Knight) | board.pieces(Piece::Bishop);
    let white_minors = minors & board.color_combined(Color::White);
    let black_minors = minors & board.color_combined(Color::Black);
    let white_count = white_minors.popcnt();
    let black_count = black_minors.popcnt();

    if white_count == 0 && black_count == 0 {
        return true;
    }
    if white_count + black_count == 1 {
        return true;
    }
    if white_count == 1 && black_count == 1 {
        let white_bishop = board.pieces(Piece::Bishop) & board.color_combined(Color::White);
        let black_bishop = board.pieces(Piece::Bishop) & board.color_combined(Color::Black);
        if let (Some(w), Some(b)) = (white_bishop.iter().next(), black_bishop.iter().next()) {
            let w_square_color = (w.file().to_index() + w.rank().to_index()) % 2;
            let b_square_color = (b.file().to_index() + b.rank().to_index()) % 2;
            return w_square_color == b_square_color;
        }
    }
    false
}

/// Legal-move-count difference, computed without mutating the real position: a side-flipped
/// scratch copy is cheap since `Board` is `Copy`.
fn mobility(board: &Board) -> Score {
    let (white_board, black_board) = if board.side_to_move() == Color::White {
        (*board, board.flip_side_to_move())
    } else {
        (board.flip_side_to_move(), *board)
    };
    let white_moves = MoveGen::new_legal(&white_board).count() as Score;
    let black_moves = MoveGen::new_legal(&black_board).count() as Score;
    white_moves - black_moves
}

fn bishop_pair(board: &Board) -> Score {
    let bishops = board.pieces(Piece::Bishop);
    let mut score = 0;
    if (bishops & board.color_combined(Color::White)).popcnt() >= 2 {
        score += BISHOP_PAIR_BONUS;
    }
    if (bishops & board.color_combined(Color::Black)).popcnt() >= 2 {
        score -= BISHOP_PAIR_BONUS;
    }
    score
}

/// Doubled, isolated, and passed pawns, one per-file pawn-count pass per color.
fn pawn_structure(board: &Board) -> Score {
    let mut score = 0;

    for color in [Color::White, Color::Black] {
        let sign: Score = if color == Color::White { 1 } else { -1 };
        let pawns = board.pieces(Piece::Pawn) & board.color_combined(color);
        let enemy_pawns = board.pieces(Piece::Pawn) & board.color_combined(!color);

        let mut files = [0u8; 8];
        for sq in pawns.iter() {
            files[sq.file().to_index()] += 1;
        }

        for &count in files.iter() {
            if count > 1 {
                score -= sign * DOUBLED_PAWN_PENALTY * (count as Score - 1);
            }
        }

        for sq in pawns.iter() {
            let file = sq.file().to_index();
            let rank = sq.rank().to_index();

            let left = if file > 0 { files[file - 1] } else { 0 };
            let right = if file < 7 { files[file + 1] } else { 0 };
            if left == 0 && right == 0 {
                score -= sign * ISOLATED_PAWN_PENALTY;
            }

            let lo = file.saturating_sub(1);
            let hi = (file + 1).min(7);
            let mut blocked = false;
            for esq in enemy_pawns.iter() {
                let efile = esq.file().to_index();
                if efile < lo || efile > hi {
                    continue;
                }
                let erank = esq.rank().to_index();
                let ahead = if color == Color::White { erank > rank } else { erank < rank };
                if ahead {
                    blocked = true;
                    break;
                }
            }
            if !blocked {
                let bonus_rank = if color == Color::White { rank } else { 7 - rank };
                score += sign * PASSED_PAWN_BONUS[bonus_rank.min(7)];
            }
        }
    }

    score
}

/// Friendly pawns on the king's file and adjacent files, one or two ranks ahead.
fn king_safety(board: &Board) -> Score {
    let mut score = 0;

    for color in [Color::White, Color::Black] {
        let sign: Score = if color == Color::White { 1 } else { -1 };
        let king_bb = board.pieces(Piece::King) & board.color_combined(color);
        let Some(king_sq) = king_bb.iter().next() else {
            continue;
        };
        let king_file = king_sq.file().to_index() as i32;
        let king_rank = king_sq.rank().to_index() as i32;
        let friendly_pawns = board.pieces(Piece::Pawn) & board.color_combined(color);

        let mut shield = 0;
        for file_offset in -1..=1i32 {
            let f = king_file + file_offset;
            if !(0..8).contains(&f) {
                continue;
            }
            for rank_offset in 1..=2i32 {
                let r = if color == Color::White {
                    king_rank + rank_offset
                } else {
                    king_rank - rank_offset
                };
                if !(0..8).contains(&r) {
                    continue;
                }
                let sq = Square::make_square(Rank::from_index(r as usize), File::from_index(f as usize));
                if !(friendly_pawns & BitBoard::from_square(sq)).is_empty() {
                    shield += 1;
                }
            }
        }
        score += sign * shield * KING_SHIELD_BONUS;
    }

    score
}

fn file_has_pawns(pawns: BitBoard, file: usize) -> bool {
    (0..8).any(|r| !(pawns & BitBoard::from_square(Square::make_square(Rank::from_index(r), File::from_index(file)))).is_empty())
}

fn rook_placement(board: &Board) -> Score {
    let mut score = 0;

    for color in [Color::White, Color::Black] {
        let sign: Score = if color == Color::White { 1 } else { -1 };
        let rooks = board.pieces(Piece::Rook) & board.color_combined(color);
        let friendly_pawns = board.pieces(Piece::Pawn) & board.color_combined(color);
        let enemy_pawns = board.pieces(Piece::Pawn) & board.color_combined(!color);

        for rook_sq in rooks.iter() {
            let file = rook_sq.file().to_index();
            let has_friendly = file_has_pawns(friendly_pawns, file);
            let has_enemy = file_has_pawns(enemy_pawns, file);
            if !has_friendly && !has_enemy {
                score += sign * ROOK_OPEN_FILE_BONUS;
            } else if !has_friendly {
                score += sign * ROOK_SEMI_OPEN_FILE_BONUS;
            }
        }
    }

    score
}


// tapered evals -> compute separate midgame and endgame scores, blend them based on how much
// material is left ("game phase")
//
// With all pieces on board, phase=24 (full midgame). Phase decreases toward 0 as pieces are
// traded. Score blends: (mg_score * phase + eg_score * (24 - phase)) / 24 -> king safe in
// midgame, active in endgame.
