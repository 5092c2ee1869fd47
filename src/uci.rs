use std::io::{self, BufRead};
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crate::board::{Board, ChessMove, Color, File, Piece, Rank, Square};
use crate::config::EngineConfig;
use crate::engine::{Engine, TimeControl};

/// Line-oriented UCI loop (§6.1). Reads commands from stdin, dispatches `go` onto a worker
/// thread so `stop` arriving on this thread can preempt it, writes `bestmove`/`info`/`id` lines
/// to stdout.
pub fn run() {
    let stdin = io::stdin();

    let mut board = Board::default();
    let mut engine: Option<Engine> = Some(Engine::new(EngineConfig::load("engine.conf")));
    let mut stop_flag: Arc<AtomicBool> = Arc::new(AtomicBool::new(false));
    let mut search_thread: Option<thread::JoinHandle<Engine>> = None;
    let mut position_history: Vec<u64> = Vec::new();

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(_) => break,
        };
        let line = line.trim().to_string();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            continue;
        }

        match tokens[0] {
            "uci" => {
                println!("id name crate-chess-engine");
                println!("id author engine contributors");
                println!("option name Hash type spin default 128 min 16 max 1024");
                println!("uciok");
            }
            "isready" => {
                wait_for_search(&mut search_thread, &mut engine);
                println!("readyok");
            }
            "ucinewgame" => {
                wait_for_search(&mut search_thread, &mut engine);
                board = Board::default();
                position_history.clear();
                if let Some(ref mut e) = engine {
                    e.new_game();
                }
            }
            "position" => {
                wait_for_search(&mut search_thread, &mut engine);
                parse_position(&tokens, &mut board, &mut position_history);
            }
            "go" => {
                wait_for_search(&mut search_thread, &mut engine);

                let (tc, depth_override) = parse_go(&tokens, board.side_to_move());

                let mut e = engine.take().expect("engine missing between searches");
                if let Some(d) = depth_override {
                    e.config.max_depth = d;
                }
                e.position_history = position_history.clone();

                let flag = Arc::new(AtomicBool::new(false));
                stop_flag = flag.clone();
                e.stop = flag;

                let board_copy = board;

                search_thread = Some(thread::spawn(move || {
                    match e.choose_move(&board_copy, tc) {
                        Ok(result) => match result.best_move {
                            Some(mv) => println!("bestmove {}", mv),
                            None => println!("bestmove 0000"),
                        },
                        Err(_) => println!("bestmove 0000"),
                    }
                    e
                }));
            }
            "stop" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut engine);
            }
            "setoption" => {
                wait_for_search(&mut search_thread, &mut engine);
                if let Some(ref mut e) = engine {
                    parse_setoption(&tokens, e);
                }
            }
            "quit" => {
                stop_flag.store(true, Ordering::SeqCst);
                wait_for_search(&mut search_thread, &mut engine);
                break;
            }
            "d" | "print" => {
                println!("{}", board);
            }
            other => {
                println!("# Unknown command: {}", other);
            }
        }
    }
}

/// Wait for a running search thread to finish and recover the `Engine` it owns.
fn wait_for_search(handle: &mut Option<thread::JoinHandle<Engine>>, slot: &mut Option<Engine>) {
    if let Some(h) = handle.take() {
        match h.join() {
            Ok(e) => *slot = Some(e),
            Err(_) => {
                // Search thread panicked: the TT contents are unrecoverable, start over.
                *slot = Some(Engine::new(EngineConfig::default()));
            }
        }
    }
}

/// Parse a `go` command into a `TimeControl` and an optional explicit-depth override. An explicit
/// `depth N` does not feed `TimeControl` (the budget formula never sees it, §4.7) — it instead
/// temporarily raises or lowers `Engine::config.max_depth` for this one search.
fn parse_go(tokens: &[&str], side: Color) -> (TimeControl, Option<u8>) {
    let mut tc = TimeControl::default();
    let mut depth = None;
    let mut i = 1;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                if i < tokens.len() {
                    depth = tokens[i].parse().ok();
                }
            }
            "movetime" => {
                i += 1;
                if i < tokens.len() {
                    tc.movetime_ms = tokens[i].parse().ok();
                }
            }
            "wtime" => {
                i += 1;
                if i < tokens.len() {
                    let v = tokens[i].parse().ok();
                    if side == Color::White {
                        tc.our_time_ms = v;
                    }
                }
            }
            "btime" => {
                i += 1;
                if i < tokens.len() {
                    let v = tokens[i].parse().ok();
                    if side == Color::Black {
                        tc.our_time_ms = v;
                    }
                }
            }
            "winc" => {
                i += 1;
                if i < tokens.len() {
                    let v = tokens[i].parse().ok();
                    if side == Color::White {
                        tc.our_inc_ms = v;
                    }
                }
            }
            "binc" => {
                i += 1;
                if i < tokens.len() {
                    let v = tokens[i].parse().ok();
                    if side == Color::Black {
                        tc.our_inc_ms = v;
                    }
                }
            }
            "movestogo" => {
                i += 1;
                if i < tokens.len() {
                    tc.movestogo = tokens[i].parse().ok();
                }
            }
            "infinite" => {
                tc.infinite = true;
            }
            _ => {}
        }
        i += 1;
    }

    (tc, depth)
}

fn parse_position(tokens: &[&str], board: &mut Board, history: &mut Vec<u64>) {
    if tokens.len() < 2 {
        return;
    }

    let mut idx = 1;

    if tokens[idx] == "startpos" {
        *board = Board::default();
        idx += 1;
    } else if tokens[idx] == "fen" {
        idx += 1;
        let mut fen_parts: Vec<&str> = Vec::new();
        while idx < tokens.len() && tokens[idx] != "moves" && fen_parts.len() < 6 {
            fen_parts.push(tokens[idx]);
            idx += 1;
        }
        if fen_parts.len() >= 4 {
            let fen_str = fen_parts.join(" ");
            match Board::from_str(&fen_str) {
                Ok(b) => *board = b,
                Err(_) => return,
            }
        } else {
            return;
        }
    } else {
        return;
    }

    history.clear();
    history.push(board.get_hash());

    if idx < tokens.len() && tokens[idx] == "moves" {
        idx += 1;
        for &move_str in &tokens[idx..] {
            if let Some(m) = parse_uci_move(board, move_str) {
                *board = board.make_move_new(m);
                history.push(board.get_hash());
            }
        }
    }
}

/// Parse a UCI move string directly into squares + optional promotion piece. Zero heap
/// allocations (no move generation/string comparison).
fn parse_uci_move(board: &Board, move_str: &str) -> Option<ChessMove> {
    if move_str.len() < 4 {
        return None;
    }
    let bytes = move_str.as_bytes();

    let src_file = bytes[0].wrapping_sub(b'a');
    let src_rank = bytes[1].wrapping_sub(b'1');
    let dst_file = bytes[2].wrapping_sub(b'a');
    let dst_rank = bytes[3].wrapping_sub(b'1');

    if src_file >= 8 || src_rank >= 8 || dst_file >= 8 || dst_rank >= 8 {
        return None;
    }

    let src = Square::make_square(Rank::from_index(src_rank as usize), File::from_index(src_file as usize));
    let dst = Square::make_square(Rank::from_index(dst_rank as usize), File::from_index(dst_file as usize));

    let promo = if move_str.len() >= 5 {
        match bytes[4] {
            b'q' => Some(Piece::Queen),
            b'r' => Some(Piece::Rook),
            b'b' => Some(Piece::Bishop),
            b'n' => Some(Piece::Knight),
            _ => None,
        }
    } else {
        None
    };

    let mv = ChessMove::new(src, dst, promo);
    if board.legal(mv) {
        Some(mv)
    } else {
        None
    }
}

fn parse_setoption(tokens: &[&str], engine: &mut Engine) {
    let name_idx = tokens.iter().position(|&t| t == "name");
    let value_idx = tokens.iter().position(|&t| t == "value");

    if let (Some(ni), Some(vi)) = (name_idx, value_idx) {
        let name: String = tokens[ni + 1..vi].join(" ");
        let value: String = tokens[vi + 1..].join(" ");

        if name.eq_ignore_ascii_case("hash") {
            if let Ok(mb) = value.parse::<usize>() {
                engine.resize_hash(mb.clamp(1, 4096));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_position_startpos() {
        let mut board = Board::default();
        let mut history = Vec::new();
        let tokens = vec!["position", "startpos"];
        parse_position(&tokens, &mut board, &mut history);
        assert_eq!(board, Board::default());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_parse_position_startpos_with_moves() {
        let mut board = Board::default();
        let mut history = Vec::new();
        let tokens = vec!["position", "startpos", "moves", "e2e4", "e7e5"];
        parse_position(&tokens, &mut board, &mut history);
        assert_ne!(board, Board::default());
        assert_eq!(history.len(), 3);
    }

    #[test]
    fn test_parse_position_fen() {
        let mut board = Board::default();
        let mut history = Vec::new();
        let tokens = vec![
            "position", "fen",
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR",
            "b", "KQkq", "e3", "0", "1",
        ];
        parse_position(&tokens, &mut board, &mut history);
        assert_ne!(board, Board::default());
        assert_eq!(history.len(), 1);
    }

    #[test]
    fn test_parse_go_depth() {
        let (_, depth) = parse_go(&["go", "depth", "6"], Color::White);
        assert_eq!(depth, Some(6));
    }

    #[test]
    fn test_parse_go_time_assigns_own_clock_only() {
        let (tc, _) = parse_go(
            &["go", "wtime", "60000", "btime", "50000", "winc", "1000", "binc", "500"],
            Color::White,
        );
        assert_eq!(tc.our_time_ms, Some(60000));
        assert_eq!(tc.our_inc_ms, Some(1000));

        let (tc, _) = parse_go(
            &["go", "wtime", "60000", "btime", "50000", "winc", "1000", "binc", "500"],
            Color::Black,
        );
        assert_eq!(tc.our_time_ms, Some(50000));
        assert_eq!(tc.our_inc_ms, Some(500));
    }

    #[test]
    fn test_parse_go_infinite() {
        let (tc, _) = parse_go(&["go", "infinite"], Color::White);
        assert!(tc.infinite);
    }

    #[test]
    fn test_parse_setoption_hash() {
        let mut engine = Engine::new(EngineConfig::default());
        let tokens = vec!["setoption", "name", "Hash", "value", "16"];
        parse_setoption(&tokens, &mut engine);
        assert_eq!(engine.config.tt_mb, 16);
    }

    #[test]
    fn test_parse_uci_move_basic() {
        let board = Board::default();
        let mv = parse_uci_move(&board, "e2e4");
        assert!(mv.is_some(), "e2e4 should be a legal move from startpos");
    }

    #[test]
    fn test_parse_uci_move_invalid() {
        let board = Board::default();
        let mv = parse_uci_move(&board, "e2e5");
        assert!(mv.is_none(), "e2e5 should not be legal from startpos");
    }

    #[test]
    fn test_parse_uci_move_promotion() {
        let board = Board::from_str("8/P7/8/8/8/8/8/K6k w - - 0 1").unwrap();
        let mv = parse_uci_move(&board, "a7a8q");
        assert!(mv.is_some(), "a7a8q should be a legal promotion");
        assert_eq!(mv.unwrap().get_promotion(), Some(Piece::Queen));
    }

    #[test]
    fn test_position_history_tracking() {
        let mut board = Board::default();
        let mut history = Vec::new();
        let tokens = vec!["position", "startpos", "moves", "g1f3", "g8f6", "f3g1", "f6g8"];
        parse_position(&tokens, &mut board, &mut history);
        assert_eq!(history.len(), 5);
        assert_eq!(history[0], history[4], "Position after Nf3 Nf6 Ng1 Ng8 should repeat startpos");
    }
}
