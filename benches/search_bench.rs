use std::str::FromStr;
use crate_chess_engine::board::{Board, MoveGen};
use crate_chess_engine::config::EngineConfig;
use crate_chess_engine::engine::Engine;
use crate_chess_engine::search::search_root;
use criterion::{criterion_group, criterion_main, Criterion};

fn bench_search(c: &mut Criterion) {
    crate_chess_engine::board::init();
    let board = Board::default();

    c.bench_function("search_depth_3_startpos", |b| {
        b.iter(|| {
            let mut engine = Engine::new(EngineConfig::default());
            search_root(&mut engine, &board, 3, None)
        })
    });

    let kiwipete = Board::from_str(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
    ).unwrap();

    c.bench_function("search_depth_3_kiwipete", |b| {
        b.iter(|| {
            let mut engine = Engine::new(EngineConfig::default());
            search_root(&mut engine, &kiwipete, 3, None)
        })
    });

    c.bench_function("search_depth_4_startpos", |b| {
        b.iter(|| {
            let mut engine = Engine::new(EngineConfig::default());
            search_root(&mut engine, &board, 4, None)
        })
    });
}

fn bench_movegen(c: &mut Criterion) {
    crate_chess_engine::board::init();
    let board = Board::default();
    c.bench_function("movegen_startpos", |b| {
        b.iter(|| { let moves: Vec<_> = MoveGen::new_legal(&board).collect(); moves.len() })
    });

    let kiwipete = Board::from_str(
        "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 0 1"
    ).unwrap();
    c.bench_function("movegen_kiwipete", |b| {
        b.iter(|| { let moves: Vec<_> = MoveGen::new_legal(&kiwipete).collect(); moves.len() })
    });
}

criterion_group!(benches, bench_search, bench_movegen);
criterion_main!(benches);
