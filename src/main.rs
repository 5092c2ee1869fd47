fn main() {
    crate_chess_engine::board::init();
    crate_chess_engine::uci::run();
}
