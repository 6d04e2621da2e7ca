use log::{info, warn};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use sanchess::board::{Board, GameStatus};
use serde::Serialize;

const DEFAULT_MAX_PLIES: u32 = 200;

#[derive(Serialize)]
struct GameRecord {
    seed: u64,
    plies: u32,
    status: GameStatus,
    material: i32,
    moves: Vec<String>,
}

/// Plays random legal moves from the starting position and prints the game
/// as JSON. Usage: `selfplay [max_plies] [seed]`.
fn main() -> anyhow::Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let max_plies = match args.next() {
        Some(arg) => arg.parse()?,
        None => DEFAULT_MAX_PLIES,
    };
    let seed = match args.next() {
        Some(arg) => arg.parse()?,
        None => rand::random(),
    };
    let mut rng = StdRng::seed_from_u64(seed);

    let mut board = Board::new();
    while !board.is_game_over() && board.ply() < max_plies {
        let moves = board.legal_moves(board.side_to_move())?;
        let Some(mv) = moves.choose(&mut rng) else {
            warn!("{} has no legal moves at ply {}", board.side_to_move(), board.ply());
            break;
        };
        board.apply_move(&mv.to_string())?;
    }

    info!("stopped after {} plies: {:?}", board.ply(), board.status());
    let record = GameRecord {
        seed,
        plies: board.ply(),
        status: board.status(),
        material: board.material(),
        moves: board.history().iter().map(|m| m.to_string()).collect(),
    };
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}
