pub mod board;
pub mod coords;
pub mod error;
pub mod moves;
pub mod piece;
pub mod position;
pub mod snapshot;

#[cfg(target_arch = "wasm32")]
mod wasm_api;

pub use board::{Board, GameStatus, MoveOutcome};
pub use coords::Square;
pub use error::ChessError;
pub use moves::Move;
pub use piece::{Color, Piece, PieceType};
