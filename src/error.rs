use thiserror::Error;

use crate::piece::Color;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChessError {
    /// The token matches no legal move of the side to move. Malformed SAN
    /// lands here too.
    #[error("invalid move: {0}")]
    InvalidMove(String),
    #[error("game already ended")]
    GameAlreadyEnded,
    /// A check test needs the king of this colour and the position has none.
    #[error("no {0} king on the board")]
    MissingKing(Color),
    #[error("invalid square: {0}")]
    InvalidSquare(String),
}

pub type Result<T> = std::result::Result<T, ChessError>;
