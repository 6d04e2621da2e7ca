use serde::Serialize;

use crate::board::{Board, GameStatus};
use crate::coords::Square;
use crate::error::Result;
use crate::piece::{Color, PieceType};

#[derive(Serialize, Clone, Copy, PartialEq, Debug)]
pub struct SquarePiece {
    pub piece_type: PieceType,
    pub color: Color,
    pub move_counter: u32,
}

/// Serializable view of a board for front ends.
///
/// `squares` is in image orientation: `squares[0]` is rank 1 and
/// `squares[r][0]` is the a-file.
#[derive(Serialize, Clone, Debug)]
pub struct BoardSnapshot {
    pub squares: Vec<Vec<Option<SquarePiece>>>,
    pub side_to_move: Color,
    pub ply: u32,
    pub status: GameStatus,
    pub in_check: bool,
    pub legal_moves: Vec<String>,
    pub history: Vec<String>,
    pub material: i32,
}

impl BoardSnapshot {
    pub fn from_board(board: &Board) -> Result<Self> {
        let mut squares = vec![vec![None; 8]; 8];
        for piece in board.pieces() {
            let (row, col) = piece.square.to_image();
            squares[row][col] = Some(SquarePiece {
                piece_type: piece.piece_type,
                color: piece.color,
                move_counter: piece.move_counter,
            });
        }

        let side = board.side_to_move();
        Ok(BoardSnapshot {
            squares,
            side_to_move: side,
            ply: board.ply(),
            status: board.status(),
            in_check: board.is_in_check(side)?,
            legal_moves: board.legal_moves(side)?.iter().map(|m| m.to_string()).collect(),
            history: board.history().iter().map(|m| m.to_string()).collect(),
            material: board.material(),
        })
    }

    pub fn piece_at(&self, square: Square) -> Option<SquarePiece> {
        let (row, col) = square.to_image();
        self.squares[row][col]
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}
