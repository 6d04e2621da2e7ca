use std::fmt;

use serde::{Deserialize, Serialize};

use crate::board::GameStatus;
use crate::coords::Square;
use crate::error::Result;
use crate::moves::Move;
use crate::position::Position;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Side to move at the given ply. White moves on even plies.
    pub fn from_ply(ply: u32) -> Color {
        if ply % 2 == 0 {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Rank the pieces of this colour start on.
    pub fn home_rank(self) -> u8 {
        match self {
            Color::White => 1,
            Color::Black => 8,
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::White => f.write_str("white"),
            Color::Black => f.write_str("black"),
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum PieceType {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

/// Promotion choices, in the order they are offered.
pub const PROMOTIONS: [PieceType; 4] = [
    PieceType::Queen,
    PieceType::Rook,
    PieceType::Bishop,
    PieceType::Knight,
];

impl PieceType {
    /// SAN letter. Pawns have none.
    pub fn san_letter(self) -> &'static str {
        match self {
            PieceType::Pawn => "",
            PieceType::Knight => "N",
            PieceType::Bishop => "B",
            PieceType::Rook => "R",
            PieceType::Queen => "Q",
            PieceType::King => "K",
        }
    }

    pub fn from_letter(letter: char) -> Option<PieceType> {
        match letter {
            'N' => Some(PieceType::Knight),
            'B' => Some(PieceType::Bishop),
            'R' => Some(PieceType::Rook),
            'Q' => Some(PieceType::Queen),
            'K' => Some(PieceType::King),
            _ => None,
        }
    }

    /// Material value in pawns. The king counts for nothing.
    pub fn value(self) -> i32 {
        match self {
            PieceType::Pawn => 1,
            PieceType::Knight => 3,
            PieceType::Bishop => 3,
            PieceType::Rook => 5,
            PieceType::Queen => 9,
            PieceType::King => 0,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Piece {
    pub piece_type: PieceType,
    pub color: Color,
    pub square: Square,
    /// Number of times this piece has moved.
    pub move_counter: u32,
}

impl Piece {
    pub fn new(piece_type: PieceType, color: Color, square: Square) -> Self {
        Piece {
            piece_type,
            color,
            square,
            move_counter: 0,
        }
    }

    /// Legal moves of this piece in `position`, each carrying its `+`/`#`
    /// suffix. Disambiguation against sibling pieces is left to the board,
    /// which sees every piece's list at once.
    pub fn compute_legal_moves(
        &self,
        position: &Position,
        status: GameStatus,
    ) -> Result<Vec<Move>> {
        if status.is_over() {
            return Ok(Vec::new());
        }

        let in_check = position.is_in_check(self.color)?;
        let mut moves = Vec::new();

        for vision in position.vision(self) {
            if !position.is_legal_destination(self, &vision, in_check)? {
                continue;
            }
            let base = Move::from_vision(self, &vision);

            let promotes = self.piece_type == PieceType::Pawn
                && vision.square.rank() == self.color.opposite().home_rank();
            if promotes {
                for pt in PROMOTIONS {
                    let mv = base.clone().with_promotion(pt);
                    let (check, mate) =
                        position.is_enemy_king_checkmated_after_move(self.square, &mv)?;
                    moves.push(mv.annotated(check, mate));
                }
            } else {
                let (check, mate) =
                    position.is_enemy_king_checkmated_after_move(self.square, &base)?;
                moves.push(base.annotated(check, mate));
            }
        }

        Ok(moves)
    }
}
