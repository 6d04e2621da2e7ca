use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::coords::{Square, FILES};
use crate::error::ChessError;
use crate::piece::{Piece, PieceType};
use crate::position::Vision;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
pub enum CastleSide {
    KingSide,
    QueenSide,
}

impl CastleSide {
    /// Recognises a king step from its home e-file to the g or c file.
    pub fn from_king_step(from: Square, to: Square) -> Option<CastleSide> {
        if from.file() != 'e' || from.rank() != to.rank() {
            return None;
        }
        match to.file() {
            'g' => Some(CastleSide::KingSide),
            'c' => Some(CastleSide::QueenSide),
            _ => None,
        }
    }

    pub fn king_file(self) -> char {
        match self {
            CastleSide::KingSide => 'g',
            CastleSide::QueenSide => 'c',
        }
    }

    pub fn rook_file(self) -> char {
        match self {
            CastleSide::KingSide => 'h',
            CastleSide::QueenSide => 'a',
        }
    }

    /// File the rook lands on, which is also the square the king passes over.
    pub fn rook_target_file(self) -> char {
        match self {
            CastleSide::KingSide => 'f',
            CastleSide::QueenSide => 'd',
        }
    }

    pub fn san(self) -> &'static str {
        match self {
            CastleSide::KingSide => "O-O",
            CastleSide::QueenSide => "O-O-O",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug, Default)]
pub enum Annotation {
    #[default]
    Plain,
    Check,
    Checkmate,
}

impl Annotation {
    fn suffix(self) -> &'static str {
        match self {
            Annotation::Plain => "",
            Annotation::Check => "+",
            Annotation::Checkmate => "#",
        }
    }
}

/// Markers carried by a move's SAN, reported back when it is applied.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct MoveFlags {
    pub capture: bool,
    pub check: bool,
    pub checkmate: bool,
}

/// A move in Standard Algebraic Notation.
///
/// Identity is structural: two moves are equal when they name the same piece
/// type, disambiguator, destination, promotion and castle side. The capture
/// marker and the check suffix are presentation only, so a typed `Qh4`
/// finds the generated `Qh4#`.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Move {
    pub piece_type: PieceType,
    /// Origin file. Pawn captures always carry it; other pieces only when a
    /// sibling could reach the same square.
    pub from_file: Option<char>,
    pub from_rank: Option<u8>,
    pub capture: bool,
    /// `None` for castling.
    pub to: Option<Square>,
    pub promotion: Option<PieceType>,
    pub castle: Option<CastleSide>,
    pub annotation: Annotation,
}

impl Move {
    pub fn new(piece_type: PieceType, to: Square) -> Self {
        Move {
            piece_type,
            from_file: None,
            from_rank: None,
            capture: false,
            to: Some(to),
            promotion: None,
            castle: None,
            annotation: Annotation::Plain,
        }
    }

    pub fn castle(side: CastleSide) -> Self {
        Move {
            piece_type: PieceType::King,
            from_file: None,
            from_rank: None,
            capture: false,
            to: None,
            promotion: None,
            castle: Some(side),
            annotation: Annotation::Plain,
        }
    }

    /// The unannotated move that takes `piece` to a square of its vision.
    pub fn from_vision(piece: &Piece, vision: &Vision) -> Self {
        if piece.piece_type == PieceType::King {
            if let Some(side) = CastleSide::from_king_step(piece.square, vision.square) {
                return Move::castle(side);
            }
        }
        let mv = Move::new(piece.piece_type, vision.square);
        if vision.capture {
            mv.with_capture(piece.square)
        } else {
            mv
        }
    }

    /// Marks the move as a capture made from `from`. Pawn captures record
    /// the origin file, which SAN always writes for them.
    pub fn with_capture(mut self, from: Square) -> Self {
        if self.castle.is_none() {
            self.capture = true;
            if self.piece_type == PieceType::Pawn {
                self.from_file = Some(from.file());
            }
        }
        self
    }

    pub fn with_promotion(mut self, piece_type: PieceType) -> Self {
        if self.castle.is_none() {
            self.promotion = Some(piece_type);
        }
        self
    }

    /// Pins the origin file and/or rank. Castles and pawns ignore it; a pawn
    /// capture already names its file.
    pub fn with_disambiguation(mut self, file: Option<char>, rank: Option<u8>) -> Self {
        if self.castle.is_none() && self.piece_type != PieceType::Pawn {
            self.from_file = file;
            self.from_rank = rank;
        }
        self
    }

    pub fn with_annotation(mut self, annotation: Annotation) -> Self {
        self.annotation = annotation;
        self
    }

    pub fn annotated(self, check: bool, checkmate: bool) -> Self {
        let annotation = if checkmate {
            Annotation::Checkmate
        } else if check {
            Annotation::Check
        } else {
            Annotation::Plain
        };
        self.with_annotation(annotation)
    }

    pub fn destination(&self) -> Option<Square> {
        self.to
    }

    pub fn is_castle(&self) -> bool {
        self.castle.is_some()
    }

    pub fn flags(&self) -> MoveFlags {
        MoveFlags {
            capture: self.capture,
            check: self.annotation == Annotation::Check,
            checkmate: self.annotation == Annotation::Checkmate,
        }
    }

    /// Moves `piece` as this move says.
    ///
    /// Castling moves the king to the g/c file and the rook to the f/d file,
    /// so the board calls this once for each of the two pieces. A promotion
    /// swaps the piece type before relocating. Every call counts one move
    /// for the piece.
    pub fn apply_to(&self, piece: &mut Piece) -> MoveFlags {
        match self.castle {
            Some(side) => {
                let file = match piece.piece_type {
                    PieceType::King => Some(side.king_file()),
                    PieceType::Rook => Some(side.rook_target_file()),
                    _ => None,
                };
                if let Some(square) = file.and_then(|f| piece.square.with_file(f)) {
                    piece.square = square;
                }
            }
            None => {
                if let Some(promotion) = self.promotion {
                    piece.piece_type = promotion;
                }
                if let Some(to) = self.to {
                    piece.square = to;
                }
            }
        }
        piece.move_counter += 1;
        self.flags()
    }
}

impl PartialEq for Move {
    fn eq(&self, other: &Move) -> bool {
        self.piece_type == other.piece_type
            && self.from_file == other.from_file
            && self.from_rank == other.from_rank
            && self.to == other.to
            && self.promotion == other.promotion
            && self.castle == other.castle
    }
}

impl Eq for Move {}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(side) = self.castle {
            return write!(f, "{}{}", side.san(), self.annotation.suffix());
        }
        f.write_str(self.piece_type.san_letter())?;
        if let Some(file) = self.from_file {
            write!(f, "{file}")?;
        }
        if let Some(rank) = self.from_rank {
            write!(f, "{rank}")?;
        }
        if self.capture {
            f.write_str("x")?;
        }
        if let Some(to) = self.to {
            write!(f, "{to}")?;
        }
        if let Some(promotion) = self.promotion {
            write!(f, "={}", promotion.san_letter())?;
        }
        f.write_str(self.annotation.suffix())
    }
}

impl FromStr for Move {
    type Err = ChessError;

    /// Parses one SAN token such as `Nbd7`, `exd6`, `e8=Q+` or `O-O-O#`.
    fn from_str(san: &str) -> Result<Move, ChessError> {
        let invalid = || ChessError::InvalidMove(san.to_string());
        if !san.is_ascii() {
            return Err(invalid());
        }

        let mut body = san.trim().trim_end_matches(['!', '?']);
        let annotation = if let Some(rest) = body.strip_suffix('#') {
            body = rest;
            Annotation::Checkmate
        } else if let Some(rest) = body.strip_suffix('+') {
            body = rest;
            Annotation::Check
        } else {
            Annotation::Plain
        };

        let side = match body {
            "O-O" | "0-0" => Some(CastleSide::KingSide),
            "O-O-O" | "0-0-0" => Some(CastleSide::QueenSide),
            _ => None,
        };
        if let Some(side) = side {
            return Ok(Move::castle(side).with_annotation(annotation));
        }

        // Promotion, written `e8=Q` or `e8Q`.
        let mut promotion = None;
        if let Some((head, letter)) = body.split_once('=') {
            let mut chars = letter.chars();
            match (chars.next().and_then(PieceType::from_letter), chars.next()) {
                (Some(pt), None) if pt != PieceType::King => promotion = Some(pt),
                _ => return Err(invalid()),
            }
            body = head;
        } else if body.len() >= 3 {
            let (head, last) = body.split_at(body.len() - 1);
            let letter = last.chars().next().and_then(PieceType::from_letter);
            if let Some(pt) = letter.filter(|pt| *pt != PieceType::King) {
                if head.ends_with(|c: char| c.is_ascii_digit()) {
                    promotion = Some(pt);
                    body = head;
                }
            }
        }

        let (piece_type, rest) = match body.chars().next() {
            Some(c) if c.is_ascii_uppercase() => {
                (PieceType::from_letter(c).ok_or_else(invalid)?, &body[1..])
            }
            _ => (PieceType::Pawn, body),
        };
        if promotion.is_some() && piece_type != PieceType::Pawn {
            return Err(invalid());
        }
        if rest.len() < 2 {
            return Err(invalid());
        }

        let (mut middle, dest) = rest.split_at(rest.len() - 2);
        let to: Square = dest.parse().map_err(|_| invalid())?;
        let capture = middle.ends_with('x');
        if capture {
            middle = &middle[..middle.len() - 1];
        }
        if capture && piece_type == PieceType::Pawn && middle.is_empty() {
            return Err(invalid());
        }

        let mut from_file = None;
        let mut from_rank = None;
        for c in middle.chars() {
            if FILES.contains(&c) && from_file.is_none() && from_rank.is_none() {
                from_file = Some(c);
            } else if let Some(rank) = c.to_digit(10).filter(|r| (1..=8).contains(r)) {
                if from_rank.is_some() {
                    return Err(invalid());
                }
                from_rank = Some(rank as u8);
            } else {
                return Err(invalid());
            }
        }

        Ok(Move {
            piece_type,
            from_file,
            from_rank,
            capture,
            to: Some(to),
            promotion,
            castle: None,
            annotation,
        })
    }
}
