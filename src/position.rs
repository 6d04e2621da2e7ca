// =============================================================================
// Position
//
// The piece collection plus the en passant target. Everything here is a pure
// query: trial moves are played on a copy (`play`), so probing for checks,
// pins and mates never touches the position being asked about.
//
// Vision is what a piece could move to given occupancy alone, castling
// destinations included. Attack detection scans outward from the target
// square and is what check tests use.
// =============================================================================

use serde::{Deserialize, Serialize};

use crate::coords::Square;
use crate::error::{ChessError, Result};
use crate::moves::{CastleSide, Move};
use crate::piece::{Color, Piece, PieceType};

const KNIGHT_OFFSETS: [(i32, i32); 8] = [
    (-2, -1), (-2, 1), (-1, -2), (-1, 2),
    (1, -2), (1, 2), (2, -1), (2, 1),
];

const KING_OFFSETS: [(i32, i32); 8] = [
    (-1, -1), (-1, 0), (-1, 1), (0, -1),
    (0, 1), (1, -1), (1, 0), (1, 1),
];

const STRAIGHT_DIRS: [(i32, i32); 4] = [(0, 1), (0, -1), (1, 0), (-1, 0)];
const DIAGONAL_DIRS: [(i32, i32); 4] = [(1, 1), (1, -1), (-1, 1), (-1, -1)];
const QUEEN_DIRS: [(i32, i32); 8] = [
    (0, 1), (0, -1), (1, 0), (-1, 0),
    (1, 1), (1, -1), (-1, 1), (-1, -1),
];

/// One destination of a piece's vision.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug)]
pub struct Vision {
    pub square: Square,
    pub capture: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug, Default)]
pub struct Position {
    pieces: Vec<Piece>,
    /// Square a pawn skipped over with its double step on the last ply.
    en_passant_target: Option<Square>,
}

/// Matrix row step of a pawn's forward move.
fn pawn_direction(color: Color) -> i32 {
    match color {
        Color::White => -1,
        Color::Black => 1,
    }
}

impl Position {
    pub fn empty() -> Self {
        Position::default()
    }

    pub fn pieces(&self) -> &[Piece] {
        &self.pieces
    }

    /// Adds a piece unless its square is taken. Returns whether it was added.
    pub fn add_piece(&mut self, piece: Piece) -> bool {
        if self.is_occupied(piece.square) {
            return false;
        }
        self.pieces.push(piece);
        true
    }

    pub fn en_passant_target(&self) -> Option<Square> {
        self.en_passant_target
    }

    pub fn set_en_passant_target(&mut self, target: Option<Square>) {
        self.en_passant_target = target;
    }

    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.pieces.iter().find(|p| p.square == square)
    }

    fn index_at(&self, square: Square) -> Option<usize> {
        self.pieces.iter().position(|p| p.square == square)
    }

    pub fn is_occupied(&self, square: Square) -> bool {
        self.piece_at(square).is_some()
    }

    pub fn is_occupied_by(&self, square: Square, color: Color) -> bool {
        self.piece_at(square).is_some_and(|p| p.color == color)
    }

    pub fn king_square(&self, color: Color) -> Result<Square> {
        self.pieces
            .iter()
            .find(|p| p.piece_type == PieceType::King && p.color == color)
            .map(|p| p.square)
            .ok_or(ChessError::MissingKing(color))
    }

    /// Signed material balance. Positive favours White.
    pub fn material(&self) -> i32 {
        self.pieces
            .iter()
            .map(|p| match p.color {
                Color::White => p.piece_type.value(),
                Color::Black => -p.piece_type.value(),
            })
            .sum()
    }

    // -------------------------------------------------------------------------
    // Vision
    // -------------------------------------------------------------------------

    pub fn vision(&self, piece: &Piece) -> Vec<Vision> {
        self.vision_of(piece.piece_type, piece.square, piece.move_counter, piece.color)
    }

    /// Destinations of a piece of the given type standing on `square`.
    pub fn vision_of(
        &self,
        piece_type: PieceType,
        square: Square,
        move_counter: u32,
        color: Color,
    ) -> Vec<Vision> {
        let mut out = Vec::new();
        match piece_type {
            PieceType::Pawn => self.pawn_vision(square, move_counter, color, &mut out),
            PieceType::Knight => self.step_vision(square, color, &KNIGHT_OFFSETS, &mut out),
            PieceType::Bishop => self.ray_vision(square, color, &DIAGONAL_DIRS, &mut out),
            PieceType::Rook => self.ray_vision(square, color, &STRAIGHT_DIRS, &mut out),
            PieceType::Queen => self.ray_vision(square, color, &QUEEN_DIRS, &mut out),
            PieceType::King => self.king_vision(square, move_counter, color, &mut out),
        }
        out
    }

    fn pawn_vision(&self, square: Square, move_counter: u32, color: Color, out: &mut Vec<Vision>) {
        let dir = pawn_direction(color);

        if let Some(one) = square.offset(dir, 0).filter(|s| !self.is_occupied(*s)) {
            out.push(Vision { square: one, capture: false });

            // An unmoved pawn may step twice wherever it was set up.
            if move_counter == 0 {
                if let Some(two) = square.offset(2 * dir, 0).filter(|s| !self.is_occupied(*s)) {
                    out.push(Vision { square: two, capture: false });
                }
            }
        }

        for dc in [-1, 1] {
            let Some(target) = square.offset(dir, dc) else {
                continue;
            };
            if self.is_occupied_by(target, color.opposite()) {
                out.push(Vision { square: target, capture: true });
            } else if self.is_en_passant_capture(square, target, color) {
                out.push(Vision { square: target, capture: true });
            }
        }
    }

    /// A pawn of `color` on `from` may take en passant on `target`: the target
    /// is the square an enemy pawn skipped last ply and that pawn sits beside
    /// `from`.
    fn is_en_passant_capture(&self, from: Square, target: Square, color: Color) -> bool {
        if self.en_passant_target != Some(target) || self.is_occupied(target) {
            return false;
        }
        from.with_file(target.file())
            .and_then(|s| self.piece_at(s))
            .is_some_and(|p| p.piece_type == PieceType::Pawn && p.color != color)
    }

    fn step_vision(
        &self,
        square: Square,
        color: Color,
        offsets: &[(i32, i32)],
        out: &mut Vec<Vision>,
    ) {
        for &(dr, dc) in offsets {
            let Some(target) = square.offset(dr, dc) else {
                continue;
            };
            match self.piece_at(target) {
                Some(p) if p.color == color => {}
                Some(_) => out.push(Vision { square: target, capture: true }),
                None => out.push(Vision { square: target, capture: false }),
            }
        }
    }

    /// Walks each ray until the edge or the first piece, which is included
    /// only when it is an enemy.
    fn ray_vision(
        &self,
        square: Square,
        color: Color,
        directions: &[(i32, i32)],
        out: &mut Vec<Vision>,
    ) {
        for &(dr, dc) in directions {
            let mut current = square;
            while let Some(target) = current.offset(dr, dc) {
                if let Some(p) = self.piece_at(target) {
                    if p.color != color {
                        out.push(Vision { square: target, capture: true });
                    }
                    break;
                }
                out.push(Vision { square: target, capture: false });
                current = target;
            }
        }
    }

    fn king_vision(&self, square: Square, move_counter: u32, color: Color, out: &mut Vec<Vision>) {
        self.step_vision(square, color, &KING_OFFSETS, out);

        let home = color.home_rank();
        if move_counter != 0 || square.file() != 'e' || square.rank() != home {
            return;
        }
        for side in [CastleSide::KingSide, CastleSide::QueenSide] {
            if self.castle_path_clear(color, side) {
                if let Some(target) = square.with_file(side.king_file()) {
                    out.push(Vision { square: target, capture: false });
                }
            }
        }
    }

    /// Unmoved rook of `color` in the corner and nothing between it and the king.
    fn castle_path_clear(&self, color: Color, side: CastleSide) -> bool {
        let home = color.home_rank();
        let rook_ready = Square::new(side.rook_file(), home)
            .and_then(|s| self.piece_at(s))
            .is_some_and(|p| {
                p.piece_type == PieceType::Rook && p.color == color && p.move_counter == 0
            });
        let between: &[char] = match side {
            CastleSide::KingSide => &['f', 'g'],
            CastleSide::QueenSide => &['b', 'c', 'd'],
        };
        rook_ready
            && between
                .iter()
                .filter_map(|&f| Square::new(f, home))
                .all(|s| !self.is_occupied(s))
    }

    // -------------------------------------------------------------------------
    // Attacks and check
    // -------------------------------------------------------------------------

    fn holds(&self, square: Square, attacker: Color, types: &[PieceType]) -> bool {
        self.piece_at(square)
            .is_some_and(|p| p.color == attacker && types.contains(&p.piece_type))
    }

    /// Whether any piece of `attacker` threatens `square`, scanning outward
    /// from the square itself.
    pub fn is_attacked(&self, square: Square, attacker: Color) -> bool {
        let around = |offsets: &'static [(i32, i32)]| {
            offsets.iter().filter_map(move |&(dr, dc)| square.offset(dr, dc))
        };

        if around(&KNIGHT_OFFSETS[..]).any(|s| self.holds(s, attacker, &[PieceType::Knight])) {
            return true;
        }
        if around(&KING_OFFSETS[..]).any(|s| self.holds(s, attacker, &[PieceType::King])) {
            return true;
        }

        // A pawn one row behind, seen from the attacker's direction of travel.
        let behind = -pawn_direction(attacker);
        if [-1, 1]
            .iter()
            .filter_map(|&dc| square.offset(behind, dc))
            .any(|s| self.holds(s, attacker, &[PieceType::Pawn]))
        {
            return true;
        }

        let sliders = [
            (&STRAIGHT_DIRS[..], [PieceType::Rook, PieceType::Queen]),
            (&DIAGONAL_DIRS[..], [PieceType::Bishop, PieceType::Queen]),
        ];
        for (dirs, types) in sliders {
            for &(dr, dc) in dirs {
                let mut current = square;
                while let Some(next) = current.offset(dr, dc) {
                    if self.is_occupied(next) {
                        if self.holds(next, attacker, &types) {
                            return true;
                        }
                        break;
                    }
                    current = next;
                }
            }
        }

        false
    }

    pub fn is_in_check(&self, color: Color) -> Result<bool> {
        let king = self.king_square(color)?;
        Ok(self.is_attacked(king, color.opposite()))
    }

    // -------------------------------------------------------------------------
    // Trial moves
    // -------------------------------------------------------------------------

    /// Square of the piece `mv` would capture if the piece on `from` played it.
    /// En passant takes the pawn one rank behind the empty destination.
    pub fn capture_square(&self, from: Square, mv: &Move) -> Option<Square> {
        let to = mv.destination()?;
        let mover = self.piece_at(from)?;
        if self.is_occupied_by(to, mover.color.opposite()) {
            return Some(to);
        }
        if mover.piece_type == PieceType::Pawn
            && self.is_en_passant_capture(from, to, mover.color)
        {
            return from.with_file(to.file());
        }
        None
    }

    /// The position after the piece on `from` plays `mv`. Kings are never
    /// removed, so a trial "capture" of a king leaves it in place.
    pub fn play(&self, from: Square, mv: &Move) -> Position {
        let mut next = self.clone();
        next.en_passant_target = None;

        let Some(mover) = self.piece_at(from).copied() else {
            return next;
        };

        if let Some(victim) = self.capture_square(from, mv) {
            if let Some(idx) = next.index_at(victim) {
                if next.pieces[idx].piece_type != PieceType::King {
                    next.pieces.remove(idx);
                }
            }
        }

        if let Some(side) = mv.castle {
            let rook_idx = Square::new(side.rook_file(), from.rank())
                .and_then(|s| next.index_at(s));
            if let Some(rook_idx) = rook_idx {
                mv.apply_to(&mut next.pieces[rook_idx]);
            }
        }

        if let Some(idx) = next.index_at(from) {
            mv.apply_to(&mut next.pieces[idx]);
        }

        if mover.piece_type == PieceType::Pawn && mv.promotion.is_none() {
            if let Some(to) = mv.destination() {
                if to.rank().abs_diff(from.rank()) == 2 {
                    next.en_passant_target = from.offset(pawn_direction(mover.color), 0);
                }
            }
        }

        next
    }

    /// Would the mover's own king stand in check after the move?
    pub fn would_own_king_be_in_check(&self, from: Square, mv: &Move) -> Result<bool> {
        let Some(mover) = self.piece_at(from) else {
            return Ok(false);
        };
        self.play(from, mv).is_in_check(mover.color)
    }

    /// Would the move give check to the opponent's king?
    pub fn would_enemy_king_be_in_check(&self, from: Square, mv: &Move) -> Result<bool> {
        let Some(mover) = self.piece_at(from) else {
            return Ok(false);
        };
        self.play(from, mv).is_in_check(mover.color.opposite())
    }

    /// `(check, checkmate)` for the opponent after the move. Mate means the
    /// opponent is in check and none of its pieces has an escape.
    pub fn is_enemy_king_checkmated_after_move(
        &self,
        from: Square,
        mv: &Move,
    ) -> Result<(bool, bool)> {
        let Some(mover) = self.piece_at(from) else {
            return Ok((false, false));
        };
        let enemy = mover.color.opposite();
        let next = self.play(from, mv);
        if !next.is_in_check(enemy)? {
            return Ok((false, false));
        }
        Ok((true, !next.has_legal_move(enemy)?))
    }

    /// Can the piece move along `vision` without exposing its own king?
    ///
    /// Kings are never captured. Castling is refused while in check or when
    /// the square the king crosses is attacked.
    pub fn is_legal_destination(
        &self,
        piece: &Piece,
        vision: &Vision,
        in_check: bool,
    ) -> Result<bool> {
        if self.piece_at(vision.square).is_some_and(|p| p.piece_type == PieceType::King) {
            return Ok(false);
        }
        let mv = Move::from_vision(piece, vision);
        if let Some(side) = mv.castle {
            if in_check {
                return Ok(false);
            }
            let crossed = piece.square.with_file(side.rook_target_file());
            if crossed.is_some_and(|s| self.is_attacked(s, piece.color.opposite())) {
                return Ok(false);
            }
        }
        Ok(!self.would_own_king_be_in_check(piece.square, &mv)?)
    }

    pub fn has_legal_move(&self, color: Color) -> Result<bool> {
        let in_check = self.is_in_check(color)?;
        for piece in self.pieces.iter().filter(|p| p.color == color) {
            for vision in self.vision(piece) {
                if self.is_legal_destination(piece, &vision, in_check)? {
                    return Ok(true);
                }
            }
        }
        Ok(false)
    }
}
