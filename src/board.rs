use log::{debug, info, trace};
use serde::{Deserialize, Serialize};

use crate::coords::Square;
use crate::error::{ChessError, Result};
use crate::moves::{Move, MoveFlags};
use crate::piece::{Color, Piece, PieceType};
use crate::position::{Position, Vision};

#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Debug, Default)]
pub enum GameStatus {
    #[default]
    InProgress,
    Checkmate { winner: Color },
}

impl GameStatus {
    pub fn is_over(self) -> bool {
        matches!(self, GameStatus::Checkmate { .. })
    }

    pub fn winner(self) -> Option<Color> {
        match self {
            GameStatus::InProgress => None,
            GameStatus::Checkmate { winner } => Some(winner),
        }
    }
}

/// Cached legal moves of one piece of the side to move.
#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct PieceMoves {
    pub square: Square,
    pub piece_type: PieceType,
    pub moves: Vec<Move>,
}

/// What an accepted move did.
#[derive(Clone, PartialEq, Debug)]
pub struct MoveOutcome {
    pub mv: Move,
    pub captured: Option<Piece>,
    pub check: bool,
    pub checkmate: bool,
}

#[derive(Clone, Serialize, Deserialize, Debug)]
pub struct Board {
    position: Position,
    ply: u32,
    history: Vec<Move>,
    status: GameStatus,
    /// Legal moves of the side to move, one entry per piece in position order.
    legal_moves: Vec<PieceMoves>,
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    /// Create an empty board with no pieces. Useful for setting up test
    /// positions: add pieces, then call [`Board::update_moves`].
    pub fn empty() -> Self {
        Board {
            position: Position::empty(),
            ply: 0,
            history: Vec::new(),
            status: GameStatus::InProgress,
            legal_moves: Vec::new(),
        }
    }

    /// The standard starting position with White's moves ready.
    pub fn new() -> Self {
        let mut board = Board::empty();
        let back_rank = [
            (PieceType::Rook, ['a', 'h']),
            (PieceType::Knight, ['b', 'g']),
            (PieceType::Bishop, ['c', 'f']),
        ];

        for file in ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'] {
            board.place(PieceType::Pawn, Color::Black, file, 7);
            board.place(PieceType::Pawn, Color::White, file, 2);
        }
        for (pt, files) in back_rank {
            for file in files {
                board.place(pt, Color::Black, file, 8);
                board.place(pt, Color::White, file, 1);
            }
        }
        board.place(PieceType::Queen, Color::Black, 'd', 8);
        board.place(PieceType::Queen, Color::White, 'd', 1);
        board.place(PieceType::King, Color::Black, 'e', 8);
        board.place(PieceType::King, Color::White, 'e', 1);

        board
            .update_moves()
            .expect("the standard position has both kings");
        board
    }

    fn place(&mut self, piece_type: PieceType, color: Color, file: char, rank: u8) {
        if let Some(square) = Square::new(file, rank) {
            self.add_piece(piece_type, color, square);
        }
    }

    /// Adds a piece unless the square is taken. The legal-move cache is not
    /// refreshed until [`Board::update_moves`] is called.
    pub fn add_piece(&mut self, piece_type: PieceType, color: Color, square: Square) -> bool {
        self.position.add_piece(Piece::new(piece_type, color, square))
    }

    /// Makes `color` the side to move by adjusting ply parity, then
    /// refreshes the legal-move cache. Handing the move to Black this way
    /// leaves `ply` one ahead of `history().len()`.
    pub fn set_side_to_move(&mut self, color: Color) -> Result<()> {
        if self.side_to_move() != color {
            self.ply += 1;
        }
        self.update_moves()
    }

    pub fn position(&self) -> &Position {
        &self.position
    }

    pub fn pieces(&self) -> &[Piece] {
        self.position.pieces()
    }

    pub fn piece_at(&self, square: Square) -> Option<&Piece> {
        self.position.piece_at(square)
    }

    pub fn ply(&self) -> u32 {
        self.ply
    }

    pub fn side_to_move(&self) -> Color {
        Color::from_ply(self.ply)
    }

    pub fn status(&self) -> GameStatus {
        self.status
    }

    pub fn is_game_over(&self) -> bool {
        self.status.is_over()
    }

    pub fn winner(&self) -> Option<Color> {
        self.status.winner()
    }

    /// Moves played so far, in order.
    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn material(&self) -> i32 {
        self.position.material()
    }

    pub fn is_in_check(&self, color: Color) -> Result<bool> {
        self.position.is_in_check(color)
    }

    /// Vision of a piece exactly as move generation sees it, castling
    /// destinations included.
    pub fn piece_vision(&self, piece: &Piece) -> Vec<Vision> {
        self.position.vision(piece)
    }

    /// Cached moves of the piece on `square`. Empty unless it belongs to the
    /// side to move. A castle shows up for both the king and its rook.
    pub fn piece_moves(&self, square: Square) -> &[Move] {
        self.legal_moves
            .iter()
            .find(|entry| entry.square == square)
            .map(|entry| entry.moves.as_slice())
            .unwrap_or(&[])
    }

    /// Every legal move of `color` in piece order, each castle listed once.
    /// The side to move is served from the cache; the other side is
    /// generated on demand.
    pub fn legal_moves(&self, color: Color) -> Result<Vec<Move>> {
        let fresh;
        let entries = if color == self.side_to_move() {
            &self.legal_moves
        } else {
            fresh = compute_moves(&self.position, color, self.status)?;
            &fresh
        };
        Ok(flatten(entries))
    }

    pub fn move_count(&self, color: Color) -> Result<usize> {
        Ok(self.legal_moves(color)?.len())
    }

    /// Recomputes the cache for the side to move.
    pub fn update_moves(&mut self) -> Result<()> {
        let color = self.side_to_move();
        self.legal_moves = compute_moves(&self.position, color, self.status)?;
        debug!(
            "{} legal moves for {color} at ply {}",
            self.legal_moves.iter().map(|e| e.moves.len()).sum::<usize>(),
            self.ply
        );
        Ok(())
    }

    /// Plays the move named by `san` for the side to move.
    ///
    /// The token is matched against the cached legal moves, ignoring its
    /// capture and check markers. A rejected move leaves the board as it was.
    pub fn apply_move(&mut self, san: &str) -> Result<MoveOutcome> {
        let mover = self.side_to_move();
        let found = san.parse::<Move>().ok().and_then(|wanted| {
            self.legal_moves.iter().find_map(|entry| {
                entry
                    .moves
                    .iter()
                    .find(|m| **m == wanted)
                    .map(|m| (entry.square, m.clone()))
            })
        });

        let Some((from, mv)) = found else {
            trace!("rejected {san:?} for {mover} at ply {}", self.ply);
            return Err(if self.status.is_over() {
                ChessError::GameAlreadyEnded
            } else {
                ChessError::InvalidMove(san.to_string())
            });
        };

        let from = match mv.castle {
            Some(_) => self.position.king_square(mover)?,
            None => from,
        };
        let captured = self
            .position
            .capture_square(from, &mv)
            .and_then(|s| self.position.piece_at(s))
            .copied();
        let MoveFlags { check, checkmate, .. } = mv.flags();

        let position = self.position.play(from, &mv);
        let status = if checkmate {
            GameStatus::Checkmate { winner: mover }
        } else {
            self.status
        };
        let legal_moves = compute_moves(&position, mover.opposite(), status)?;

        self.position = position;
        self.status = status;
        self.legal_moves = legal_moves;
        self.history.push(mv.clone());
        self.ply += 1;

        debug!("ply {}: {mover} played {mv}", self.ply);
        if checkmate {
            info!("checkmate, {mover} wins");
        }

        Ok(MoveOutcome {
            mv,
            captured,
            check,
            checkmate,
        })
    }
}

/// Legal moves of every piece of `color`, disambiguated, with castles
/// attached to the rook as well as the king.
fn compute_moves(position: &Position, color: Color, status: GameStatus) -> Result<Vec<PieceMoves>> {
    let mut entries = Vec::new();
    for piece in position.pieces().iter().filter(|p| p.color == color) {
        entries.push(PieceMoves {
            square: piece.square,
            piece_type: piece.piece_type,
            moves: piece.compute_legal_moves(position, status)?,
        });
    }
    disambiguate(&mut entries);
    link_castles(&mut entries);
    Ok(entries)
}

/// Squares of the other pieces in `entries` of the same type as
/// `entries[index]` that can also reach `dest`.
fn shared_destination(entries: &[PieceMoves], index: usize, dest: Square) -> Vec<Square> {
    let piece_type = entries[index].piece_type;
    entries
        .iter()
        .enumerate()
        .filter(|(i, other)| {
            *i != index
                && other.piece_type == piece_type
                && other.moves.iter().any(|m| m.destination() == Some(dest))
        })
        .map(|(_, other)| other.square)
        .collect()
}

/// Adds the shortest origin that tells siblings apart: the file if no rival
/// shares it, else the rank if no rival shares that, else both.
fn disambiguate(entries: &mut [PieceMoves]) {
    let mut updates = Vec::new();
    for (i, entry) in entries.iter().enumerate() {
        if matches!(entry.piece_type, PieceType::Pawn | PieceType::King) {
            continue;
        }
        let from = entry.square;
        for (j, mv) in entry.moves.iter().enumerate() {
            let Some(dest) = mv.destination() else {
                continue;
            };
            let rivals = shared_destination(entries, i, dest);
            if rivals.is_empty() {
                continue;
            }
            let origin = if rivals.iter().all(|r| r.file() != from.file()) {
                (Some(from.file()), None)
            } else if rivals.iter().all(|r| r.rank() != from.rank()) {
                (None, Some(from.rank()))
            } else {
                (Some(from.file()), Some(from.rank()))
            };
            updates.push((i, j, origin));
        }
    }
    for (i, j, (file, rank)) in updates {
        let mv = &mut entries[i].moves[j];
        *mv = mv.clone().with_disambiguation(file, rank);
    }
}

fn link_castles(entries: &mut [PieceMoves]) {
    let mut links = Vec::new();
    for entry in entries.iter().filter(|e| e.piece_type == PieceType::King) {
        for mv in &entry.moves {
            if let Some(side) = mv.castle {
                if let Some(rook) = entry.square.with_file(side.rook_file()) {
                    links.push((rook, mv.clone()));
                }
            }
        }
    }
    for (rook, mv) in links {
        if let Some(entry) = entries
            .iter_mut()
            .find(|e| e.square == rook && e.piece_type == PieceType::Rook)
        {
            entry.moves.push(mv);
        }
    }
}

fn flatten(entries: &[PieceMoves]) -> Vec<Move> {
    entries
        .iter()
        .flat_map(|entry| {
            let own_castles = entry.piece_type == PieceType::King;
            entry.moves.iter().filter(move |m| own_castles || !m.is_castle())
        })
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    fn sans(moves: &[Move]) -> Vec<String> {
        moves.iter().map(|m| m.to_string()).collect()
    }

    fn play(board: &mut Board, moves: &[&str]) {
        for san in moves {
            board.apply_move(san).unwrap_or_else(|e| panic!("{san}: {e}"));
        }
    }

    #[test]
    fn opening_has_twenty_moves_each() {
        let mut board = Board::new();
        assert_eq!(board.side_to_move(), Color::White);
        assert_eq!(board.move_count(Color::White).unwrap(), 20);
        play(&mut board, &["e4"]);
        assert_eq!(board.side_to_move(), Color::Black);
        assert_eq!(board.move_count(Color::Black).unwrap(), 20);
    }

    #[test]
    fn opening_moves_are_plain_san() {
        let board = Board::new();
        let moves = sans(&board.legal_moves(Color::White).unwrap());
        for expected in ["a3", "a4", "h3", "h4", "Na3", "Nc3", "Nf3", "Nh3"] {
            assert!(moves.contains(&expected.to_string()), "missing {expected}: {moves:?}");
        }
    }

    #[test]
    fn rejected_move_changes_nothing() {
        let mut board = Board::new();
        let before = sans(&board.legal_moves(Color::White).unwrap());
        assert_eq!(board.apply_move("e5"), Err(ChessError::InvalidMove("e5".into())));
        assert_eq!(board.apply_move("garbage"), Err(ChessError::InvalidMove("garbage".into())));
        assert_eq!(board.ply(), 0);
        assert!(board.history().is_empty());
        assert_eq!(sans(&board.legal_moves(Color::White).unwrap()), before);
    }

    #[test]
    fn fools_mate_ends_the_game() {
        let mut board = Board::new();
        play(&mut board, &["f3", "e5", "g4"]);
        let outcome = board.apply_move("Qh4").unwrap();
        assert!(outcome.checkmate);
        assert!(!outcome.check);
        assert_eq!(outcome.mv.to_string(), "Qh4#");
        assert_eq!(board.status(), GameStatus::Checkmate { winner: Color::Black });
        assert_eq!(board.winner(), Some(Color::Black));
        assert!(board.legal_moves(Color::White).unwrap().is_empty());
        assert_eq!(board.apply_move("a3"), Err(ChessError::GameAlreadyEnded));
        assert_eq!(board.ply(), 4);
    }

    #[test]
    fn capture_reports_the_taken_piece() {
        let mut board = Board::new();
        play(&mut board, &["e4", "d5"]);
        let outcome = board.apply_move("exd5").unwrap();
        let captured = outcome.captured.unwrap();
        assert_eq!(captured.piece_type, PieceType::Pawn);
        assert_eq!(captured.color, Color::Black);
        assert_eq!(board.material(), 1);
        assert_eq!(board.pieces().len(), 31);
    }

    #[test]
    fn en_passant_takes_the_passed_pawn() {
        let mut board = Board::new();
        play(&mut board, &["e4", "a6", "e5", "d5"]);
        assert!(board.piece_at(sq("d6")).is_none());
        let outcome = board.apply_move("exd6").unwrap();
        assert_eq!(outcome.captured.map(|p| p.square), Some(sq("d5")));
        assert!(board.piece_at(sq("d5")).is_none());
        assert_eq!(board.piece_at(sq("d6")).unwrap().piece_type, PieceType::Pawn);
    }

    #[test]
    fn en_passant_window_closes_after_one_ply() {
        let mut board = Board::new();
        play(&mut board, &["e4", "a6", "e5", "d5", "Nf3", "h6"]);
        assert!(matches!(board.apply_move("exd6"), Err(ChessError::InvalidMove(_))));
    }

    #[test]
    fn castling_is_listed_for_king_and_rook() {
        let mut board = Board::new();
        play(&mut board, &["e4", "e5", "Nf3", "Nc6", "Bc4", "Nf6"]);
        let castle: Move = "O-O".parse().unwrap();
        assert!(board.piece_moves(sq("e1")).contains(&castle));
        assert!(board.piece_moves(sq("h1")).contains(&castle));
        let all = board.legal_moves(Color::White).unwrap();
        assert_eq!(all.iter().filter(|m| **m == castle).count(), 1);

        board.apply_move("O-O").unwrap();
        assert_eq!(board.piece_at(sq("g1")).unwrap().piece_type, PieceType::King);
        assert_eq!(board.piece_at(sq("f1")).unwrap().piece_type, PieceType::Rook);
        assert_eq!(board.piece_at(sq("f1")).unwrap().move_counter, 1);
    }

    #[test]
    fn moved_king_loses_castling_for_good() {
        let mut board = Board::new();
        play(&mut board, &["e4", "e5", "Nf3", "Nc6", "Bc4", "Nf6", "Ke2", "a6", "Ke1", "a5"]);
        let king = *board.piece_at(sq("e1")).unwrap();
        assert_eq!(king.move_counter, 2);
        let vision = board.piece_vision(&king);
        assert!(!vision.iter().any(|v| v.square == sq("g1")));
        assert!(board.apply_move("O-O").is_err());
    }

    #[test]
    fn moved_rook_loses_its_side_only() {
        let mut board = Board::empty();
        board.add_piece(PieceType::King, Color::White, sq("e1"));
        board.add_piece(PieceType::Rook, Color::White, sq("a1"));
        board.add_piece(PieceType::Rook, Color::White, sq("h1"));
        board.add_piece(PieceType::King, Color::Black, sq("e8"));
        board.add_piece(PieceType::Pawn, Color::Black, sq("a7"));
        board.update_moves().unwrap();
        play(&mut board, &["Rh2", "a6", "Rh1", "a5"]);

        let king = *board.piece_at(sq("e1")).unwrap();
        let vision: Vec<Square> = board.piece_vision(&king).iter().map(|v| v.square).collect();
        assert!(vision.contains(&sq("c1")));
        assert!(!vision.contains(&sq("g1")));
        assert!(board.apply_move("O-O").is_err());
        board.apply_move("O-O-O").unwrap();
        assert_eq!(board.piece_at(sq("d1")).unwrap().piece_type, PieceType::Rook);
    }

    #[test]
    fn no_castling_out_of_check() {
        let mut board = Board::empty();
        board.add_piece(PieceType::King, Color::White, sq("e1"));
        board.add_piece(PieceType::Rook, Color::White, sq("h1"));
        board.add_piece(PieceType::Rook, Color::Black, sq("e8"));
        board.add_piece(PieceType::King, Color::Black, sq("a8"));
        board.update_moves().unwrap();

        let king = *board.piece_at(sq("e1")).unwrap();
        assert!(board.piece_vision(&king).iter().any(|v| v.square == sq("g1")));
        let mut moves = sans(&board.legal_moves(Color::White).unwrap());
        moves.sort();
        assert_eq!(moves, vec!["Kd1", "Kd2", "Kf1", "Kf2"]);
        assert_eq!(board.apply_move("O-O"), Err(ChessError::InvalidMove("O-O".into())));
        assert_eq!(board.ply(), 0);
    }

    #[test]
    fn knights_on_one_rank_use_the_file() {
        let mut board = Board::empty();
        board.add_piece(PieceType::King, Color::White, sq("e1"));
        board.add_piece(PieceType::King, Color::Black, sq("h8"));
        board.add_piece(PieceType::Knight, Color::White, sq("b1"));
        board.add_piece(PieceType::Knight, Color::White, sq("f1"));
        board.update_moves().unwrap();

        let moves = sans(&board.legal_moves(Color::White).unwrap());
        assert!(moves.contains(&"Nbd2".to_string()), "{moves:?}");
        assert!(moves.contains(&"Nfd2".to_string()), "{moves:?}");
        assert!(moves.contains(&"Na3".to_string()), "{moves:?}");
        assert!(!moves.contains(&"Nd2".to_string()), "{moves:?}");
    }

    #[test]
    fn knights_on_one_file_use_the_rank() {
        let mut board = Board::empty();
        board.add_piece(PieceType::King, Color::White, sq("a1"));
        board.add_piece(PieceType::King, Color::Black, sq("h8"));
        board.add_piece(PieceType::Knight, Color::White, sq("g1"));
        board.add_piece(PieceType::Knight, Color::White, sq("g5"));
        board.update_moves().unwrap();

        let moves = sans(&board.legal_moves(Color::White).unwrap());
        assert!(moves.contains(&"N1f3".to_string()), "{moves:?}");
        assert!(moves.contains(&"N5f3".to_string()), "{moves:?}");
        assert!(moves.contains(&"Ne2".to_string()), "{moves:?}");
        board.apply_move("N5f3").unwrap();
        assert_eq!(board.piece_at(sq("f3")).unwrap().move_counter, 1);
        assert!(board.piece_at(sq("g1")).is_some());
        assert!(board.piece_at(sq("g5")).is_none());
    }

    #[test]
    fn three_queens_need_file_and_rank() {
        let mut board = Board::empty();
        board.add_piece(PieceType::King, Color::White, sq("a1"));
        board.add_piece(PieceType::King, Color::Black, sq("b6"));
        board.add_piece(PieceType::Queen, Color::White, sq("h4"));
        board.add_piece(PieceType::Queen, Color::White, sq("e4"));
        board.add_piece(PieceType::Queen, Color::White, sq("h1"));
        board.update_moves().unwrap();

        let moves = sans(&board.legal_moves(Color::White).unwrap());
        assert!(moves.contains(&"Qh4e1".to_string()), "{moves:?}");
        assert!(moves.contains(&"Qee1".to_string()), "{moves:?}");
        assert!(moves.contains(&"Q1e1".to_string()), "{moves:?}");
    }

    #[test]
    fn other_side_is_generated_on_demand() {
        let board = Board::new();
        assert_eq!(board.move_count(Color::Black).unwrap(), 20);
        assert!(board.piece_moves(sq("b8")).is_empty());
    }

    #[test]
    fn missing_king_is_an_error() {
        let mut board = Board::empty();
        board.add_piece(PieceType::King, Color::White, sq("e1"));
        board.add_piece(PieceType::Rook, Color::White, sq("a1"));
        assert_eq!(board.update_moves(), Err(ChessError::MissingKing(Color::Black)));
    }

    #[test]
    fn black_to_move_setup() {
        let mut board = Board::empty();
        board.add_piece(PieceType::King, Color::White, sq("h1"));
        board.add_piece(PieceType::King, Color::Black, sq("e8"));
        board.add_piece(PieceType::Pawn, Color::Black, sq("d2"));
        board.set_side_to_move(Color::Black).unwrap();

        let outcome = board.apply_move("d1=Q+").unwrap();
        assert!(outcome.check);
        assert_eq!(board.piece_at(sq("d1")).unwrap().piece_type, PieceType::Queen);
        assert_eq!(board.material(), -9);
        assert_eq!(board.side_to_move(), Color::White);
    }

    #[test]
    fn handing_the_move_over_refreshes_the_cache() {
        let mut board = Board::empty();
        board.add_piece(PieceType::King, Color::White, sq("h1"));
        board.add_piece(PieceType::King, Color::Black, sq("a8"));
        board.add_piece(PieceType::Knight, Color::Black, sq("b8"));
        board.update_moves().unwrap();
        assert!(board.piece_moves(sq("b8")).is_empty());

        board.set_side_to_move(Color::Black).unwrap();
        assert_eq!(board.ply(), 1);
        let mut knight = sans(board.piece_moves(sq("b8")));
        knight.sort();
        assert_eq!(knight, vec!["Na6", "Nc6", "Nd7"]);
        assert!(board.piece_moves(sq("h1")).is_empty());
        board.apply_move("Nc6").unwrap();
        assert_eq!(board.side_to_move(), Color::White);
    }

    #[test]
    fn serialized_board_keeps_validating_squares() {
        let board = Board::new();
        let json = serde_json::to_string(&board).unwrap();
        let restored: Board = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.move_count(Color::White).unwrap(), 20);

        let tampered = json.replace(r#""e1""#, r#""z9""#);
        assert!(serde_json::from_str::<Board>(&tampered).is_err());
    }

    #[test]
    fn history_keeps_the_generated_san() {
        let mut board = Board::new();
        play(&mut board, &["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7"]);
        assert_eq!(
            sans(board.history()),
            vec!["e4", "e5", "Qh5", "Nc6", "Bc4", "Nf6", "Qxf7#"]
        );
        assert!(board.is_game_over());
    }
}
