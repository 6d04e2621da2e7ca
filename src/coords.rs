// =============================================================================
// Coordinates
//
// A square is a (file, rank) pair. Two matrix orientations are used:
//   - matrix: row 0 = rank 8, col 0 = file a (ray walking, vision)
//   - image:  row 0 = rank 1, col 0 = file a (rendering, snapshots)
// =============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ChessError;

pub const FILES: [char; 8] = ['a', 'b', 'c', 'd', 'e', 'f', 'g', 'h'];

/// A board square. `file` is 0..8 for a..h, `rank` is 1..=8.
///
/// Serialized as its name (`"e4"`), so deserializing goes through the same
/// validation as parsing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Debug)]
#[serde(try_from = "String", into = "String")]
pub struct Square {
    file: u8,
    rank: u8,
}

impl Square {
    /// Build from a file letter and a rank number, e.g. `('e', 4)`.
    pub fn new(file: char, rank: u8) -> Option<Square> {
        let file = FILES.iter().position(|&f| f == file)? as u8;
        if !(1..=8).contains(&rank) {
            return None;
        }
        Some(Square { file, rank })
    }

    pub fn file(self) -> char {
        FILES[self.file as usize]
    }

    pub fn rank(self) -> u8 {
        self.rank
    }

    pub fn file_index(self) -> usize {
        self.file as usize
    }

    pub fn to_matrix(self) -> (usize, usize) {
        (8 - self.rank as usize, self.file as usize)
    }

    pub fn to_image(self) -> (usize, usize) {
        (self.rank as usize - 1, self.file as usize)
    }

    /// Inverse of [`Square::to_matrix`]. Indices must already be in 0..8.
    pub fn from_matrix(row: usize, col: usize) -> Square {
        debug_assert!(row < 8 && col < 8, "matrix index out of range: ({row}, {col})");
        Square {
            file: col as u8,
            rank: (8 - row) as u8,
        }
    }

    /// Signed variant used by the ray loops: `None` once off the board.
    pub fn try_from_matrix(row: i32, col: i32) -> Option<Square> {
        if in_bounds(row, col) {
            Some(Square::from_matrix(row as usize, col as usize))
        } else {
            None
        }
    }

    /// The square `dr` rows and `dc` columns away in matrix orientation.
    pub fn offset(self, dr: i32, dc: i32) -> Option<Square> {
        let (row, col) = self.to_matrix();
        Square::try_from_matrix(row as i32 + dr, col as i32 + dc)
    }

    pub fn with_file(self, file: char) -> Option<Square> {
        Square::new(file, self.rank)
    }
}

pub fn in_bounds(row: i32, col: i32) -> bool {
    (0..8).contains(&row) && (0..8).contains(&col)
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank)
    }
}

impl FromStr for Square {
    type Err = ChessError;

    fn from_str(s: &str) -> Result<Square, ChessError> {
        let mut chars = s.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(file), Some(rank), None) => rank
                .to_digit(10)
                .and_then(|r| Square::new(file, r as u8))
                .ok_or_else(|| ChessError::InvalidSquare(s.to_string())),
            _ => Err(ChessError::InvalidSquare(s.to_string())),
        }
    }
}

impl TryFrom<String> for Square {
    type Error = ChessError;

    fn try_from(s: String) -> Result<Square, ChessError> {
        s.parse()
    }
}

impl From<Square> for String {
    fn from(square: Square) -> String {
        square.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn sq(s: &str) -> Square {
        s.parse().unwrap()
    }

    #[test]
    fn matrix_puts_rank_eight_on_top() {
        assert_eq!(sq("a8").to_matrix(), (0, 0));
        assert_eq!(sq("h1").to_matrix(), (7, 7));
        assert_eq!(sq("e4").to_matrix(), (4, 4));
    }

    #[test]
    fn image_puts_rank_one_on_top() {
        assert_eq!(sq("a1").to_image(), (0, 0));
        assert_eq!(sq("e4").to_image(), (3, 4));
        assert_eq!(sq("h8").to_image(), (7, 7));
    }

    #[test]
    fn from_matrix_inverts_to_matrix() {
        for row in 0..8 {
            for col in 0..8 {
                let s = Square::from_matrix(row, col);
                assert_eq!(s.to_matrix(), (row, col));
            }
        }
    }

    #[test]
    fn offsets_stop_at_the_edge() {
        assert_eq!(sq("e4").offset(-1, 0), Some(sq("e5")));
        assert_eq!(sq("h8").offset(-1, 0), None);
        assert_eq!(sq("a1").offset(0, -1), None);
    }

    #[test]
    fn parse_rejects_garbage() {
        assert!("i1".parse::<Square>().is_err());
        assert!("a9".parse::<Square>().is_err());
        assert!("a0".parse::<Square>().is_err());
        assert!("e".parse::<Square>().is_err());
        assert!("e44".parse::<Square>().is_err());
        assert_eq!(sq("g7").to_string(), "g7");
    }

    #[test]
    fn serde_uses_the_square_name() {
        assert_eq!(serde_json::to_string(&sq("e4")).unwrap(), r#""e4""#);
        assert_eq!(serde_json::from_str::<Square>(r#""h8""#).unwrap(), sq("h8"));
    }

    #[test]
    fn serde_rejects_squares_off_the_board() {
        assert!(serde_json::from_str::<Square>(r#""i9""#).is_err());
        assert!(serde_json::from_str::<Square>(r#""a0""#).is_err());
        assert!(serde_json::from_str::<Square>(r#"{"file":9,"rank":0}"#).is_err());
    }
}
