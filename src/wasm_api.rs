use crate::board::Board;
use crate::coords::Square;
use crate::snapshot::BoardSnapshot;
use serde::Serialize;
use wasm_bindgen::prelude::*;

#[derive(Serialize)]
struct MoveResult {
    #[serde(flatten)]
    board_state: Option<BoardSnapshot>,
    error: Option<String>,
}

fn to_js<T: Serialize>(value: &T) -> JsValue {
    serde_wasm_bindgen::to_value(value).unwrap_or(JsValue::NULL)
}

fn error_result(error: String) -> JsValue {
    to_js(&MoveResult {
        board_state: None,
        error: Some(error),
    })
}

#[wasm_bindgen]
pub struct Game {
    board: Board,
}

#[wasm_bindgen]
impl Game {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Game {
        Game { board: Board::new() }
    }

    pub fn get_board_state(&self) -> JsValue {
        match BoardSnapshot::from_board(&self.board) {
            Ok(state) => to_js(&state),
            Err(err) => error_result(err.to_string()),
        }
    }

    /// Plays a SAN token such as "Nf3" or "O-O".
    pub fn make_move(&mut self, san: &str) -> JsValue {
        let applied = self
            .board
            .apply_move(san)
            .and_then(|_| BoardSnapshot::from_board(&self.board));
        match applied {
            Ok(state) => to_js(&MoveResult {
                board_state: Some(state),
                error: None,
            }),
            Err(err) => error_result(err.to_string()),
        }
    }

    pub fn get_legal_moves_for_square(&self, square: &str) -> JsValue {
        let moves: Vec<String> = square
            .parse::<Square>()
            .map(|s| self.board.piece_moves(s).iter().map(|m| m.to_string()).collect())
            .unwrap_or_default();
        to_js(&moves)
    }
}
