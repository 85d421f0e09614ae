use crate::board::SharedBoard;

#[derive(Clone)]
pub struct AppState {
    pub board: SharedBoard,
}

impl AppState {
    pub fn new(board: SharedBoard) -> Self {
        Self { board }
    }
}
