use thiserror::Error;

#[derive(Error, Debug, Copy, Clone, PartialEq, Eq)]
pub enum GameError {
    #[error("Board grid is empty")]
    EmptyGrid,
    #[error("Board shape does not match declared size")]
    InvalidBoardShape,
    #[error("Board dimensions out of range")]
    InvalidDimensions,
    #[error("Mine count out of range")]
    InvalidMineCount,
}

pub type Result<T> = core::result::Result<T, GameError>;
