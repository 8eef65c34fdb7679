use thiserror::Error;

/// Errors raised by the position and search layers
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("Invalid move, column {} out of range. Columns must be between 1 and {}", .column.saturating_add(1), crate::WIDTH)]
    InvalidMove { column: usize },

    #[error("Invalid move, column {} full", .column.saturating_add(1))]
    ColumnFull { column: usize },

    #[error("Invalid position, game is over")]
    GameOver,

    #[error("could not parse '{0}' as a valid move")]
    ParseMove(char),

    #[error("no unexpanded moves left in the move list")]
    MoveListExhausted,

    #[error("node has not been visited by any simulation")]
    NotVisited,

    #[error("root has no children, run at least one simulation first")]
    NoChildren,

    #[error("invalid search configuration: {0}")]
    InvalidConfig(String),
}

pub type Result<T> = std::result::Result<T, Error>;
