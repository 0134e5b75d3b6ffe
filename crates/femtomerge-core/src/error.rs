use thiserror::Error;

#[derive(Error, Debug)]
pub enum MergeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown point group: {0}")]
    UnknownPointGroup(String),

    #[error("Unknown figure of merit: {0}")]
    UnknownFigureOfMerit(String),

    #[error("Degenerate unit cell: {0}")]
    DegenerateCell(String),

    #[error("Invalid crystal record: {0}")]
    Input(String),

    #[error("Solver failed: {0}")]
    SolverFailed(String),

    #[error("Scaling failed: {0}")]
    ScalingFailed(String),

    #[error("Empty crystal stream")]
    EmptyDataset,

    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

pub type Result<T> = std::result::Result<T, MergeError>;
