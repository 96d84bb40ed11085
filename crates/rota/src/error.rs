use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChartError {
    #[error("slice weights sum to {total}, expected 1.0 within {tolerance}")]
    WeightSum { total: f64, tolerance: f64 },
    #[error("friction factor {0} is outside (0, 1]")]
    Friction(f64),
    #[error(transparent)]
    Cairo(#[from] cairo::Error),
    #[error(transparent)]
    Borrow(#[from] cairo::BorrowError),
    #[error(transparent)]
    Png(#[from] cairo::IoError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to spawn render thread: {0}")]
    Spawn(std::io::Error),
}
