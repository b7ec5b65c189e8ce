use thiserror::Error;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("{0} not found; install it or point `engines` at it")]
    NotAvailable(String),
    #[error("{tool} exited with {status}: {stderr}")]
    ToolFailed {
        tool: String,
        status: String,
        stderr: String,
    },
    #[error("Table output parse error: {0}")]
    Csv(#[from] csv::Error),
}
