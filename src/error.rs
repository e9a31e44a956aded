use thiserror::Error;

/// Failure taxonomy for the execution engine.
///
/// Node-level failures (`MissingArguments`, `Timeout`, `Process`) are terminal
/// for that node; `Launch` signals an infrastructure problem rather than a
/// user-script problem, so the pipeline reports it as `error` instead of
/// `failed`.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Script unparsable, or no callable/implicit entry found.
    #[error("analysis failed: {0}")]
    Analysis(String),

    /// Formal parameters with no corresponding call argument, checked before
    /// any process is launched.
    #[error("missing required function arguments: {}", .0.join(", "))]
    MissingArguments(Vec<String>),

    /// Child process exceeded its wall-clock budget.
    #[error("execution timed out after {0} seconds")]
    Timeout(u64),

    /// Child exited abnormally without a parseable result block.
    #[error("process failed: {0}")]
    Process(String),

    /// The OS failed to spawn the child process at all.
    #[error("failed to launch process: {0}")]
    Launch(String),

    /// Invalid pipeline input (e.g. an empty node list).
    #[error("pipeline error: {0}")]
    Pipeline(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
