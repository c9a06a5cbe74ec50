use thiserror::Error;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Watcher error: {0}")]
    Watcher(String),

    #[error("Invalid ignore pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Index is not initialized; call initialize with at least one project root first")]
    NotInitialized,

    #[error("Indexing already in progress; retry once the current run has finished")]
    Busy,

    #[error("MCP error: {0}")]
    Mcp(String),
}

pub type Result<T> = std::result::Result<T, IndexerError>;
