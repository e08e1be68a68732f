use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] merit_store::StoreError),

    #[error("action error: {0}")]
    Action(#[from] merit_actions::ActionError),

    #[error("chain error: {0}")]
    Chain(#[from] merit_chain::ChainError),

    #[error("realtime error: {0}")]
    Realtime(#[from] merit_realtime::RealtimeError),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}
