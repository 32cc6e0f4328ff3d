use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetargetError {
    #[error("tracking source failed to initialize: {0}")]
    SourceInit(String),
    #[error("bone `{0}` is already defined")]
    DuplicateBone(String),
    #[error("parent `{parent}` of bone `{bone}` is not defined before it")]
    UnknownParent { bone: String, parent: String },
    #[error("a tracking session is already running")]
    AlreadyTracking,
}
