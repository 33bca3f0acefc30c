#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown progress status: {0}")]
    UnknownStatus(String),
    #[error("unknown item type: {0}")]
    UnknownItemType(String),
    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: i64 },
}
