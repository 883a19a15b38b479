/// Errors produced by type-level encoding and decoding.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypeError {
    #[error("codec error: {0}")]
    Codec(String),
}
