use thiserror::Error;

/// Error taxonomy for graph construction, compilation, and execution.
#[derive(Error, Debug)]
pub enum VectoriaError {
    #[error("structural error: {0}")]
    Structural(String),

    #[error("shape error: {0}")]
    Shape(String),

    #[error("policy error: {0}")]
    Policy(String),

    #[error("kernel failure: {0}")]
    Kernel(String),

    #[error("resource error: {0}")]
    Resource(String),

    #[error("usage error: {0}")]
    Usage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type VectoriaResult<T> = Result<T, VectoriaError>;

impl VectoriaError {
    pub fn structural(msg: impl Into<String>) -> Self {
        VectoriaError::Structural(msg.into())
    }

    pub fn shape(msg: impl Into<String>) -> Self {
        VectoriaError::Shape(msg.into())
    }

    pub fn policy(msg: impl Into<String>) -> Self {
        VectoriaError::Policy(msg.into())
    }

    pub fn kernel(msg: impl Into<String>) -> Self {
        VectoriaError::Kernel(msg.into())
    }

    pub fn resource(msg: impl Into<String>) -> Self {
        VectoriaError::Resource(msg.into())
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        VectoriaError::Usage(msg.into())
    }
}
