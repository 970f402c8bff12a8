use std::error::Error;
use std::fmt::{Display, Formatter};

/// A list of requests the engine does not handle
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Unsupported {
    /// Operation name not recognized
    Operation(String),
    /// Transfer function name not recognized in a domain
    Transfer { domain: String, name: String },
    /// Transfer function arity does not fit the operation
    Arity {
        operation: String,
        expected: usize,
        found: usize,
    },
    /// Concrete enumeration of instances at a width too large to enumerate
    ExhaustiveReplay(u32),
}

impl Display for Unsupported {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Operation(name) => {
                write!(f, "operation '{}'", name)
            }
            Self::Transfer { domain, name } => {
                write!(f, "{} transfer function '{}'", domain, name)
            }
            Self::Arity {
                operation,
                expected,
                found,
            } => {
                write!(
                    f,
                    "{} expects {} operand(s) but the transfer function takes {}",
                    operation, expected, found
                )
            }
            Self::ExhaustiveReplay(width) => {
                write!(f, "exhaustive replay at width {}", width)
            }
        }
    }
}

/// A custom error message for the verification engine
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum EngineError {
    /// Operands of differing widths were combined
    WidthMismatch { expected: u32, found: u32 },
    /// Width outside of the supported bounds
    InvalidWidth(u32),
    /// Externally supplied abstract value violates its validity invariant
    InvalidAbstractValue(String),
    /// Operation or arity not recognized
    UnsupportedOperation(Unsupported),
    /// Job description that cannot be read
    InvalidJob(String),
    /// Invariant violation
    InvariantViolation(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

impl Display for EngineError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WidthMismatch { expected, found } => {
                write!(
                    f,
                    "[xfer::width] expected width {} but found {}",
                    expected, found
                )
            }
            Self::InvalidWidth(width) => {
                write!(f, "[xfer::width] invalid width {}", width)
            }
            Self::InvalidAbstractValue(msg) => {
                write!(f, "[xfer::abstract] {}", msg)
            }
            Self::UnsupportedOperation(item) => {
                write!(f, "[xfer::unsupported] {}", item)
            }
            Self::InvalidJob(msg) => {
                write!(f, "[xfer::job] {}", msg)
            }
            Self::InvariantViolation(msg) => {
                write!(f, "[xfer::invariant] {}", msg)
            }
        }
    }
}

impl Error for EngineError {}
