use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::analysis::generic::operands_of;
use crate::error::{EngineError, EngineResult, Unsupported};
use crate::word::{check_truncation, Word};

/// Concrete operations whose abstractions are verified
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum Operation {
    And,
    Or,
    Xor,
    Add,
    Sub,
    /// Keep the low `width` bits
    Trunc { width: u32 },
}

impl Operation {
    pub fn arity(&self) -> usize {
        match self {
            Self::And | Self::Or | Self::Xor | Self::Add | Self::Sub => 2,
            Self::Trunc { .. } => 1,
        }
    }

    /// Width of the result given the width of the operands
    pub fn result_width(&self, width: u32) -> EngineResult<u32> {
        match self {
            Self::And | Self::Or | Self::Xor | Self::Add | Self::Sub => Ok(width),
            Self::Trunc { width: to } => check_truncation(width, *to),
        }
    }

    /// Concrete semantics, for both concrete and symbolic words
    pub fn eval<W: Word>(&self, args: &[W]) -> EngineResult<W> {
        match self {
            Self::And => {
                let [lhs, rhs] = operands_of::<_, 2>(self, args)?;
                lhs.bvand(rhs)
            }
            Self::Or => {
                let [lhs, rhs] = operands_of::<_, 2>(self, args)?;
                lhs.bvor(rhs)
            }
            Self::Xor => {
                let [lhs, rhs] = operands_of::<_, 2>(self, args)?;
                lhs.bvxor(rhs)
            }
            Self::Add => {
                let [lhs, rhs] = operands_of::<_, 2>(self, args)?;
                lhs.bvadd(rhs)
            }
            Self::Sub => {
                let [lhs, rhs] = operands_of::<_, 2>(self, args)?;
                lhs.bvsub(rhs)
            }
            Self::Trunc { width } => {
                let [operand] = operands_of::<_, 1>(self, args)?;
                operand.truncate(*width)
            }
        }
    }

    /// Every operation the engine knows on `width`-bit operands, including
    /// each narrower truncation
    pub fn all(width: u32) -> Vec<Self> {
        let mut ops = vec![Self::And, Self::Or, Self::Xor, Self::Add, Self::Sub];
        ops.extend((1..width).map(|to| Self::Trunc { width: to }));
        ops
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Xor => write!(f, "xor"),
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Trunc { width } => write!(f, "trunc:{}", width),
        }
    }
}

impl FromStr for Operation {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.to_ascii_lowercase().as_str() {
            "and" => Self::And,
            "or" => Self::Or,
            "xor" => Self::Xor,
            "add" => Self::Add,
            "sub" => Self::Sub,
            other => match other.strip_prefix("trunc:").map(str::parse::<u32>) {
                Some(Ok(width)) => Self::Trunc { width },
                _ => {
                    return Err(EngineError::UnsupportedOperation(Unsupported::Operation(
                        s.to_string(),
                    )))
                }
            },
        };
        Ok(op)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::word::BitVector;

    fn bv(width: u32, bits: u64) -> BitVector {
        BitVector::new(width, bits).unwrap()
    }

    #[test]
    fn names_round_trip() {
        for op in Operation::all(8) {
            assert_eq!(op.to_string().parse::<Operation>().unwrap(), op);
        }
        assert_eq!(
            "TRUNC:3".parse::<Operation>().unwrap(),
            Operation::Trunc { width: 3 }
        );
        assert_eq!(
            "mul".parse::<Operation>(),
            Err(EngineError::UnsupportedOperation(Unsupported::Operation(
                "mul".into()
            )))
        );
        assert!("trunc:x".parse::<Operation>().is_err());
    }

    #[test]
    fn every_truncation_is_listed() {
        let truncations: Vec<_> = Operation::all(4)
            .into_iter()
            .filter(|op| op.arity() == 1)
            .collect();
        assert_eq!(
            truncations,
            [
                Operation::Trunc { width: 1 },
                Operation::Trunc { width: 2 },
                Operation::Trunc { width: 3 },
            ]
        );
        assert_eq!(Operation::all(1).len(), 5);
        for op in Operation::all(8) {
            assert!(op.result_width(8).is_ok(), "{}", op);
        }
    }

    #[test]
    fn concrete_semantics() {
        let (a, b) = (bv(4, 0b1100), bv(4, 0b1010));
        assert_eq!(Operation::And.eval(&[a, b]).unwrap(), bv(4, 0b1000));
        assert_eq!(Operation::Or.eval(&[a, b]).unwrap(), bv(4, 0b1110));
        assert_eq!(Operation::Xor.eval(&[a, b]).unwrap(), bv(4, 0b0110));
        assert_eq!(Operation::Add.eval(&[a, b]).unwrap(), bv(4, 0b0110));
        assert_eq!(Operation::Sub.eval(&[a, b]).unwrap(), bv(4, 0b0010));
        assert_eq!(
            Operation::Trunc { width: 3 }.eval(&[a]).unwrap(),
            bv(3, 0b100)
        );
    }

    #[test]
    fn arity_is_enforced() {
        let a = bv(4, 1);
        assert!(matches!(
            Operation::Add.eval(&[a]),
            Err(EngineError::UnsupportedOperation(Unsupported::Arity {
                expected: 2,
                found: 1,
                ..
            }))
        ));
        assert!(Operation::Trunc { width: 2 }.eval(&[a, a]).is_err());
        assert_eq!(
            Operation::Trunc { width: 4 }.result_width(4),
            Err(EngineError::InvalidWidth(4))
        );
    }
}
