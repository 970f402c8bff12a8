use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::word::{check_same_width, check_truncation, check_width, mask, Logic, Word};

/// A concrete fixed-width bit-vector
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Serialize, Deserialize)]
pub struct BitVector {
    width: u32,
    bits: u64,
}

impl BitVector {
    /// Create a bit-vector, reducing `bits` modulo `2^width`
    pub fn new(width: u32, bits: u64) -> EngineResult<Self> {
        let width = check_width(width)?;
        Ok(Self {
            width,
            bits: bits & mask(width),
        })
    }

    pub fn bits(&self) -> u64 {
        self.bits
    }

    /// Whether bit `index` is set, `index` counted from the least significant bit
    pub fn bit(&self, index: u32) -> bool {
        index < self.width && (self.bits >> index) & 1 == 1
    }

    /// All values of the given width, in ascending order
    pub fn all_values(width: u32) -> EngineResult<impl Iterator<Item = BitVector>> {
        let width = check_width(width)?;
        Ok((0..=mask(width)).map(move |bits| BitVector { width, bits }))
    }

    fn lift(&self, bits: u64) -> Self {
        Self {
            width: self.width,
            bits: bits & mask(self.width),
        }
    }

    fn binary(&self, other: &Self, f: impl Fn(u64, u64) -> u64) -> EngineResult<Self> {
        check_same_width(self.width, other.width)?;
        Ok(self.lift(f(self.bits, other.bits)))
    }

    fn compare(&self, other: &Self, f: impl Fn(u64, u64) -> bool) -> EngineResult<bool> {
        check_same_width(self.width, other.width)?;
        Ok(f(self.bits, other.bits))
    }
}

impl Display for BitVector {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.bits, self.width)
    }
}

impl Logic for bool {
    fn both(&self, other: &Self) -> Self {
        *self && *other
    }

    fn either(&self, other: &Self) -> Self {
        *self || *other
    }

    fn negate(&self) -> Self {
        !*self
    }
}

impl Word for BitVector {
    type Bool = bool;

    fn width(&self) -> u32 {
        self.width
    }

    fn constant(&self, value: u64) -> Self {
        self.lift(value)
    }

    fn constant_of(&self, width: u32, value: u64) -> EngineResult<Self> {
        BitVector::new(width, value)
    }

    fn truth(&self, value: bool) -> bool {
        value
    }

    fn bvand(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a & b)
    }

    fn bvor(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a | b)
    }

    fn bvxor(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a ^ b)
    }

    fn bvadd(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a.wrapping_add(b))
    }

    fn bvsub(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a.wrapping_sub(b))
    }

    fn bvnot(&self) -> Self {
        self.lift(!self.bits)
    }

    fn bvule(&self, other: &Self) -> EngineResult<bool> {
        self.compare(other, |a, b| a <= b)
    }

    fn bveq(&self, other: &Self) -> EngineResult<bool> {
        self.compare(other, |a, b| a == b)
    }

    fn add_no_overflow(&self, other: &Self) -> EngineResult<bool> {
        let limit = mask(self.width);
        self.compare(other, |a, b| b <= limit - a)
    }

    fn sub_no_underflow(&self, other: &Self) -> EngineResult<bool> {
        self.compare(other, |a, b| a >= b)
    }

    fn truncate(&self, width: u32) -> EngineResult<Self> {
        let width = check_truncation(self.width, width)?;
        BitVector::new(width, self.bits)
    }

    fn select(cond: &bool, then: &Self, otherwise: &Self) -> EngineResult<Self> {
        check_same_width(then.width, otherwise.width)?;
        Ok(if *cond { *then } else { *otherwise })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn bv(width: u32, bits: u64) -> BitVector {
        BitVector::new(width, bits).unwrap()
    }

    #[test]
    fn construction_requires_positive_width() {
        assert_eq!(BitVector::new(0, 1), Err(EngineError::InvalidWidth(0)));
        assert_eq!(BitVector::new(65, 1), Err(EngineError::InvalidWidth(65)));
        assert_eq!(bv(4, 0x1f).bits(), 0xf);
        assert_eq!(bv(64, u64::MAX).bits(), u64::MAX);
    }

    #[test]
    fn arithmetic_wraps_at_width() {
        assert_eq!(bv(4, 15).bvadd(&bv(4, 1)).unwrap(), bv(4, 0));
        assert_eq!(bv(4, 0).bvsub(&bv(4, 1)).unwrap(), bv(4, 15));
        assert_eq!(bv(64, u64::MAX).bvadd(&bv(64, 2)).unwrap(), bv(64, 1));
        assert_eq!(bv(8, 0b1010_0000).bvnot(), bv(8, 0b0101_1111));
        assert_eq!(bv(3, 0).bvnot(), bv(3, 7));
    }

    #[test]
    fn operands_must_share_width() {
        let err = bv(4, 1).bvand(&bv(8, 1)).unwrap_err();
        assert_eq!(
            err,
            EngineError::WidthMismatch {
                expected: 4,
                found: 8
            }
        );
        assert!(bv(4, 1).bvule(&bv(5, 1)).is_err());
    }

    #[test]
    fn overflow_predicates() {
        assert!(bv(4, 7).add_no_overflow(&bv(4, 8)).unwrap());
        assert!(!bv(4, 8).add_no_overflow(&bv(4, 8)).unwrap());
        assert!(bv(64, u64::MAX).add_no_overflow(&bv(64, 0)).unwrap());
        assert!(!bv(64, u64::MAX).add_no_overflow(&bv(64, 1)).unwrap());
        assert!(bv(4, 3).sub_no_underflow(&bv(4, 3)).unwrap());
        assert!(!bv(4, 2).sub_no_underflow(&bv(4, 3)).unwrap());
    }

    #[test]
    fn truncation_keeps_low_bits() {
        assert_eq!(bv(8, 0xab).truncate(4).unwrap(), bv(4, 0xb));
        assert_eq!(
            bv(8, 0xab).truncate(8),
            Err(EngineError::InvalidWidth(8))
        );
        assert_eq!(bv(8, 0xab).truncate(0), Err(EngineError::InvalidWidth(0)));
    }
}
