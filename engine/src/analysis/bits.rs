//
// Known Bits: https://github.com/llvm/llvm-project/blob/main/llvm/lib/Support/KnownBits.cpp
//

use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::analysis::generic::{operands_of, AbstractDomain, TransferFunction};
use crate::analysis::operation::Operation;
use crate::error::{EngineError, EngineResult, Unsupported};
use crate::word::{check_same_width, check_width, mask, BitVector, Logic, Word};

/// Per-bit knowledge of a word
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct KnownBits<W: Word> {
    zero: W, // Bits known to be 0
    one: W,  // Bits known to be 1
}

impl<W: Word> KnownBits<W> {
    pub fn new(zero: W, one: W) -> EngineResult<Self> {
        check_same_width(zero.width(), one.width())?;
        Ok(Self { zero, one })
    }

    /// Nothing known about any bit
    pub fn top(like: &W) -> Self {
        Self {
            zero: like.zeros(),
            one: like.zeros(),
        }
    }

    pub fn zero(&self) -> &W {
        &self.zero
    }

    pub fn one(&self) -> &W {
        &self.one
    }

    pub fn width(&self) -> u32 {
        self.zero.width()
    }

    /// Largest value in the set
    pub fn max_value(&self) -> W {
        self.zero.bvnot()
    }

    /// Smallest value in the set
    pub fn min_value(&self) -> W {
        self.one.clone()
    }

    /// Bits known either way
    pub fn known(&self) -> EngineResult<W> {
        self.zero.bvor(&self.one)
    }

    /// Same value with the roles of zero and one exchanged (the bitwise complement)
    pub fn complement(&self) -> Self {
        Self {
            zero: self.one.clone(),
            one: self.zero.clone(),
        }
    }

    pub fn validity(&self) -> EngineResult<W::Bool> {
        self.zero.bvand(&self.one)?.bveq(&self.zero.zeros())
    }

    pub fn contains(&self, inst: &W) -> EngineResult<W::Bool> {
        let no_stray_one = inst.bvand(&self.zero)?.bveq(&inst.zeros())?;
        let no_stray_zero = inst.bvnot().bvand(&self.one)?.bveq(&inst.zeros())?;
        Ok(no_stray_one.both(&no_stray_zero))
    }
}

/// Order of the characters in the textual form
#[derive(Copy, Clone, Eq, PartialEq, Debug)]
pub enum BitOrder {
    /// Leftmost character is the most significant bit, as in a binary literal
    MsbFirst,
    /// Leftmost character is bit 0
    LsbFirst,
}

impl BitOrder {
    fn index(&self, width: u32, position: u32) -> u32 {
        match self {
            Self::MsbFirst => width - 1 - position,
            Self::LsbFirst => position,
        }
    }
}

impl KnownBits<BitVector> {
    /// The fully known value `value`
    pub fn from_constant(width: u32, value: u64) -> EngineResult<Self> {
        let one = BitVector::new(width, value)?;
        Ok(Self {
            zero: one.bvnot(),
            one,
        })
    }

    /// Concrete value with invariant checking
    pub fn from_masks(width: u32, zero: u64, one: u64) -> EngineResult<Self> {
        let value = Self::new(BitVector::new(width, zero)?, BitVector::new(width, one)?)?;
        if value.has_conflict() {
            return Err(EngineError::InvalidAbstractValue(format!(
                "known bits with zero {:#x} and one {:#x} overlap",
                zero, one
            )));
        }
        Ok(value)
    }

    /// Some bit claimed to be both 0 and 1
    pub fn has_conflict(&self) -> bool {
        self.zero.bits() & self.one.bits() != 0
    }

    /// `Some(bit)` if bit `index` is known, `None` if unknown
    pub fn bit(&self, index: u32) -> Option<bool> {
        if self.one.bit(index) {
            Some(true)
        } else if self.zero.bit(index) {
            Some(false)
        } else {
            None
        }
    }

    pub fn is_constant(&self) -> bool {
        self.zero.bits() | self.one.bits() == mask(self.width())
    }

    pub fn contains_value(&self, value: u64) -> bool {
        value & self.zero.bits() == 0
            && !value & self.one.bits() == 0
            && value <= mask(self.width())
    }

    pub fn parse(text: &str, order: BitOrder) -> EngineResult<Self> {
        let width = check_width(u32::try_from(text.chars().count()).unwrap_or(0)).map_err(|_| {
            EngineError::InvalidAbstractValue(format!("known bits of invalid length: '{}'", text))
        })?;
        let mut zero = 0u64;
        let mut one = 0u64;
        for (position, c) in (0..width).zip(text.chars()) {
            let index = order.index(width, position);
            match c {
                '0' => zero |= 1 << index,
                '1' => one |= 1 << index,
                'X' | 'x' => (),
                _ => {
                    return Err(EngineError::InvalidAbstractValue(format!(
                        "unexpected character '{}' in known bits '{}'",
                        c, text
                    )))
                }
            }
        }
        Self::from_masks(width, zero, one)
    }

    pub fn render(&self, order: BitOrder) -> String {
        let width = self.width();
        (0..width)
            .map(|position| match self.bit(order.index(width, position)) {
                Some(true) => '1',
                Some(false) => '0',
                None => 'X',
            })
            .collect()
    }
}

impl Display for KnownBits<BitVector> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(BitOrder::MsbFirst))
    }
}

impl FromStr for KnownBits<BitVector> {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s, BitOrder::MsbFirst)
    }
}

/// The known bits lattice
pub struct KnownBitsDomain;

impl AbstractDomain for KnownBitsDomain {
    type Value<W: Word> = KnownBits<W>;

    const NAME: &'static str = "known-bits";

    fn components() -> &'static [&'static str] {
        &["zero", "one"]
    }

    fn from_parts<W: Word>(parts: Vec<W>) -> EngineResult<KnownBits<W>> {
        let [zero, one] = operands_of::<_, 2>(&Self::NAME, &parts)?;
        KnownBits::new(zero.clone(), one.clone())
    }

    fn to_parts<W: Word>(value: &KnownBits<W>) -> Vec<W> {
        vec![value.zero.clone(), value.one.clone()]
    }

    fn width<W: Word>(value: &KnownBits<W>) -> u32 {
        value.width()
    }

    fn validity<W: Word>(value: &KnownBits<W>) -> EngineResult<W::Bool> {
        value.validity()
    }

    fn contains<W: Word>(value: &KnownBits<W>, inst: &W) -> EngineResult<W::Bool> {
        value.contains(inst)
    }

    fn top<W: Word>(like: &W) -> KnownBits<W> {
        KnownBits::top(like)
    }

    fn parse(width: u32, text: &str) -> EngineResult<KnownBits<BitVector>> {
        let value: KnownBits<BitVector> = text.parse()?;
        check_same_width(width, value.width())?;
        Ok(value)
    }

    fn render(value: &KnownBits<BitVector>) -> String {
        value.to_string()
    }
}

fn and<W: Word>(lhs: &KnownBits<W>, rhs: &KnownBits<W>) -> EngineResult<KnownBits<W>> {
    KnownBits::new(lhs.zero.bvor(&rhs.zero)?, lhs.one.bvand(&rhs.one)?)
}

fn or<W: Word>(lhs: &KnownBits<W>, rhs: &KnownBits<W>) -> EngineResult<KnownBits<W>> {
    KnownBits::new(lhs.zero.bvand(&rhs.zero)?, lhs.one.bvor(&rhs.one)?)
}

fn xor<W: Word>(lhs: &KnownBits<W>, rhs: &KnownBits<W>) -> EngineResult<KnownBits<W>> {
    let zero = lhs
        .zero
        .bvand(&rhs.zero)?
        .bvor(&lhs.one.bvand(&rhs.one)?)?;
    let one = lhs
        .zero
        .bvand(&rhs.one)?
        .bvor(&lhs.one.bvand(&rhs.zero)?)?;
    KnownBits::new(zero, one)
}

/// Sum of two known-bits values plus a known carry-in of `carry` (0 or 1).
///
/// The extreme sums bound every carry chain: a bit of the result is known when
/// both addends know it and the carry into it is the same in both extremes.
fn add_with_carry<W: Word>(
    lhs: &KnownBits<W>,
    rhs: &KnownBits<W>,
    carry: u64,
) -> EngineResult<KnownBits<W>> {
    let carry = lhs.zero.constant(carry);
    let possible_sum_zero = lhs.max_value().bvadd(&rhs.max_value())?.bvadd(&carry)?;
    let possible_sum_one = lhs.min_value().bvadd(&rhs.min_value())?.bvadd(&carry)?;

    let carry_known_zero = possible_sum_zero
        .bvxor(&lhs.zero)?
        .bvxor(&rhs.zero)?
        .bvnot();
    let carry_known_one = possible_sum_one.bvxor(&lhs.one)?.bvxor(&rhs.one)?;

    let known = carry_known_zero
        .bvor(&carry_known_one)?
        .bvand(&lhs.known()?)?
        .bvand(&rhs.known()?)?;
    KnownBits::new(
        possible_sum_zero.bvnot().bvand(&known)?,
        possible_sum_one.bvand(&known)?,
    )
}

fn add<W: Word>(lhs: &KnownBits<W>, rhs: &KnownBits<W>) -> EngineResult<KnownBits<W>> {
    add_with_carry(lhs, rhs, 0)
}

/// `lhs - rhs` computed as `lhs + ~rhs + 1`
fn sub<W: Word>(lhs: &KnownBits<W>, rhs: &KnownBits<W>) -> EngineResult<KnownBits<W>> {
    add_with_carry(lhs, &rhs.complement(), 1)
}

fn trunc<W: Word>(operand: &KnownBits<W>, width: u32) -> EngineResult<KnownBits<W>> {
    KnownBits::new(operand.zero.truncate(width)?, operand.one.truncate(width)?)
}

/// Transfer functions of the known bits lattice
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum KnownBitsTransfer {
    And,
    Or,
    Xor,
    Add,
    Sub,
    Trunc { width: u32 },
    /// Claims nothing about any bit
    Top,
}

impl KnownBitsTransfer {
    /// The transfer function declared for an operation
    pub fn standard(op: &Operation) -> Self {
        match op {
            Operation::And => Self::And,
            Operation::Or => Self::Or,
            Operation::Xor => Self::Xor,
            Operation::Add => Self::Add,
            Operation::Sub => Self::Sub,
            Operation::Trunc { width } => Self::Trunc { width: *width },
        }
    }
}

impl Display for KnownBitsTransfer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::And => write!(f, "and"),
            Self::Or => write!(f, "or"),
            Self::Xor => write!(f, "xor"),
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Trunc { width } => write!(f, "trunc:{}", width),
            Self::Top => write!(f, "top"),
        }
    }
}

impl FromStr for KnownBitsTransfer {
    type Err = EngineError;

    /// `top`, or the name of the operation whose declared transfer is meant
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("top") {
            return Ok(Self::Top);
        }
        let op: Operation = s.parse().map_err(|_| {
            EngineError::UnsupportedOperation(Unsupported::Transfer {
                domain: KnownBitsDomain::NAME.to_string(),
                name: s.to_string(),
            })
        })?;
        Ok(Self::standard(&op))
    }
}

impl TransferFunction for KnownBitsTransfer {
    type Domain = KnownBitsDomain;

    fn name(&self) -> String {
        self.to_string()
    }

    fn arity(&self) -> usize {
        match self {
            Self::Trunc { .. } => 1,
            _ => 2,
        }
    }

    fn apply<W: Word>(&self, operands: &[KnownBits<W>]) -> EngineResult<KnownBits<W>> {
        match self {
            Self::And => {
                let [lhs, rhs] = operands_of::<_, 2>(self, operands)?;
                and(lhs, rhs)
            }
            Self::Or => {
                let [lhs, rhs] = operands_of::<_, 2>(self, operands)?;
                or(lhs, rhs)
            }
            Self::Xor => {
                let [lhs, rhs] = operands_of::<_, 2>(self, operands)?;
                xor(lhs, rhs)
            }
            Self::Add => {
                let [lhs, rhs] = operands_of::<_, 2>(self, operands)?;
                add(lhs, rhs)
            }
            Self::Sub => {
                let [lhs, rhs] = operands_of::<_, 2>(self, operands)?;
                sub(lhs, rhs)
            }
            Self::Trunc { width } => {
                let [operand] = operands_of::<_, 1>(self, operands)?;
                trunc(operand, *width)
            }
            Self::Top => {
                let [lhs, _] = operands_of::<_, 2>(self, operands)?;
                Ok(KnownBits::top(&lhs.zero))
            }
        }
    }
}
