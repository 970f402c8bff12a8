use std::fmt::{Display, Formatter};
use std::str::FromStr;

use crate::analysis::generic::{operands_of, AbstractDomain, TransferFunction};
use crate::analysis::operation::Operation;
use crate::error::{EngineError, EngineResult, Unsupported};
use crate::word::{check_same_width, check_truncation, mask, BitVector, Logic, Word};

//
// Constant Range: https://github.com/llvm/llvm-project/blob/main/llvm/lib/IR/ConstantRange.cpp
//

/// Unsigned interval `[umin, umax]`
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Range<W: Word> {
    umin: W, // Lower bound of the range (inclusive)
    umax: W, // Upper bound of the range (inclusive)
}

impl<W: Word> Range<W> {
    pub fn new(umin: W, umax: W) -> EngineResult<Self> {
        check_same_width(umin.width(), umax.width())?;
        Ok(Self { umin, umax })
    }

    pub fn from_constant(value: W) -> Self {
        Self {
            umin: value.clone(),
            umax: value,
        }
    }

    /// The full range of the width of `like`
    pub fn max_range(like: &W) -> Self {
        Self {
            umin: like.zeros(),
            umax: like.ones(),
        }
    }

    pub fn umin(&self) -> &W {
        &self.umin
    }

    pub fn umax(&self) -> &W {
        &self.umax
    }

    pub fn width(&self) -> u32 {
        self.umin.width()
    }

    pub fn validity(&self) -> EngineResult<W::Bool> {
        self.umin.bvule(&self.umax)
    }

    pub fn contains(&self, inst: &W) -> EngineResult<W::Bool> {
        Ok(self.umin.bvule(inst)?.both(&inst.bvule(&self.umax)?))
    }

    /// `then` if `cond` holds, `otherwise` if not
    fn select(cond: &W::Bool, then: &Self, otherwise: &Self) -> EngineResult<Self> {
        Self::new(
            W::select(cond, &then.umin, &otherwise.umin)?,
            W::select(cond, &then.umax, &otherwise.umax)?,
        )
    }
}

impl Range<BitVector> {
    /// Concrete range with invariant checking
    pub fn from_bounds(width: u32, umin: u64, umax: u64) -> EngineResult<Self> {
        let value = Self::new(BitVector::new(width, umin)?, BitVector::new(width, umax)?)?;
        if value.umin.bits() > value.umax.bits() {
            return Err(EngineError::InvalidAbstractValue(format!(
                "range {} is empty",
                value
            )));
        }
        Ok(value)
    }

    pub fn contains_value(&self, value: u64) -> bool {
        self.umin.bits() <= value && value <= self.umax.bits()
    }

    /// Parse the `[umin, umax]` form at the given width
    pub fn parse(width: u32, text: &str) -> EngineResult<Self> {
        let malformed =
            || EngineError::InvalidAbstractValue(format!("malformed range '{}'", text));
        let (lo, hi) = text
            .trim()
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .and_then(|inner| inner.split_once(','))
            .ok_or_else(malformed)?;
        let lo: u64 = lo.trim().parse().map_err(|_| malformed())?;
        let hi: u64 = hi.trim().parse().map_err(|_| malformed())?;
        if lo > mask(width) || hi > mask(width) {
            return Err(EngineError::InvalidAbstractValue(format!(
                "range '{}' does not fit in {} bits",
                text, width
            )));
        }
        Self::from_bounds(width, lo, hi)
    }
}

impl Display for Range<BitVector> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}, {}]", self.umin.bits(), self.umax.bits())
    }
}

/// The unsigned interval lattice
pub struct RangeDomain;

impl AbstractDomain for RangeDomain {
    type Value<W: Word> = Range<W>;

    const NAME: &'static str = "range";

    fn components() -> &'static [&'static str] {
        &["umin", "umax"]
    }

    fn from_parts<W: Word>(parts: Vec<W>) -> EngineResult<Range<W>> {
        let [umin, umax] = operands_of::<_, 2>(&Self::NAME, &parts)?;
        Range::new(umin.clone(), umax.clone())
    }

    fn to_parts<W: Word>(value: &Range<W>) -> Vec<W> {
        vec![value.umin.clone(), value.umax.clone()]
    }

    fn width<W: Word>(value: &Range<W>) -> u32 {
        value.width()
    }

    fn validity<W: Word>(value: &Range<W>) -> EngineResult<W::Bool> {
        value.validity()
    }

    fn contains<W: Word>(value: &Range<W>, inst: &W) -> EngineResult<W::Bool> {
        value.contains(inst)
    }

    fn top<W: Word>(like: &W) -> Range<W> {
        Range::max_range(like)
    }

    fn parse(width: u32, text: &str) -> EngineResult<Range<BitVector>> {
        Range::parse(width, text)
    }

    fn render(value: &Range<BitVector>) -> String {
        value.to_string()
    }
}

fn add<W: Word>(lhs: &Range<W>, rhs: &Range<W>) -> EngineResult<Range<W>> {
    let min_fits = lhs.umin.add_no_overflow(&rhs.umin)?;
    let max_fits = lhs.umax.add_no_overflow(&rhs.umax)?;
    let tight = Range::new(lhs.umin.bvadd(&rhs.umin)?, lhs.umax.bvadd(&rhs.umax)?)?;
    Range::select(
        &min_fits.both(&max_fits),
        &tight,
        &Range::max_range(&lhs.umin),
    )
}

fn sub<W: Word>(lhs: &Range<W>, rhs: &Range<W>) -> EngineResult<Range<W>> {
    let min_fits = lhs.umin.sub_no_underflow(&rhs.umax)?;
    let max_fits = lhs.umax.sub_no_underflow(&rhs.umin)?;
    let tight = Range::new(lhs.umin.bvsub(&rhs.umax)?, lhs.umax.bvsub(&rhs.umin)?)?;
    Range::select(
        &min_fits.both(&max_fits),
        &tight,
        &Range::max_range(&lhs.umin),
    )
}

fn trunc<W: Word>(operand: &Range<W>, width: u32) -> EngineResult<Range<W>> {
    let width = check_truncation(operand.width(), width)?;
    let fits = operand.umax.bvule(&operand.umax.constant(mask(width)))?;
    let tight = Range::new(operand.umin.truncate(width)?, operand.umax.truncate(width)?)?;
    let full = Range::max_range(&operand.umin.constant_of(width, 0)?);
    Range::select(&fits, &tight, &full)
}

/// Transfer functions of the unsigned interval lattice
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum RangeTransfer {
    Add,
    Sub,
    Trunc { width: u32 },
    /// Claims every value possible
    Top,
}

impl RangeTransfer {
    /// The transfer function declared for an operation, if the domain has one
    pub fn standard(op: &Operation) -> Option<Self> {
        match op {
            Operation::Add => Some(Self::Add),
            Operation::Sub => Some(Self::Sub),
            Operation::Trunc { width } => Some(Self::Trunc { width: *width }),
            Operation::And | Operation::Or | Operation::Xor => None,
        }
    }
}

impl Display for RangeTransfer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Add => write!(f, "add"),
            Self::Sub => write!(f, "sub"),
            Self::Trunc { width } => write!(f, "trunc:{}", width),
            Self::Top => write!(f, "top"),
        }
    }
}

impl FromStr for RangeTransfer {
    type Err = EngineError;

    /// `top`, or the name of an operation the domain declares a transfer for
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unsupported = || {
            EngineError::UnsupportedOperation(Unsupported::Transfer {
                domain: RangeDomain::NAME.to_string(),
                name: s.to_string(),
            })
        };
        if s.eq_ignore_ascii_case("top") {
            return Ok(Self::Top);
        }
        let op: Operation = s.parse().map_err(|_| unsupported())?;
        Self::standard(&op).ok_or_else(unsupported)
    }
}

impl TransferFunction for RangeTransfer {
    type Domain = RangeDomain;

    fn name(&self) -> String {
        self.to_string()
    }

    fn arity(&self) -> usize {
        match self {
            Self::Trunc { .. } => 1,
            _ => 2,
        }
    }

    fn apply<W: Word>(&self, operands: &[Range<W>]) -> EngineResult<Range<W>> {
        match self {
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
                Ok(Range::max_range(&lhs.umin))
            }
        }
    }
}
