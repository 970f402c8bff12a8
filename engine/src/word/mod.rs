//
// Fixed-width machine words, evaluated either concretely or symbolically
//

use std::fmt::Debug;

use crate::error::{EngineError, EngineResult};

pub mod concrete;
pub mod symbolic;

pub use concrete::BitVector;
pub use symbolic::Sym;

/// Widest word the engine handles
pub const MAX_WIDTH: u32 = 64;

/// Boolean results of word comparisons
pub trait Logic: Clone + Debug {
    /// Conjunction
    fn both(&self, other: &Self) -> Self;

    /// Disjunction
    fn either(&self, other: &Self) -> Self;

    /// Negation
    fn negate(&self) -> Self;
}

/// A bit-vector of a declared width with modular arithmetic.
///
/// Transfer functions, containment and validity predicates are written against
/// this trait only, so the very same code is run on concrete values and turned
/// into solver terms.
pub trait Word: Clone + Debug + Sized {
    type Bool: Logic;

    /// Declared width in bits
    fn width(&self) -> u32;

    /// A constant of the same width (value reduced modulo `2^width`)
    fn constant(&self, value: u64) -> Self;

    /// A constant of another width
    fn constant_of(&self, width: u32, value: u64) -> EngineResult<Self>;

    /// A boolean constant
    fn truth(&self, value: bool) -> Self::Bool;

    fn bvand(&self, other: &Self) -> EngineResult<Self>;
    fn bvor(&self, other: &Self) -> EngineResult<Self>;
    fn bvxor(&self, other: &Self) -> EngineResult<Self>;
    fn bvadd(&self, other: &Self) -> EngineResult<Self>;
    fn bvsub(&self, other: &Self) -> EngineResult<Self>;

    /// Complement of exactly `width` bits
    fn bvnot(&self) -> Self;

    /// Unsigned less-or-equal
    fn bvule(&self, other: &Self) -> EngineResult<Self::Bool>;

    fn bveq(&self, other: &Self) -> EngineResult<Self::Bool>;

    /// `self + other` does not wrap around (unsigned)
    fn add_no_overflow(&self, other: &Self) -> EngineResult<Self::Bool>;

    /// `self - other` does not wrap around (unsigned)
    fn sub_no_underflow(&self, other: &Self) -> EngineResult<Self::Bool>;

    /// Keep the low `width` bits, requires `1 <= width < self.width()`
    fn truncate(&self, width: u32) -> EngineResult<Self>;

    /// `then` if `cond` holds, `otherwise` if not
    fn select(cond: &Self::Bool, then: &Self, otherwise: &Self) -> EngineResult<Self>;

    /// The all-zeros word
    fn zeros(&self) -> Self {
        self.constant(0)
    }

    /// The all-ones word
    fn ones(&self) -> Self {
        self.constant(mask(self.width()))
    }
}

/// All-ones value of the given width
pub fn mask(width: u32) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Reject widths the engine cannot represent
pub fn check_width(width: u32) -> EngineResult<u32> {
    if width == 0 || width > MAX_WIDTH {
        return Err(EngineError::InvalidWidth(width));
    }
    Ok(width)
}

/// Reject operands whose widths differ
pub fn check_same_width(expected: u32, found: u32) -> EngineResult<()> {
    if expected != found {
        return Err(EngineError::WidthMismatch { expected, found });
    }
    Ok(())
}

/// Reject truncation targets that do not shrink the word
pub fn check_truncation(from: u32, to: u32) -> EngineResult<u32> {
    if to == 0 || to >= from {
        return Err(EngineError::InvalidWidth(to));
    }
    Ok(to)
}

/// Conjunction of all constraints, `true` when empty
pub fn all<W: Word>(like: &W, items: &[W::Bool]) -> W::Bool {
    items
        .iter()
        .fold(like.truth(true), |acc, item| acc.both(item))
}
