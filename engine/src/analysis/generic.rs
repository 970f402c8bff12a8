use std::fmt::{Debug, Display};

use crate::analysis::operation::Operation;
use crate::error::{EngineError, EngineResult, Unsupported};
use crate::word::{BitVector, Word};

/// An abstract domain over fixed-width words.
///
/// Each abstract value is a tuple of words (its components) that may be either
/// concrete or symbolic, tied together by a validity predicate. A concrete word
/// is a member of an abstract value when the containment predicate holds.
pub trait AbstractDomain: 'static {
    /// An abstract value generic over its word representation
    type Value<W: Word>: Clone + Debug;

    /// Identifier of the domain
    const NAME: &'static str;

    /// Names of the components, in the order of `to_parts`
    fn components() -> &'static [&'static str];

    /// Assemble a value from its components
    fn from_parts<W: Word>(parts: Vec<W>) -> EngineResult<Self::Value<W>>;

    /// Split a value into its components
    fn to_parts<W: Word>(value: &Self::Value<W>) -> Vec<W>;

    /// Width of the words abstracted by this value
    fn width<W: Word>(value: &Self::Value<W>) -> u32;

    /// Whether the value is internally consistent
    fn validity<W: Word>(value: &Self::Value<W>) -> EngineResult<W::Bool>;

    /// Whether `inst` is one of the words represented by `value`
    fn contains<W: Word>(value: &Self::Value<W>, inst: &W) -> EngineResult<W::Bool>;

    /// The unconstrained value with the width of `like`
    fn top<W: Word>(like: &W) -> Self::Value<W>;

    /// Parse the textual form of a concrete value
    fn parse(width: u32, text: &str) -> EngineResult<Self::Value<BitVector>>;

    /// Textual form of a concrete value
    fn render(value: &Self::Value<BitVector>) -> String;
}

/// Shorthand for the value type of a domain
pub type Abstract<D, W> = <D as AbstractDomain>::Value<W>;

/// A candidate abstract counterpart of a concrete operation.
///
/// Implementations must be pure: the result depends on the operands only.
pub trait TransferFunction {
    type Domain: AbstractDomain;

    /// Human-readable identifier
    fn name(&self) -> String;

    /// Number of abstract operands consumed
    fn arity(&self) -> usize;

    /// Compute the abstract result
    fn apply<W: Word>(
        &self,
        operands: &[Abstract<Self::Domain, W>],
    ) -> EngineResult<Abstract<Self::Domain, W>>;
}

/// Check that a concrete value supplied from outside respects its invariant
pub fn validate<D: AbstractDomain>(value: &Abstract<D, BitVector>) -> EngineResult<()> {
    if !D::validity(value)? {
        return Err(EngineError::InvalidAbstractValue(format!(
            "{} value {} violates its validity invariant",
            D::NAME,
            D::render(value)
        )));
    }
    Ok(())
}

/// Concrete members of an abstract value, enumerated over all words of its width
pub fn members<D: AbstractDomain>(value: &Abstract<D, BitVector>) -> EngineResult<Vec<BitVector>> {
    let mut result = vec![];
    for inst in BitVector::all_values(D::width(value))? {
        if D::contains(value, &inst)? {
            result.push(inst);
        }
    }
    Ok(result)
}

/// Split a slice of operands into exactly `N` references, or fail on arity
pub fn operands_of<'a, T, const N: usize>(
    operation: &dyn Display,
    operands: &'a [T],
) -> EngineResult<[&'a T; N]> {
    let refs: Vec<&T> = operands.iter().collect();
    refs.try_into().map_err(|refs: Vec<&T>| {
        EngineError::UnsupportedOperation(Unsupported::Arity {
            operation: operation.to_string(),
            expected: N,
            found: refs.len(),
        })
    })
}

/// Evaluate a transfer function alongside its operation, mostly for adapters
pub fn evaluate<T: TransferFunction>(
    operation: &Operation,
    transfer: &T,
    operands: &[Abstract<T::Domain, BitVector>],
) -> EngineResult<Abstract<T::Domain, BitVector>> {
    if operands.len() != operation.arity() {
        return Err(EngineError::UnsupportedOperation(Unsupported::Arity {
            operation: operation.to_string(),
            expected: operation.arity(),
            found: operands.len(),
        }));
    }
    for operand in operands {
        validate::<T::Domain>(operand)?;
    }
    transfer.apply(operands)
}
