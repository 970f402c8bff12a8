//
// Concrete re-evaluation of solver counterexamples
//

use crate::analysis::generic::{members, validate, Abstract, AbstractDomain, TransferFunction};
use crate::error::{EngineError, EngineResult, Unsupported};
use crate::flow::oracle::{operand_component, operand_instance, RESULT_INSTANCE};
use crate::flow::report::Counterexample;
use crate::flow::shared::Target;
use crate::word::BitVector;

/// Largest number of operand bits whose instantiations are enumerated
const MAX_REPLAY_BITS: u32 = 16;

fn lookup(cex: &Counterexample, name: &str) -> EngineResult<u64> {
    cex.value(name).ok_or_else(|| {
        EngineError::InvariantViolation(format!("counterexample has no value for {}", name))
    })
}

/// The abstract operands a counterexample was found with
fn operands<T: TransferFunction>(
    target: &Target<'_, T>,
    cex: &Counterexample,
) -> EngineResult<Vec<Abstract<T::Domain, BitVector>>> {
    if let Some(pinned) = target.pinned {
        return Ok(pinned.to_vec());
    }

    let mut result = vec![];
    for index in 0..target.operation.arity() {
        let mut parts = vec![];
        for component in T::Domain::components() {
            let bits = lookup(cex, &operand_component(index, component))?;
            parts.push(BitVector::new(cex.width, bits)?);
        }
        let operand = T::Domain::from_parts(parts)?;
        validate::<T::Domain>(&operand)?;
        result.push(operand);
    }
    Ok(result)
}

/// Whether a soundness counterexample is genuine: the concrete result of its
/// instances escapes the abstract result
pub fn replay_soundness<T: TransferFunction>(
    target: &Target<'_, T>,
    cex: &Counterexample,
) -> EngineResult<bool> {
    let operands = operands(target, cex)?;
    let result = target.transfer.apply(&operands)?;

    let mut insts = vec![];
    for (index, operand) in operands.iter().enumerate() {
        let inst = BitVector::new(cex.width, lookup(cex, &operand_instance(index))?)?;
        if !T::Domain::contains(operand, &inst)? {
            return Ok(false);
        }
        insts.push(inst);
    }
    let concrete = target.operation.eval(&insts)?;
    Ok(!T::Domain::contains(&result, &concrete)?)
}

/// Whether a precision counterexample is genuine: the claimed member of the
/// abstract result is produced by no instantiation of the operands
pub fn replay_precision<T: TransferFunction>(
    target: &Target<'_, T>,
    cex: &Counterexample,
) -> EngineResult<bool> {
    let total = cex.width.saturating_mul(target.operation.arity() as u32);
    if total > MAX_REPLAY_BITS {
        return Err(EngineError::UnsupportedOperation(
            Unsupported::ExhaustiveReplay(cex.width),
        ));
    }

    let operands = operands(target, cex)?;
    let result = target.transfer.apply(&operands)?;
    let claimed = BitVector::new(
        target.operation.result_width(cex.width)?,
        lookup(cex, RESULT_INSTANCE)?,
    )?;
    if !T::Domain::contains(&result, &claimed)? {
        return Ok(false);
    }

    let mut candidates = vec![];
    for operand in &operands {
        candidates.push(members::<T::Domain>(operand)?);
    }
    let reached = reachable(target, &candidates, &mut vec![], &claimed)?;
    Ok(!reached)
}

/// Depth-first walk over the instantiations of the operands
fn reachable<T: TransferFunction>(
    target: &Target<'_, T>,
    candidates: &[Vec<BitVector>],
    prefix: &mut Vec<BitVector>,
    claimed: &BitVector,
) -> EngineResult<bool> {
    let Some((first, rest)) = candidates.split_first() else {
        return Ok(target.operation.eval(prefix)? == *claimed);
    };
    for inst in first {
        prefix.push(*inst);
        let found = reachable(target, rest, prefix, claimed)?;
        prefix.pop();
        if found {
            return Ok(true);
        }
    }
    Ok(false)
}
