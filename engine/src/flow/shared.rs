use log::debug;
use serde::{Deserialize, Serialize};
use z3::{Config, Context, Params, SatResult, Solver};

use crate::analysis::generic::{Abstract, AbstractDomain, TransferFunction};
use crate::analysis::operation::Operation;
use crate::error::{EngineError, EngineResult};
use crate::flow::oracle::Oracle;
use crate::flow::report::Outcome;
use crate::word::{check_width, BitVector};

/// Settings shared by every query of a run
#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct Settings {
    /// Width of every operand
    pub width: u32,
    /// Wall-clock limit per query, in milliseconds
    pub timeout_ms: Option<u64>,
}

impl Settings {
    pub fn new(width: u32, timeout_ms: Option<u64>) -> EngineResult<Self> {
        Ok(Self {
            width: check_width(width)?,
            timeout_ms,
        })
    }

    /// Fresh solver context for one query
    pub fn context(&self) -> Context {
        Context::new(&Config::new())
    }

    /// Fresh solver honoring the timeout
    pub fn solver<'ctx>(&self, ctx: &'ctx Context) -> Solver<'ctx> {
        let solver = Solver::new(ctx);
        if let Some(ms) = self.timeout_ms {
            let mut params = Params::new(ctx);
            params.set_u32("timeout", u32::try_from(ms).unwrap_or(u32::MAX));
            solver.set_params(&params);
        }
        solver
    }
}

/// An operation paired with a candidate transfer function
pub struct Target<'a, T: TransferFunction> {
    /// Concrete operation
    pub operation: Operation,
    /// Candidate abstraction of the operation
    pub transfer: &'a T,
    /// Concrete operands to check instead of fully symbolic ones
    pub pinned: Option<&'a [Abstract<T::Domain, BitVector>]>,
}

impl<'a, T: TransferFunction> Target<'a, T> {
    pub fn new(operation: Operation, transfer: &'a T) -> Self {
        Self {
            operation,
            transfer,
            pinned: None,
        }
    }

    pub fn pinned(
        operation: Operation,
        transfer: &'a T,
        operands: &'a [Abstract<T::Domain, BitVector>],
    ) -> Self {
        Self {
            operation,
            transfer,
            pinned: Some(operands),
        }
    }

    pub fn name(&self) -> String {
        format!(
            "{}:{}/{}",
            T::Domain::NAME,
            self.operation,
            self.transfer.name()
        )
    }
}

impl<'a, T: TransferFunction> Clone for Target<'a, T> {
    fn clone(&self) -> Self {
        Self {
            operation: self.operation,
            transfer: self.transfer,
            pinned: self.pinned,
        }
    }
}

/// Discharge the assertions of `solver`: `unsat` proves the property
pub fn decide<'ctx>(solver: &Solver<'ctx>, oracle: &Oracle<'ctx>) -> EngineResult<Outcome> {
    let outcome = match solver.check() {
        SatResult::Unsat => Outcome::Pass,
        SatResult::Sat => {
            let model = solver.get_model().ok_or_else(|| {
                EngineError::InvariantViolation("satisfiable query without a model".to_string())
            })?;
            Outcome::Fail {
                counterexample: oracle.counterexample(&model)?,
            }
        }
        SatResult::Unknown => Outcome::Unknown {
            reason: solver
                .get_reason_unknown()
                .unwrap_or_else(|| "unknown".to_string()),
        },
    };
    debug!("solver outcome: {}", outcome);
    Ok(outcome)
}
