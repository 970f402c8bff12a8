use std::collections::BTreeMap;

use z3::ast::{forall_const, Ast, Bool};
use z3::{Context, Model};

use crate::analysis::generic::{validate, Abstract, AbstractDomain, TransferFunction};
use crate::analysis::operation::Operation;
use crate::error::{EngineError, EngineResult, Unsupported};
use crate::flow::report::Counterexample;
use crate::word::{check_same_width, check_width, BitVector, Logic, Sym, Word};

/// Name of the free variable for component `component` of operand `index`
pub fn operand_component(index: usize, component: &str) -> String {
    format!("op{}.{}", index, component)
}

/// Name of the instance variable of operand `index`
pub fn operand_instance(index: usize) -> String {
    format!("inst{}", index)
}

/// Name of the instance variable of the abstract result
pub const RESULT_INSTANCE: &str = "inst_result";

/// Builder of symbolic abstract values and their instances
pub struct Oracle<'ctx> {
    /// Solver context
    ctx: &'ctx Context,
    /// Width of every operand
    width: u32,
    /// Free variables created so far, reported in counterexamples
    free: Vec<(String, Sym<'ctx>)>,
}

impl<'ctx> Oracle<'ctx> {
    pub fn new(ctx: &'ctx Context, width: u32) -> EngineResult<Self> {
        Ok(Self {
            ctx,
            width: check_width(width)?,
            free: vec![],
        })
    }

    /// A fresh free variable, recorded for counterexample extraction
    fn fresh(&mut self, name: String, width: u32) -> EngineResult<Sym<'ctx>> {
        let var = Sym::variable(self.ctx, &name, width)?;
        self.free.push((name, var.clone()));
        Ok(var)
    }

    /// One symbolic abstract operand per input position of `operation`, each with
    /// the constraint that it is a valid abstract value
    pub fn operands<T: TransferFunction>(
        &mut self,
        operation: &Operation,
        transfer: &T,
    ) -> EngineResult<(Vec<Abstract<T::Domain, Sym<'ctx>>>, Vec<Bool<'ctx>>)> {
        if transfer.arity() != operation.arity() {
            return Err(EngineError::UnsupportedOperation(Unsupported::Arity {
                operation: operation.to_string(),
                expected: operation.arity(),
                found: transfer.arity(),
            }));
        }

        let mut operands = vec![];
        let mut constraints = vec![];
        for index in 0..operation.arity() {
            let mut parts = vec![];
            for component in T::Domain::components() {
                parts.push(self.fresh(operand_component(index, component), self.width)?);
            }
            let operand = T::Domain::from_parts(parts)?;
            constraints.push(T::Domain::validity(&operand)?);
            operands.push(operand);
        }
        Ok((operands, constraints))
    }

    /// Constraint fixing a symbolic value to a concrete one
    pub fn pin<D: AbstractDomain>(
        &self,
        symbolic: &Abstract<D, Sym<'ctx>>,
        concrete: &Abstract<D, BitVector>,
    ) -> EngineResult<Bool<'ctx>> {
        validate::<D>(concrete)?;
        check_same_width(D::width(symbolic), D::width(concrete))?;

        let mut constraint = Bool::from_bool(self.ctx, true);
        for (sym, value) in D::to_parts(symbolic).iter().zip(D::to_parts(concrete)) {
            constraint = constraint.both(&sym.bveq(&sym.constant(value.bits()))?);
        }
        Ok(constraint)
    }

    /// A free variable ranging over the members of `value`
    pub fn instance<D: AbstractDomain>(
        &mut self,
        name: String,
        value: &Abstract<D, Sym<'ctx>>,
    ) -> EngineResult<(Sym<'ctx>, Bool<'ctx>)> {
        let inst = self.fresh(name, D::width(value))?;
        let constraint = D::contains(value, &inst)?;
        Ok((inst, constraint))
    }

    /// A variable ranging over the members of `value`, to be quantified
    pub fn bound_instance<D: AbstractDomain>(
        &self,
        name: String,
        value: &Abstract<D, Sym<'ctx>>,
    ) -> EngineResult<(Sym<'ctx>, Bool<'ctx>)> {
        let inst = Sym::variable(self.ctx, &name, D::width(value))?;
        let constraint = D::contains(value, &inst)?;
        Ok((inst, constraint))
    }

    /// Universal quantification of `body` over `vars`
    pub fn forall(&self, vars: &[Sym<'ctx>], body: &Bool<'ctx>) -> Bool<'ctx> {
        let bounds: Vec<&dyn Ast<'ctx>> = vars
            .iter()
            .map(|var| var.as_bv() as &dyn Ast<'ctx>)
            .collect();
        forall_const(self.ctx, &bounds, &[], body)
    }

    /// Assignment of every free variable under `model`
    pub fn counterexample(&self, model: &Model<'ctx>) -> EngineResult<Counterexample> {
        let mut assignments = BTreeMap::new();
        for (name, var) in &self.free {
            assignments.insert(name.clone(), var.evaluate(model)?);
        }
        Ok(Counterexample::new(self.width, assignments))
    }
}
