use z3::ast::{Ast, Bool, BV};
use z3::{Context, Model};

use crate::error::{EngineError, EngineResult};
use crate::word::{check_same_width, check_truncation, check_width, mask, Logic, Word};

/// A bit-vector term in a z3 context
#[derive(Clone, Debug)]
pub struct Sym<'ctx> {
    bv: BV<'ctx>,
}

impl<'ctx> Sym<'ctx> {
    /// A free variable
    pub fn variable(ctx: &'ctx Context, name: &str, width: u32) -> EngineResult<Self> {
        let width = check_width(width)?;
        Ok(Self {
            bv: BV::new_const(ctx, name, width),
        })
    }

    /// A literal
    pub fn literal(ctx: &'ctx Context, width: u32, value: u64) -> EngineResult<Self> {
        let width = check_width(width)?;
        Ok(Self {
            bv: BV::from_u64(ctx, value & mask(width), width),
        })
    }

    pub fn as_bv(&self) -> &BV<'ctx> {
        &self.bv
    }

    /// Value of this term under a model
    pub fn evaluate(&self, model: &Model<'ctx>) -> EngineResult<u64> {
        model
            .eval(&self.bv, true)
            .and_then(|value| value.as_u64())
            .ok_or_else(|| {
                EngineError::InvariantViolation(format!("no model value for {}", self.bv))
            })
    }

    fn binary(
        &self,
        other: &Self,
        f: impl Fn(&BV<'ctx>, &BV<'ctx>) -> BV<'ctx>,
    ) -> EngineResult<Self> {
        check_same_width(self.width(), other.width())?;
        Ok(Self {
            bv: f(&self.bv, &other.bv),
        })
    }

    fn compare(
        &self,
        other: &Self,
        f: impl Fn(&BV<'ctx>, &BV<'ctx>) -> Bool<'ctx>,
    ) -> EngineResult<Bool<'ctx>> {
        check_same_width(self.width(), other.width())?;
        Ok(f(&self.bv, &other.bv))
    }
}

impl<'ctx> Logic for Bool<'ctx> {
    fn both(&self, other: &Self) -> Self {
        Bool::and(self.get_ctx(), &[self, other])
    }

    fn either(&self, other: &Self) -> Self {
        Bool::or(self.get_ctx(), &[self, other])
    }

    fn negate(&self) -> Self {
        self.not()
    }
}

impl<'ctx> Word for Sym<'ctx> {
    type Bool = Bool<'ctx>;

    fn width(&self) -> u32 {
        self.bv.get_size()
    }

    fn constant(&self, value: u64) -> Self {
        let width = self.width();
        Self {
            bv: BV::from_u64(self.bv.get_ctx(), value & mask(width), width),
        }
    }

    fn constant_of(&self, width: u32, value: u64) -> EngineResult<Self> {
        Sym::literal(self.bv.get_ctx(), width, value)
    }

    fn truth(&self, value: bool) -> Bool<'ctx> {
        Bool::from_bool(self.bv.get_ctx(), value)
    }

    fn bvand(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a.bvand(b))
    }

    fn bvor(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a.bvor(b))
    }

    fn bvxor(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a.bvxor(b))
    }

    fn bvadd(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a.bvadd(b))
    }

    fn bvsub(&self, other: &Self) -> EngineResult<Self> {
        self.binary(other, |a, b| a.bvsub(b))
    }

    fn bvnot(&self) -> Self {
        Self {
            bv: self.bv.bvnot(),
        }
    }

    fn bvule(&self, other: &Self) -> EngineResult<Bool<'ctx>> {
        self.compare(other, |a, b| a.bvule(b))
    }

    fn bveq(&self, other: &Self) -> EngineResult<Bool<'ctx>> {
        self.compare(other, |a, b| a._eq(b))
    }

    fn add_no_overflow(&self, other: &Self) -> EngineResult<Bool<'ctx>> {
        // the wrapped sum is below the augend exactly when the addition overflows
        self.compare(other, |a, b| a.bvadd(b).bvuge(a))
    }

    fn sub_no_underflow(&self, other: &Self) -> EngineResult<Bool<'ctx>> {
        self.compare(other, |a, b| a.bvuge(b))
    }

    fn truncate(&self, width: u32) -> EngineResult<Self> {
        let width = check_truncation(self.width(), width)?;
        Ok(Self {
            bv: self.bv.extract(width - 1, 0),
        })
    }

    fn select(cond: &Bool<'ctx>, then: &Self, otherwise: &Self) -> EngineResult<Self> {
        check_same_width(then.width(), otherwise.width())?;
        Ok(Self {
            bv: cond.ite(&then.bv, &otherwise.bv),
        })
    }
}

#[cfg(test)]
mod tests {
    use z3::{Config, SatResult, Solver};

    use super::*;

    #[test]
    fn symbolic_matches_concrete_overflow() {
        let ctx = Context::new(&Config::new());
        let solver = Solver::new(&ctx);
        let a = Sym::variable(&ctx, "a", 4).unwrap();
        let b = Sym::variable(&ctx, "b", 4).unwrap();

        // no overflow implies the sum is at least both addends
        let claim = a
            .add_no_overflow(&b)
            .unwrap()
            .implies(&a.bvadd(&b).unwrap().as_bv().bvuge(b.as_bv()));
        solver.assert(&claim.not());
        assert_eq!(solver.check(), SatResult::Unsat);
    }

    #[test]
    fn width_is_checked_before_building_terms() {
        let ctx = Context::new(&Config::new());
        let a = Sym::variable(&ctx, "a", 4).unwrap();
        let b = Sym::variable(&ctx, "b", 8).unwrap();
        assert!(a.bvxor(&b).is_err());
        assert_eq!(a.truncate(2).unwrap().width(), 2);
        assert!(a.truncate(4).is_err());
        assert!(Sym::variable(&ctx, "c", 0).is_err());
    }
}
