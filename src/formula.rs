use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::cell::{CellContent, Value};
use crate::error::EvalError;
use crate::grid::Grid;

/// Binary operation of a formula node.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Add,
    Sub,
    Mult,
    Div,
}

/// One side of a formula: a constant, a cell dereferenced to its value, or
/// a nested formula evaluated recursively.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Const(f64),
    Cell(usize, usize),
    Expr(Box<Formula>),
}

impl From<f64> for Operand {
    fn from(n: f64) -> Self {
        Operand::Const(n)
    }
}

impl From<i64> for Operand {
    fn from(n: i64) -> Self {
        Operand::Const(n as f64)
    }
}

impl From<Formula> for Operand {
    fn from(f: Formula) -> Self {
        Operand::Expr(Box::new(f))
    }
}

/// A lazily evaluated binary expression over cells, constants, and nested
/// formulas. Evaluation is fresh on every read; nothing is cached.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Formula {
    pub op: Op,
    pub lhs: Operand,
    pub rhs: Operand,
}

impl Formula {
    pub fn new(op: Op, lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Formula {
            op,
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    pub fn add(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Formula::new(Op::Add, lhs, rhs)
    }

    pub fn sub(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Formula::new(Op::Sub, lhs, rhs)
    }

    pub fn mult(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Formula::new(Op::Mult, lhs, rhs)
    }

    pub fn div(lhs: impl Into<Operand>, rhs: impl Into<Operand>) -> Self {
        Formula::new(Op::Div, lhs, rhs)
    }

    /// Evaluate against a grid. Cell operands referencing computed cells
    /// recurse; a reference chain that revisits a cell already on the
    /// evaluation path fails with [`EvalError::CyclicFormula`] instead of
    /// recursing without bound.
    pub fn eval(&self, grid: &Grid) -> Result<f64, EvalError> {
        let mut visiting = HashSet::new();
        self.eval_with(grid, &mut visiting)
    }

    pub(crate) fn eval_with(
        &self,
        grid: &Grid,
        visiting: &mut HashSet<(usize, usize)>,
    ) -> Result<f64, EvalError> {
        let a = self.lhs.resolve(grid, visiting)?;
        let b = self.rhs.resolve(grid, visiting)?;
        match self.op {
            Op::Add => Ok(a + b),
            Op::Sub => Ok(a - b),
            Op::Mult => Ok(a * b),
            Op::Div => {
                if b == 0.0 {
                    Err(EvalError::DivideByZero)
                } else {
                    Ok(a / b)
                }
            }
        }
    }
}

impl Operand {
    fn resolve(
        &self,
        grid: &Grid,
        visiting: &mut HashSet<(usize, usize)>,
    ) -> Result<f64, EvalError> {
        match self {
            Operand::Const(n) => Ok(*n),
            Operand::Expr(f) => f.eval_with(grid, visiting),
            Operand::Cell(x, y) => {
                // `visiting` holds the cells on the current evaluation path;
                // a revisit is a cycle. Diamond-shaped references are fine
                // because the coordinate is released on the way back out.
                if !visiting.insert((*x, *y)) {
                    return Err(EvalError::CyclicFormula { x: *x, y: *y });
                }
                let result = match grid.get(*x, *y) {
                    None => Err(EvalError::NonNumeric {
                        found: format!("missing cell ({}, {})", x, y),
                    }),
                    Some(cell) => match cell.content() {
                        CellContent::Literal(Some(Value::Number(n))) => Ok(*n),
                        CellContent::Literal(Some(other)) => Err(EvalError::NonNumeric {
                            found: other.to_string(),
                        }),
                        CellContent::Literal(None) => Err(EvalError::NonNumeric {
                            found: format!("empty cell ({}, {})", x, y),
                        }),
                        CellContent::Computed(f) => f.eval_with(grid, visiting),
                    },
                };
                visiting.remove(&(*x, *y));
                result
            }
        }
    }
}
