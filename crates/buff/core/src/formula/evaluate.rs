//! Tree-walking evaluator.

use super::{BinaryOp, Expr, FormulaContext, FormulaError, Function, Variable};

pub(crate) fn evaluate(expr: &Expr, ctx: &FormulaContext) -> Result<f64, FormulaError> {
    match expr {
        Expr::Number(value) => Ok(*value),
        Expr::Variable(variable) => Ok(lookup(*variable, ctx)),
        Expr::Neg(inner) => Ok(-evaluate(inner, ctx)?),
        Expr::Binary { op, lhs, rhs } => {
            let lhs = evaluate(lhs, ctx)?;
            let rhs = evaluate(rhs, ctx)?;
            binary(*op, lhs, rhs)
        }
        Expr::Call { function, args } => {
            let values = args
                .iter()
                .map(|arg| evaluate(arg, ctx))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(call(*function, &values))
        }
    }
}

fn lookup(variable: Variable, ctx: &FormulaContext) -> f64 {
    match variable {
        Variable::Stack => ctx.stack,
        Variable::MaxStack => ctx.max_stack,
        Variable::RemainingTime => ctx.remaining_time,
        Variable::TotalDuration => ctx.total_duration,
        Variable::Elapsed => ctx.elapsed,
        Variable::Progress => ctx.progress(),
        Variable::Potency => ctx.potency,
        Variable::BaseValue => ctx.base_value,
        Variable::PerStackValue => ctx.per_stack_value,
    }
}

fn binary(op: BinaryOp, lhs: f64, rhs: f64) -> Result<f64, FormulaError> {
    Ok(match op {
        BinaryOp::Add => lhs + rhs,
        BinaryOp::Sub => lhs - rhs,
        BinaryOp::Mul => lhs * rhs,
        BinaryOp::Div => {
            if rhs == 0.0 {
                return Err(FormulaError::DivisionByZero);
            }
            lhs / rhs
        }
        BinaryOp::Rem => {
            if rhs == 0.0 {
                return Err(FormulaError::DivisionByZero);
            }
            lhs % rhs
        }
        BinaryOp::Pow => lhs.powf(rhs),
    })
}

/// Arity was checked at parse time.
fn call(function: Function, args: &[f64]) -> f64 {
    match function {
        Function::Min => args.iter().copied().fold(f64::INFINITY, f64::min),
        Function::Max => args.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Function::Abs => args[0].abs(),
        Function::Floor => args[0].floor(),
        Function::Ceil => args[0].ceil(),
        Function::Round => args[0].round(),
        Function::Sqrt => args[0].sqrt(),
        Function::Pow => args[0].powf(args[1]),
        Function::Clamp => {
            let (value, lo, hi) = (args[0], args[1], args[2]);
            // f64::clamp panics on lo > hi
            if lo > hi { lo } else { value.clamp(lo, hi) }
        }
    }
}
