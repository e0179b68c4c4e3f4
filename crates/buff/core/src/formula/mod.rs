//! Formula language for instance-dependent effect magnitudes.
//!
//! Formulas let an effect scale with the state of the instance that owns it:
//! - Stack count (`stack`, `max_stack`)
//! - Time (`remaining_time`, `total_duration`, `elapsed`, `progress`)
//! - Application strength (`potency`)
//! - The effect's own numbers (`base_value`, `per_stack_value`)
//!
//! ## Examples
//!
//! ```
//! use buff_core::formula::{Formula, FormulaContext};
//!
//! // Ramps from 0 to 50 over the buff's lifetime
//! let ramp = Formula::parse("50 * progress").unwrap();
//!
//! let ctx = FormulaContext {
//!     remaining_time: 2.5,
//!     total_duration: 10.0,
//!     ..FormulaContext::default()
//! };
//! assert_eq!(ramp.evaluate(&ctx), Ok(37.5));
//!
//! // Diminishing returns per stack
//! let _sqrt_stacks = Formula::parse("base_value * sqrt(stack)").unwrap();
//! ```
//!
//! Variables are resolved when the formula is parsed, so a typo is a
//! load-time [`FormulaError`] rather than a silent zero at runtime.

mod evaluate;
mod parse;

/// Errors from parsing or evaluating a formula.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum FormulaError {
    #[error("unexpected character '{ch}' at {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("unexpected '{found}' at {position}")]
    UnexpectedToken { found: String, position: usize },

    #[error("unexpected end of formula")]
    UnexpectedEnd,

    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    #[error("{function} expects {expected} argument(s), got {found}")]
    Arity {
        function: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("formula nests deeper than {limit} levels")]
    TooDeep { limit: usize },

    #[error("formula has more than {limit} tokens")]
    TooLong { limit: usize },

    #[error("division by zero")]
    DivisionByZero,

    #[error("result is not a finite number")]
    NonFinite,
}

/// Instance state exposed to formulas.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FormulaContext {
    pub stack: f64,
    pub max_stack: f64,
    pub remaining_time: f64,
    pub total_duration: f64,
    /// Seconds since the instance was created.
    pub elapsed: f64,
    pub potency: f64,
    pub base_value: f64,
    pub per_stack_value: f64,
}

impl Default for FormulaContext {
    fn default() -> Self {
        Self {
            stack: 1.0,
            max_stack: 1.0,
            remaining_time: 0.0,
            total_duration: 0.0,
            elapsed: 0.0,
            potency: 1.0,
            base_value: 0.0,
            per_stack_value: 0.0,
        }
    }
}

impl FormulaContext {
    /// Fraction of the duration already consumed, in `[0, 1]`.
    ///
    /// Zero when the instance has no duration (persistent buffs).
    pub fn progress(&self) -> f64 {
        if self.total_duration <= 0.0 {
            return 0.0;
        }
        ((self.total_duration - self.remaining_time) / self.total_duration).clamp(0.0, 1.0)
    }
}

/// Instance variables a formula may reference.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Variable {
    Stack,
    MaxStack,
    RemainingTime,
    TotalDuration,
    Elapsed,
    Progress,
    Potency,
    BaseValue,
    PerStackValue,
}

impl Variable {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "stack" | "stacks" => Self::Stack,
            "max_stack" | "maxStack" => Self::MaxStack,
            "remaining_time" | "remainingTime" => Self::RemainingTime,
            "total_duration" | "totalDuration" => Self::TotalDuration,
            "elapsed" => Self::Elapsed,
            "progress" => Self::Progress,
            "potency" => Self::Potency,
            "base_value" | "baseValue" => Self::BaseValue,
            "per_stack_value" | "perStackValue" => Self::PerStackValue,
            _ => return None,
        })
    }
}

/// Built-in functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Function {
    Min,
    Max,
    Abs,
    Floor,
    Ceil,
    Round,
    Sqrt,
    Pow,
    Clamp,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "min" => Self::Min,
            "max" => Self::Max,
            "abs" => Self::Abs,
            "floor" => Self::Floor,
            "ceil" => Self::Ceil,
            "round" => Self::Round,
            "sqrt" => Self::Sqrt,
            "pow" => Self::Pow,
            "clamp" => Self::Clamp,
            _ => return None,
        })
    }

    const fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Abs => "abs",
            Self::Floor => "floor",
            Self::Ceil => "ceil",
            Self::Round => "round",
            Self::Sqrt => "sqrt",
            Self::Pow => "pow",
            Self::Clamp => "clamp",
        }
    }

    /// `None` means variadic (at least one argument).
    const fn arity(self) -> Option<usize> {
        match self {
            Self::Min | Self::Max => None,
            Self::Abs | Self::Floor | Self::Ceil | Self::Round | Self::Sqrt => Some(1),
            Self::Pow => Some(2),
            Self::Clamp => Some(3),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
}

/// Parsed expression tree.
#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Expr {
    Number(f64),
    Variable(Variable),
    Neg(Box<Expr>),
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        function: Function,
        args: Vec<Expr>,
    },
}

/// A compiled formula.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    source: String,
    expr: Expr,
}

impl Formula {
    /// Parses a formula string.
    pub fn parse(source: &str) -> Result<Self, FormulaError> {
        let expr = parse::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// Evaluates the formula against instance state.
    pub fn evaluate(&self, ctx: &FormulaContext) -> Result<f64, FormulaError> {
        let value = evaluate::evaluate(&self.expr, ctx)?;
        if value.is_finite() {
            Ok(value)
        } else {
            Err(FormulaError::NonFinite)
        }
    }

    /// The source text this formula was parsed from.
    pub fn source(&self) -> &str {
        &self.source
    }
}

impl std::fmt::Display for Formula {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eval(source: &str, ctx: &FormulaContext) -> f64 {
        Formula::parse(source)
            .and_then(|f| f.evaluate(ctx))
            .unwrap_or_else(|e| panic!("{source}: {e}"))
    }

    #[test]
    fn progress_is_zero_without_duration() {
        let ctx = FormulaContext::default();
        assert_eq!(ctx.progress(), 0.0);

        let ctx = FormulaContext {
            remaining_time: 3.0,
            total_duration: 4.0,
            ..FormulaContext::default()
        };
        assert_eq!(ctx.progress(), 0.25);
    }

    #[test]
    fn variables_and_aliases() {
        let ctx = FormulaContext {
            stack: 3.0,
            max_stack: 5.0,
            remaining_time: 6.0,
            total_duration: 8.0,
            potency: 2.0,
            base_value: 10.0,
            per_stack_value: 4.0,
            ..FormulaContext::default()
        };
        assert_eq!(eval("stack", &ctx), 3.0);
        assert_eq!(eval("maxStack - stack", &ctx), 2.0);
        assert_eq!(eval("remainingTime / total_duration", &ctx), 0.75);
        assert_eq!(
            eval("(base_value + per_stack_value * (stack - 1)) * potency", &ctx),
            36.0
        );
    }

    #[test]
    fn unknown_names_fail_at_parse_time() {
        assert_eq!(
            Formula::parse("stack * strength"),
            Err(FormulaError::UnknownVariable("strength".into()))
        );
        assert_eq!(
            Formula::parse("log(stack)"),
            Err(FormulaError::UnknownFunction("log".into()))
        );
    }

    #[test]
    fn display_is_source() {
        let formula = Formula::parse("1 + stack").unwrap();
        assert_eq!(formula.to_string(), "1 + stack");
        assert_eq!(formula.source(), "1 + stack");
    }
}
