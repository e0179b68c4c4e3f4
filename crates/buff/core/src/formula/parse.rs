//! Recursive-descent parser for the formula language.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '%') unary)*
//! unary   := ('-' | '+') unary | power
//! power   := primary ('^' unary)?
//! primary := NUMBER | IDENT | IDENT '(' expr (',' expr)* ')' | '(' expr ')'
//! ```
//!
//! `^` is right-associative and binds tighter than unary minus, so
//! `-2 ^ 2 == -4`.

use super::{BinaryOp, Expr, FormulaError, Function, Variable};

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Op(char),
    LParen,
    RParen,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => n.to_string(),
            Token::Ident(name) => name.clone(),
            Token::Op(c) => c.to_string(),
            Token::LParen => "(".into(),
            Token::RParen => ")".into(),
            Token::Comma => ",".into(),
        }
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, FormulaError> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }

        let start = i;
        match c {
            '0'..='9' | '.' => {
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                // Optional exponent: 1e3, 2.5E-2
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        i = j;
                        while i < chars.len() && chars[i].is_ascii_digit() {
                            i += 1;
                        }
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| FormulaError::UnexpectedToken {
                        found: text.clone(),
                        position: start,
                    })?;
                tokens.push((Token::Number(value), start));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                tokens.push((Token::Ident(chars[start..i].iter().collect()), start));
            }
            '+' | '-' | '*' | '/' | '%' | '^' => {
                tokens.push((Token::Op(c), start));
                i += 1;
            }
            '(' => {
                tokens.push((Token::LParen, start));
                i += 1;
            }
            ')' => {
                tokens.push((Token::RParen, start));
                i += 1;
            }
            ',' => {
                tokens.push((Token::Comma, start));
                i += 1;
            }
            other => {
                return Err(FormulaError::UnexpectedChar {
                    ch: other,
                    position: start,
                });
            }
        }
    }

    Ok(tokens)
}

/// Maximum nesting of parentheses, unary operators and exponents.
pub(crate) const MAX_DEPTH: usize = 128;

/// Maximum token count. Binary chains do not nest while parsing but do
/// nest in the tree, so length is capped as well.
pub(crate) const MAX_TOKENS: usize = 1024;

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn next(&mut self) -> Option<(Token, usize)> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat_op(&mut self, ops: &[char]) -> Option<char> {
        match self.peek() {
            Some(Token::Op(c)) if ops.contains(c) => {
                let c = *c;
                self.pos += 1;
                Some(c)
            }
            _ => None,
        }
    }

    fn expect(&mut self, expected: &Token) -> Result<(), FormulaError> {
        match self.next() {
            Some((ref token, _)) if token == expected => Ok(()),
            Some((token, position)) => Err(FormulaError::UnexpectedToken {
                found: token.describe(),
                position,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn expr(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.term()?;
        while let Some(op) = self.eat_op(&['+', '-']) {
            let rhs = self.term()?;
            let op = if op == '+' { BinaryOp::Add } else { BinaryOp::Sub };
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    fn term(&mut self) -> Result<Expr, FormulaError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.eat_op(&['*', '/', '%']) {
            let rhs = self.unary()?;
            let op = match op {
                '*' => BinaryOp::Mul,
                '/' => BinaryOp::Div,
                _ => BinaryOp::Rem,
            };
            lhs = binary(op, lhs, rhs);
        }
        Ok(lhs)
    }

    /// Every recursive path re-enters here, so the depth is tracked here.
    fn unary(&mut self) -> Result<Expr, FormulaError> {
        if self.depth >= MAX_DEPTH {
            return Err(FormulaError::TooDeep { limit: MAX_DEPTH });
        }
        self.depth += 1;
        let result = match self.eat_op(&['-', '+']) {
            Some('-') => self.unary().map(|inner| Expr::Neg(Box::new(inner))),
            Some(_) => self.unary(),
            None => self.power(),
        };
        self.depth -= 1;
        result
    }

    fn power(&mut self) -> Result<Expr, FormulaError> {
        let base = self.primary()?;
        if self.eat_op(&['^']).is_some() {
            let exponent = self.unary()?;
            return Ok(binary(BinaryOp::Pow, base, exponent));
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Expr, FormulaError> {
        match self.next() {
            Some((Token::Number(value), _)) => Ok(Expr::Number(value)),
            Some((Token::Ident(name), _)) => {
                if self.peek() == Some(&Token::LParen) {
                    self.pos += 1;
                    self.call(&name)
                } else {
                    Variable::from_name(&name)
                        .map(Expr::Variable)
                        .ok_or(FormulaError::UnknownVariable(name))
                }
            }
            Some((Token::LParen, _)) => {
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some((token, position)) => Err(FormulaError::UnexpectedToken {
                found: token.describe(),
                position,
            }),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn call(&mut self, name: &str) -> Result<Expr, FormulaError> {
        let function =
            Function::from_name(name).ok_or_else(|| FormulaError::UnknownFunction(name.into()))?;

        let mut args = Vec::new();
        if self.peek() == Some(&Token::RParen) {
            self.pos += 1;
        } else {
            loop {
                args.push(self.expr()?);
                match self.next() {
                    Some((Token::Comma, _)) => continue,
                    Some((Token::RParen, _)) => break,
                    Some((token, position)) => {
                        return Err(FormulaError::UnexpectedToken {
                            found: token.describe(),
                            position,
                        });
                    }
                    None => return Err(FormulaError::UnexpectedEnd),
                }
            }
        }

        let arity_ok = match function.arity() {
            Some(expected) => args.len() == expected,
            None => !args.is_empty(),
        };
        if !arity_ok {
            return Err(FormulaError::Arity {
                function: function.name(),
                expected: function.arity().unwrap_or(1),
                found: args.len(),
            });
        }

        Ok(Expr::Call { function, args })
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}

/// Parses a formula into an expression tree.
pub(crate) fn parse(source: &str) -> Result<Expr, FormulaError> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err(FormulaError::UnexpectedEnd);
    }
    if tokens.len() > MAX_TOKENS {
        return Err(FormulaError::TooLong { limit: MAX_TOKENS });
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let expr = parser.expr()?;

    if let Some((token, position)) = parser.next() {
        return Err(FormulaError::UnexpectedToken {
            found: token.describe(),
            position,
        });
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn precedence_and_associativity() {
        let expr = parse("1 + 2 * 3").unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOp::Add,
                Expr::Number(1.0),
                binary(BinaryOp::Mul, Expr::Number(2.0), Expr::Number(3.0)),
            )
        );

        // Right-associative power
        let expr = parse("2 ^ 3 ^ 2").unwrap();
        assert_eq!(
            expr,
            binary(
                BinaryOp::Pow,
                Expr::Number(2.0),
                binary(BinaryOp::Pow, Expr::Number(3.0), Expr::Number(2.0)),
            )
        );
    }

    #[test]
    fn unary_minus_binds_looser_than_power() {
        let expr = parse("-2 ^ 2").unwrap();
        assert_eq!(
            expr,
            Expr::Neg(Box::new(binary(
                BinaryOp::Pow,
                Expr::Number(2.0),
                Expr::Number(2.0)
            )))
        );
    }

    #[test]
    fn scientific_literals() {
        assert_eq!(parse("1.5e2").unwrap(), Expr::Number(150.0));
        assert_eq!(parse("2E-1").unwrap(), Expr::Number(0.2));
    }

    #[test]
    fn function_calls_check_arity() {
        assert!(parse("clamp(stack, 1, 3)").is_ok());
        assert!(parse("max(1, 2, stack, 4)").is_ok());
        assert_eq!(
            parse("pow(2)"),
            Err(FormulaError::Arity {
                function: "pow",
                expected: 2,
                found: 1
            })
        );
        assert!(matches!(parse("min()"), Err(FormulaError::Arity { .. })));
    }

    #[test]
    fn syntax_errors_carry_positions() {
        assert_eq!(
            parse("stack $ 2"),
            Err(FormulaError::UnexpectedChar {
                ch: '$',
                position: 6
            })
        );
        assert_eq!(parse("(stack + 1"), Err(FormulaError::UnexpectedEnd));
        assert_eq!(
            parse("stack 2"),
            Err(FormulaError::UnexpectedToken {
                found: "2".into(),
                position: 6
            })
        );
        assert_eq!(parse("   "), Err(FormulaError::UnexpectedEnd));
    }

    #[test]
    fn nesting_is_capped() {
        let deep = format!("{}1{}", "(".repeat(20_000), ")".repeat(20_000));
        assert_eq!(
            parse(&deep),
            Err(FormulaError::TooLong { limit: MAX_TOKENS })
        );

        let nested = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(
            parse(&nested),
            Err(FormulaError::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            parse(&format!("{}stack", "-".repeat(500))),
            Err(FormulaError::TooDeep { limit: MAX_DEPTH })
        );
        assert_eq!(
            parse(&format!("{}2", "2^".repeat(300))),
            Err(FormulaError::TooDeep { limit: MAX_DEPTH })
        );

        let shallow = format!("{}1{}", "(".repeat(100), ")".repeat(100));
        assert!(parse(&shallow).is_ok());
    }

    #[test]
    fn long_chains_are_capped() {
        let chain = vec!["1"; 600].join(" + ");
        assert_eq!(
            parse(&chain),
            Err(FormulaError::TooLong { limit: MAX_TOKENS })
        );
        assert!(parse(&vec!["1"; 400].join(" + ")).is_ok());
    }
}
