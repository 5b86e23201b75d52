//! Numeric expressions in deck fields
//!
//! Any numeric field may be written as a YAML number or as an expression
//! string such as `"0.01*l0"` or `"l0/resx"`. Expressions are evaluated
//! eagerly with `f64` arithmetic against a [`Scope`] of named constants;
//! nothing symbolic survives loading.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr  := term (('+' | '-') term)*
//! term  := unary (('*' | '/') unary)*
//! unary := ('-' | '+') unary | power
//! power := atom ('**' unary)?
//! atom  := number | name | name '(' expr (',' expr)* ')' | '(' expr ')'
//! ```

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Scalar
// ============================================================================

/// A numeric field value: a literal number or an expression to evaluate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    /// Literal number
    Number(f64),
    /// Expression string evaluated against the deck constants
    Expr(String),
}

impl Scalar {
    /// Evaluates the value in `scope`.
    ///
    /// # Errors
    ///
    /// Returns an error if the expression does not parse, references an
    /// unknown name, or evaluates to a non-finite number.
    pub fn resolve(&self, scope: &Scope) -> Result<f64, ExprError> {
        match self {
            Self::Number(value) if value.is_finite() => Ok(*value),
            Self::Number(value) => Err(ExprError::NonFinite(value.to_string())),
            Self::Expr(source) => scope.eval(source),
        }
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Expr(source) => write!(f, "{source}"),
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Expression evaluation errors.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExprError {
    /// Character that cannot start any token
    #[error("unexpected character '{ch}' at offset {offset}")]
    UnexpectedChar {
        /// The offending character
        ch: char,
        /// Byte offset in the expression
        offset: usize,
    },

    /// Input ended in the middle of an expression
    #[error("unexpected end of expression")]
    UnexpectedEnd,

    /// Token in a position the grammar does not allow
    #[error("unexpected '{token}' at offset {offset}")]
    UnexpectedToken {
        /// Rendered token
        token: String,
        /// Byte offset in the expression
        offset: usize,
    },

    /// Reference to an undefined constant
    #[error("unknown name '{name}'{}", suggestion_suffix(.suggestion.as_deref()))]
    UnknownName {
        /// The undefined name
        name: String,
        /// Closest defined name, if any is close enough
        suggestion: Option<String>,
    },

    /// Call to a function that does not exist
    #[error("unknown function '{0}'")]
    UnknownFunction(String),

    /// Function called with the wrong number of arguments
    #[error("function '{name}' takes {expected} argument(s), got {got}")]
    Arity {
        /// Function name
        name: String,
        /// Expected argument count
        expected: usize,
        /// Provided argument count
        got: usize,
    },

    /// Result is infinite or NaN
    #[error("'{0}' is not a finite number")]
    NonFinite(String),

    /// Attempt to redefine a built-in constant
    #[error("'{0}' is a built-in constant and cannot be redefined")]
    Reserved(String),
}

fn suggestion_suffix(suggestion: Option<&str>) -> String {
    suggestion.map_or_else(String::new, |s| format!(" (did you mean '{s}'?)"))
}

// ============================================================================
// Scope
// ============================================================================

const BUILTINS: &[&str] = &["pi", "e", "rank"];

/// Named constants visible to expressions.
///
/// Always contains `pi`, `e` and `rank` (the process rank supplied by the
/// caller); deck constants are added with [`Scope::define`].
#[derive(Debug, Clone)]
pub struct Scope {
    values: HashMap<String, f64>,
}

impl Scope {
    /// Creates a scope holding only the built-in constants.
    #[must_use]
    pub fn new(rank: u32) -> Self {
        let mut values = HashMap::new();
        values.insert("pi".to_string(), std::f64::consts::PI);
        values.insert("e".to_string(), std::f64::consts::E);
        values.insert("rank".to_string(), f64::from(rank));
        Self { values }
    }

    /// Adds or replaces a deck constant.
    ///
    /// # Errors
    ///
    /// Returns [`ExprError::Reserved`] when `name` is a built-in.
    pub fn define(&mut self, name: &str, value: f64) -> Result<(), ExprError> {
        if BUILTINS.contains(&name) {
            return Err(ExprError::Reserved(name.to_string()));
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    /// Looks up a constant.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    /// Evaluates an expression string.
    ///
    /// # Errors
    ///
    /// See [`Scalar::resolve`].
    pub fn eval(&self, source: &str) -> Result<f64, ExprError> {
        let tokens = tokenize(source)?;
        let mut parser = Parser {
            tokens: &tokens,
            pos: 0,
            scope: self,
        };
        let value = parser.expr()?;
        if let Some(tok) = parser.peek() {
            return Err(ExprError::UnexpectedToken {
                token: tok.kind.to_string(),
                offset: tok.offset,
            });
        }
        if value.is_finite() {
            Ok(value)
        } else {
            Err(ExprError::NonFinite(source.to_string()))
        }
    }

    /// Suggests the closest defined name for a typo.
    ///
    /// Returns the closest match if its Damerau-Levenshtein distance is <= 2.
    #[must_use]
    pub fn suggest(&self, input: &str) -> Option<String> {
        self.values
            .keys()
            .map(|name| (name, strsim::damerau_levenshtein(input, name)))
            .filter(|(_, dist)| *dist <= 2)
            .min_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)))
            .map(|(name, _)| name.clone())
    }
}

// ============================================================================
// Lexer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Num(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Pow,
    LParen,
    RParen,
    Comma,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Num(n) => write!(f, "{n}"),
            Self::Ident(name) => write!(f, "{name}"),
            Self::Plus => write!(f, "+"),
            Self::Minus => write!(f, "-"),
            Self::Star => write!(f, "*"),
            Self::Slash => write!(f, "/"),
            Self::Pow => write!(f, "**"),
            Self::LParen => write!(f, "("),
            Self::RParen => write!(f, ")"),
            Self::Comma => write!(f, ","),
        }
    }
}

#[derive(Debug, Clone)]
struct Token {
    kind: TokenKind,
    offset: usize,
}

fn tokenize(source: &str) -> Result<Vec<Token>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i];
        let offset = i;
        let kind = match c {
            b' ' | b'\t' => {
                i += 1;
                continue;
            }
            b'+' => TokenKind::Plus,
            b'-' => TokenKind::Minus,
            b'*' if bytes.get(i + 1) == Some(&b'*') => {
                i += 1;
                TokenKind::Pow
            }
            b'*' => TokenKind::Star,
            b'/' => TokenKind::Slash,
            b'(' => TokenKind::LParen,
            b')' => TokenKind::RParen,
            b',' => TokenKind::Comma,
            b'0'..=b'9' | b'.' => {
                let end = scan_number(bytes, i);
                let text = &source[i..end];
                let value = text.parse::<f64>().map_err(|_| ExprError::UnexpectedToken {
                    token: text.to_string(),
                    offset,
                })?;
                tokens.push(Token {
                    kind: TokenKind::Num(value),
                    offset,
                });
                i = end;
                continue;
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let mut end = i + 1;
                while end < bytes.len() && (bytes[end].is_ascii_alphanumeric() || bytes[end] == b'_')
                {
                    end += 1;
                }
                tokens.push(Token {
                    kind: TokenKind::Ident(source[i..end].to_string()),
                    offset,
                });
                i = end;
                continue;
            }
            _ => {
                let ch = source[i..].chars().next().unwrap_or('?');
                return Err(ExprError::UnexpectedChar { ch, offset });
            }
        };
        tokens.push(Token { kind, offset });
        i += 1;
    }

    Ok(tokens)
}

/// Returns the end offset of the number literal starting at `start`.
fn scan_number(bytes: &[u8], start: usize) -> usize {
    let mut end = start;
    while end < bytes.len() && (bytes[end].is_ascii_digit() || bytes[end] == b'.') {
        end += 1;
    }
    // Exponent only when digits follow, so `2e` stays `2` then name `e`
    if end < bytes.len() && (bytes[end] == b'e' || bytes[end] == b'E') {
        let mut exp = end + 1;
        if exp < bytes.len() && (bytes[exp] == b'+' || bytes[exp] == b'-') {
            exp += 1;
        }
        if exp < bytes.len() && bytes[exp].is_ascii_digit() {
            while exp < bytes.len() && bytes[exp].is_ascii_digit() {
                exp += 1;
            }
            end = exp;
        }
    }
    end
}

// ============================================================================
// Parser / Evaluator
// ============================================================================

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    scope: &'a Scope,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<&Token, ExprError> {
        let tok = self.tokens.get(self.pos).ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(tok)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.peek().is_some_and(|t| &t.kind == kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<(), ExprError> {
        let tok = self.next()?;
        if &tok.kind == kind {
            Ok(())
        } else {
            Err(ExprError::UnexpectedToken {
                token: tok.kind.to_string(),
                offset: tok.offset,
            })
        }
    }

    fn expr(&mut self) -> Result<f64, ExprError> {
        let mut value = self.term()?;
        loop {
            if self.eat(&TokenKind::Plus) {
                value += self.term()?;
            } else if self.eat(&TokenKind::Minus) {
                value -= self.term()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn term(&mut self) -> Result<f64, ExprError> {
        let mut value = self.unary()?;
        loop {
            if self.eat(&TokenKind::Star) {
                value *= self.unary()?;
            } else if self.eat(&TokenKind::Slash) {
                value /= self.unary()?;
            } else {
                return Ok(value);
            }
        }
    }

    fn unary(&mut self) -> Result<f64, ExprError> {
        if self.eat(&TokenKind::Minus) {
            return Ok(-self.unary()?);
        }
        if self.eat(&TokenKind::Plus) {
            return self.unary();
        }
        self.power()
    }

    fn power(&mut self) -> Result<f64, ExprError> {
        let base = self.atom()?;
        if self.eat(&TokenKind::Pow) {
            let exponent = self.unary()?;
            return Ok(base.powf(exponent));
        }
        Ok(base)
    }

    fn atom(&mut self) -> Result<f64, ExprError> {
        let tok = self.next()?.clone();
        match tok.kind {
            TokenKind::Num(value) => Ok(value),
            TokenKind::LParen => {
                let value = self.expr()?;
                self.expect(&TokenKind::RParen)?;
                Ok(value)
            }
            TokenKind::Ident(name) => {
                if self.eat(&TokenKind::LParen) {
                    let args = self.arguments()?;
                    call(&name, &args)
                } else {
                    self.scope.get(&name).ok_or_else(|| ExprError::UnknownName {
                        suggestion: self.scope.suggest(&name),
                        name,
                    })
                }
            }
            other => Err(ExprError::UnexpectedToken {
                token: other.to_string(),
                offset: tok.offset,
            }),
        }
    }

    fn arguments(&mut self) -> Result<Vec<f64>, ExprError> {
        let mut args = Vec::new();
        if self.eat(&TokenKind::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expr()?);
            if self.eat(&TokenKind::Comma) {
                continue;
            }
            self.expect(&TokenKind::RParen)?;
            return Ok(args);
        }
    }
}

fn call(name: &str, args: &[f64]) -> Result<f64, ExprError> {
    let unary: Option<fn(f64) -> f64> = match name {
        "sqrt" => Some(f64::sqrt),
        "exp" => Some(f64::exp),
        "ln" | "log" => Some(f64::ln),
        "log10" => Some(f64::log10),
        "sin" => Some(f64::sin),
        "cos" => Some(f64::cos),
        "tan" => Some(f64::tan),
        "abs" => Some(f64::abs),
        "floor" => Some(f64::floor),
        "ceil" => Some(f64::ceil),
        _ => None,
    };
    if let Some(f) = unary {
        return match args {
            [x] => Ok(f(*x)),
            _ => Err(arity(name, 1, args.len())),
        };
    }

    let binary: Option<fn(f64, f64) -> f64> = match name {
        "min" => Some(f64::min),
        "max" => Some(f64::max),
        "pow" => Some(f64::powf),
        _ => None,
    };
    match (binary, args) {
        (Some(f), [a, b]) => Ok(f(*a, *b)),
        (Some(_), _) => Err(arity(name, 2, args.len())),
        (None, _) => Err(ExprError::UnknownFunction(name.to_string())),
    }
}

fn arity(name: &str, expected: usize, got: usize) -> ExprError {
    ExprError::Arity {
        name: name.to_string(),
        expected,
        got,
    }
}

// ============================================================================
// Tests
// ============================================================================
