//! Arithmetic expression evaluator for the calculator tool.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/' | '//' | '%') unary)*
//! unary   := ('+' | '-') unary | power
//! power   := primary ('**' unary)?
//! primary := number | '(' expr ')'
//! ```
//!
//! Integers stay integral while they fit in an `i64` and widen to `f64`
//! beyond that. `/` is true division, `//` and `%` floor toward negative
//! infinity, and `-2 ** 2` is `-4`. Only non-finite results are errors.

use std::fmt;

const MAX_INPUT_LEN: usize = 1024;
const MAX_DEPTH: usize = 64;
const MAX_EXPONENT: i64 = 4096;

/// Evaluate `expression` and return the result, or an `Error: ` string.
pub fn calculate(expression: &str) -> String {
    match evaluate(expression) {
        Ok(value) => value.to_string(),
        Err(e) => format!("Error: {}", e),
    }
}

/// A numeric value produced by the evaluator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    fn as_f64(self) -> f64 {
        match self {
            Number::Int(i) => i as f64,
            Number::Float(f) => f,
        }
    }

    fn is_zero(self) -> bool {
        match self {
            Number::Int(i) => i == 0,
            Number::Float(f) => f == 0.0,
        }
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(i) => write!(f, "{}", i),
            Number::Float(x) if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 => {
                write!(f, "{:.1}", x)
            }
            Number::Float(x) => write!(f, "{}", x),
        }
    }
}

/// Why an expression could not be evaluated.
#[derive(Debug, Clone, PartialEq)]
pub enum CalcError {
    Empty,
    TooLong,
    TooDeep,
    UnexpectedChar(char),
    UnexpectedEnd,
    UnexpectedToken(String),
    InvalidNumber(String),
    DivisionByZero,
    Overflow,
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CalcError::Empty => write!(f, "empty expression"),
            CalcError::TooLong => write!(f, "expression longer than {} characters", MAX_INPUT_LEN),
            CalcError::TooDeep => write!(f, "expression nested too deeply"),
            CalcError::UnexpectedChar(c) => write!(f, "unexpected character '{}'", c),
            CalcError::UnexpectedEnd => write!(f, "unexpected end of expression"),
            CalcError::UnexpectedToken(t) => write!(f, "unexpected '{}'", t),
            CalcError::InvalidNumber(n) => write!(f, "invalid number '{}'", n),
            CalcError::DivisionByZero => write!(f, "division by zero"),
            CalcError::Overflow => write!(f, "result too large"),
        }
    }
}

impl std::error::Error for CalcError {}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Num(Number),
    Plus,
    Minus,
    Star,
    Slash,
    DoubleSlash,
    Percent,
    Power,
    LParen,
    RParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Token::Num(n) => return write!(f, "{}", n),
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::DoubleSlash => "//",
            Token::Percent => "%",
            Token::Power => "**",
            Token::LParen => "(",
            Token::RParen => ")",
        };
        f.write_str(s)
    }
}

/// Evaluate an arithmetic expression.
pub fn evaluate(expression: &str) -> Result<Number, CalcError> {
    let expression = expression.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`').trim();
    if expression.is_empty() {
        return Err(CalcError::Empty);
    }
    if expression.len() > MAX_INPUT_LEN {
        return Err(CalcError::TooLong);
    }

    let tokens = tokenize(expression)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
    };
    let value = parser.expr()?;
    match parser.peek() {
        None => Ok(value),
        Some(tok) => Err(CalcError::UnexpectedToken(tok.to_string())),
    }
}

fn tokenize(input: &str) -> Result<Vec<Token>, CalcError> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\n' | '\r' => i += 1,
            '+' => {
                tokens.push(Token::Plus);
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' if chars.get(i + 1) == Some(&'*') => {
                tokens.push(Token::Power);
                i += 2;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '/' if chars.get(i + 1) == Some(&'/') => {
                tokens.push(Token::DoubleSlash);
                i += 2;
            }
            '/' => {
                tokens.push(Token::Slash);
                i += 1;
            }
            '%' => {
                tokens.push(Token::Percent);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.' || chars[i] == '_') {
                    i += 1;
                }
                // Exponent part, e.g. 1e-3.
                if i < chars.len() && (chars[i] == 'e' || chars[i] == 'E') {
                    let mut j = i + 1;
                    if j < chars.len() && (chars[j] == '+' || chars[j] == '-') {
                        j += 1;
                    }
                    if j < chars.len() && chars[j].is_ascii_digit() {
                        while j < chars.len() && chars[j].is_ascii_digit() {
                            j += 1;
                        }
                        i = j;
                    }
                }
                let literal: String = chars[start..i].iter().collect();
                tokens.push(Token::Num(parse_number(&literal)?));
            }
            other => return Err(CalcError::UnexpectedChar(other)),
        }
    }

    Ok(tokens)
}

fn parse_number(literal: &str) -> Result<Number, CalcError> {
    let cleaned = literal.replace('_', "");
    let invalid = || CalcError::InvalidNumber(literal.to_string());

    if literal.starts_with('_') || literal.ends_with('_') || literal.contains("__") {
        return Err(invalid());
    }

    if cleaned.contains(['.', 'e', 'E']) {
        if cleaned == "." {
            return Err(invalid());
        }
        cleaned.parse::<f64>().map(Number::Float).map_err(|_| invalid())
    } else {
        match cleaned.parse::<i64>() {
            Ok(i) => Ok(Number::Int(i)),
            Err(_) if cleaned.chars().all(|c| c.is_ascii_digit()) => cleaned
                .parse::<f64>()
                .map_err(|_| invalid())
                .and_then(finite),
            Err(_) => Err(invalid()),
        }
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn descend(&mut self) -> Result<(), CalcError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            Err(CalcError::TooDeep)
        } else {
            Ok(())
        }
    }

    fn expr(&mut self) -> Result<Number, CalcError> {
        let mut left = self.term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    left = add(left, self.term()?)?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    left = sub(left, self.term()?)?;
                }
                _ => return Ok(left),
            }
        }
    }

    fn term(&mut self) -> Result<Number, CalcError> {
        let mut left = self.unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => Token::Star,
                Some(Token::Slash) => Token::Slash,
                Some(Token::DoubleSlash) => Token::DoubleSlash,
                Some(Token::Percent) => Token::Percent,
                _ => return Ok(left),
            };
            self.pos += 1;
            let right = self.unary()?;
            left = match op {
                Token::Star => mul(left, right)?,
                Token::Slash => div(left, right)?,
                Token::DoubleSlash => floor_div(left, right)?,
                _ => modulo(left, right)?,
            };
        }
    }

    fn unary(&mut self) -> Result<Number, CalcError> {
        match self.peek() {
            Some(Token::Minus) => {
                self.pos += 1;
                self.descend()?;
                let value = self.unary()?;
                self.depth -= 1;
                negate(value)
            }
            Some(Token::Plus) => {
                self.pos += 1;
                self.descend()?;
                let value = self.unary()?;
                self.depth -= 1;
                Ok(value)
            }
            _ => self.power(),
        }
    }

    fn power(&mut self) -> Result<Number, CalcError> {
        let base = self.primary()?;
        if let Some(Token::Power) = self.peek() {
            self.pos += 1;
            self.descend()?;
            let exponent = self.unary()?;
            self.depth -= 1;
            return pow(base, exponent);
        }
        Ok(base)
    }

    fn primary(&mut self) -> Result<Number, CalcError> {
        match self.next() {
            Some(Token::Num(n)) => Ok(n),
            Some(Token::LParen) => {
                self.descend()?;
                let value = self.expr()?;
                self.depth -= 1;
                match self.next() {
                    Some(Token::RParen) => Ok(value),
                    Some(tok) => Err(CalcError::UnexpectedToken(tok.to_string())),
                    None => Err(CalcError::UnexpectedEnd),
                }
            }
            Some(tok) => Err(CalcError::UnexpectedToken(tok.to_string())),
            None => Err(CalcError::UnexpectedEnd),
        }
    }
}

fn finite(x: f64) -> Result<Number, CalcError> {
    if x.is_finite() {
        Ok(Number::Float(x))
    } else {
        Err(CalcError::Overflow)
    }
}

/// Keep an exact integer result, or fall back to float arithmetic when it
/// left the `i64` range.
fn widen(exact: Option<i64>, fallback: impl FnOnce() -> f64) -> Result<Number, CalcError> {
    match exact {
        Some(i) => Ok(Number::Int(i)),
        None => finite(fallback()),
    }
}

fn negate(value: Number) -> Result<Number, CalcError> {
    match value {
        Number::Int(i) => widen(i.checked_neg(), || -(i as f64)),
        Number::Float(f) => Ok(Number::Float(-f)),
    }
}

fn add(a: Number, b: Number) -> Result<Number, CalcError> {
    let fallback = || a.as_f64() + b.as_f64();
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => widen(x.checked_add(y), fallback),
        _ => finite(fallback()),
    }
}

fn sub(a: Number, b: Number) -> Result<Number, CalcError> {
    let fallback = || a.as_f64() - b.as_f64();
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => widen(x.checked_sub(y), fallback),
        _ => finite(fallback()),
    }
}

fn mul(a: Number, b: Number) -> Result<Number, CalcError> {
    let fallback = || a.as_f64() * b.as_f64();
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => widen(x.checked_mul(y), fallback),
        _ => finite(fallback()),
    }
}

fn div(a: Number, b: Number) -> Result<Number, CalcError> {
    if b.is_zero() {
        return Err(CalcError::DivisionByZero);
    }
    finite(a.as_f64() / b.as_f64())
}

fn floor_div(a: Number, b: Number) -> Result<Number, CalcError> {
    if b.is_zero() {
        return Err(CalcError::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => match x.checked_div(y) {
            Some(q) if x % y != 0 && ((x < 0) != (y < 0)) => Ok(Number::Int(q - 1)),
            Some(q) => Ok(Number::Int(q)),
            // i64::MIN // -1
            None => finite(-(x as f64)),
        },
        _ => finite((a.as_f64() / b.as_f64()).floor()),
    }
}

fn modulo(a: Number, b: Number) -> Result<Number, CalcError> {
    if b.is_zero() {
        return Err(CalcError::DivisionByZero);
    }
    match (a, b) {
        (Number::Int(x), Number::Int(y)) => {
            // i64::MIN % -1 is 0
            let r = x.wrapping_rem(y);
            if r != 0 && ((r < 0) != (y < 0)) {
                Ok(Number::Int(r + y))
            } else {
                Ok(Number::Int(r))
            }
        }
        _ => {
            let (x, y) = (a.as_f64(), b.as_f64());
            let r = x % y;
            if r != 0.0 && ((r < 0.0) != (y < 0.0)) {
                finite(r + y)
            } else {
                finite(r)
            }
        }
    }
}

fn pow(base: Number, exponent: Number) -> Result<Number, CalcError> {
    match (base, exponent) {
        (Number::Int(b), Number::Int(e)) if e >= 0 => {
            if e > MAX_EXPONENT && b.unsigned_abs() > 1 {
                return Err(CalcError::Overflow);
            }
            let exact = u32::try_from(e).ok().and_then(|e| b.checked_pow(e));
            widen(exact, || (b as f64).powf(e as f64))
        }
        _ => {
            let (b, e) = (base.as_f64(), exponent.as_f64());
            if b == 0.0 && e < 0.0 {
                return Err(CalcError::DivisionByZero);
            }
            if b < 0.0 && e.fract() != 0.0 {
                // Complex result.
                return Err(CalcError::Overflow);
            }
            finite(b.powf(e))
        }
    }
}
