//! Small expression language for conditional and calculation macros.
//!
//! ```text
//! or      := and ( "||" and )*
//! and     := eq ( "&&" eq )*
//! eq      := cmp ( ("==" | "!=") cmp )*
//! cmp     := add ( ("<" | "<=" | ">" | ">=") add )*
//! add     := mul ( ("+" | "-") mul )*
//! mul     := unary ( ("*" | "/" | "%") unary )*
//! unary   := ("!" | "-") unary | primary
//! primary := number | string | ident | placeholder | "(" or ")"
//! ```
//!
//! Identifiers resolve through the caller's variable lookup; an unbound
//! identifier is its own name as a string. A `{…}` placeholder is a single
//! operand: the caller resolves the whole placeholder and its result is read
//! as a value, never as source, so `{user} == 'Ada Lovelace'` holds for a
//! bound `user="Ada Lovelace"`.

use std::fmt;

// ── Value ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ExprValue {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
}

impl ExprValue {
    /// Reads a bound variable: literals become typed values, anything else a string.
    pub fn from_binding(raw: &str) -> Self {
        let s = raw.trim();
        match s {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            "null" => Self::Null,
            _ => match s.parse::<f64>() {
                Ok(n) if n.is_finite() => Self::Number(n),
                _ => Self::Str(raw.to_string()),
            },
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0,
            Self::Str(s) => !(s.is_empty() || s.eq_ignore_ascii_case("false") || s == "null"),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Str(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
            Self::Null | Self::Bool(_) => None,
        }
    }
}

impl fmt::Display for ExprValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExprError {
    #[error("unexpected character {0:?}")]
    UnexpectedChar(char),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("unexpected {0}")]
    UnexpectedToken(String),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("unterminated placeholder")]
    UnterminatedPlaceholder,
    #[error("cannot resolve `{0}`")]
    Unresolved(String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("operator `{op}` needs numbers, got `{lhs}` and `{rhs}`")]
    NotNumeric { op: &'static str, lhs: String, rhs: String },
}

// ── Tokens ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Num(f64),
    Str(String),
    Ident(String),
    /// `{…}`, braces included.
    Placeholder(String),
    Op(&'static str),
    LParen,
    RParen,
}

impl fmt::Display for Tok {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tok::Num(n) => write!(f, "number {n}"),
            Tok::Str(s) => write!(f, "string {s:?}"),
            Tok::Ident(s) => write!(f, "identifier `{s}`"),
            Tok::Placeholder(s) => write!(f, "placeholder `{s}`"),
            Tok::Op(op) => write!(f, "operator `{op}`"),
            Tok::LParen => f.write_str("`(`"),
            Tok::RParen => f.write_str("`)`"),
        }
    }
}

const OPERATORS: &[&str] = &["&&", "||", "==", "!=", "<=", ">=", "<", ">", "+", "-", "*", "/", "%", "!"];

fn tokenize(src: &str) -> Result<Vec<Tok>, ExprError> {
    let mut toks = Vec::new();
    let mut chars = src.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '(' {
            chars.next();
            toks.push(Tok::LParen);
        } else if c == ')' {
            chars.next();
            toks.push(Tok::RParen);
        } else if c == '\'' || c == '"' {
            chars.next();
            let mut s = String::new();
            loop {
                match chars.next() {
                    Some((_, q)) if q == c => break,
                    Some((_, ch)) => s.push(ch),
                    None => return Err(ExprError::UnterminatedString),
                }
            }
            toks.push(Tok::Str(s));
        } else if c == '{' {
            let end = src[i..].find('}').ok_or(ExprError::UnterminatedPlaceholder)? + i + 1;
            while chars.peek().is_some_and(|&(j, _)| j < end) {
                chars.next();
            }
            toks.push(Tok::Placeholder(src[i..end].to_string()));
        } else if c.is_ascii_digit() {
            let mut end = i;
            while let Some(&(j, d)) = chars.peek() {
                if d.is_ascii_digit() || d == '.' {
                    end = j + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            let text = &src[i..end];
            let n = text.parse::<f64>().map_err(|_| ExprError::UnexpectedToken(format!("number `{text}`")))?;
            toks.push(Tok::Num(n));
        } else if c.is_alphabetic() || c == '_' {
            let mut end = i;
            while let Some(&(j, d)) = chars.peek() {
                if d.is_alphanumeric() || matches!(d, '_' | '.' | ':') {
                    end = j + d.len_utf8();
                    chars.next();
                } else {
                    break;
                }
            }
            toks.push(Tok::Ident(src[i..end].to_string()));
        } else {
            let rest = &src[i..];
            let op = OPERATORS.iter().find(|op| rest.starts_with(**op)).ok_or(ExprError::UnexpectedChar(c))?;
            for _ in 0..op.len() {
                chars.next();
            }
            toks.push(Tok::Op(*op));
        }
    }
    Ok(toks)
}

// ── Evaluator ─────────────────────────────────────────────────────────────

struct Eval<'a> {
    toks: Vec<Tok>,
    pos: usize,
    resolve: &'a dyn Fn(&str) -> Option<String>,
}

impl Eval<'_> {
    fn peek_op(&self) -> Option<&'static str> {
        match self.toks.get(self.pos) {
            Some(Tok::Op(op)) => Some(*op),
            _ => None,
        }
    }

    fn eat_op(&mut self, ops: &[&'static str]) -> Option<&'static str> {
        let op = self.peek_op().filter(|op| ops.contains(op))?;
        self.pos += 1;
        Some(op)
    }

    fn or(&mut self) -> Result<ExprValue, ExprError> {
        let mut lhs = self.and()?;
        while self.eat_op(&["||"]).is_some() {
            let rhs = self.and()?;
            lhs = ExprValue::Bool(lhs.is_truthy() || rhs.is_truthy());
        }
        Ok(lhs)
    }

    fn and(&mut self) -> Result<ExprValue, ExprError> {
        let mut lhs = self.equality()?;
        while self.eat_op(&["&&"]).is_some() {
            let rhs = self.equality()?;
            lhs = ExprValue::Bool(lhs.is_truthy() && rhs.is_truthy());
        }
        Ok(lhs)
    }

    fn equality(&mut self) -> Result<ExprValue, ExprError> {
        let mut lhs = self.comparison()?;
        while let Some(op) = self.eat_op(&["==", "!="]) {
            let rhs = self.comparison()?;
            let equal = match (lhs.as_number(), rhs.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => lhs.to_string() == rhs.to_string(),
            };
            lhs = ExprValue::Bool(if op == "==" { equal } else { !equal });
        }
        Ok(lhs)
    }

    fn comparison(&mut self) -> Result<ExprValue, ExprError> {
        let mut lhs = self.additive()?;
        while let Some(op) = self.eat_op(&["<", "<=", ">", ">="]) {
            let rhs = self.additive()?;
            let (a, b) = numbers(op, &lhs, &rhs)?;
            lhs = ExprValue::Bool(match op {
                "<" => a < b,
                "<=" => a <= b,
                ">" => a > b,
                _ => a >= b,
            });
        }
        Ok(lhs)
    }

    fn additive(&mut self) -> Result<ExprValue, ExprError> {
        let mut lhs = self.multiplicative()?;
        while let Some(op) = self.eat_op(&["+", "-"]) {
            let rhs = self.multiplicative()?;
            lhs = match (op, lhs.as_number(), rhs.as_number()) {
                ("+", Some(a), Some(b)) => ExprValue::Number(a + b),
                ("+", _, _) => ExprValue::Str(format!("{lhs}{rhs}")),
                _ => {
                    let (a, b) = numbers(op, &lhs, &rhs)?;
                    ExprValue::Number(a - b)
                }
            };
        }
        Ok(lhs)
    }

    fn multiplicative(&mut self) -> Result<ExprValue, ExprError> {
        let mut lhs = self.unary()?;
        while let Some(op) = self.eat_op(&["*", "/", "%"]) {
            let rhs = self.unary()?;
            let (a, b) = numbers(op, &lhs, &rhs)?;
            if op != "*" && b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            lhs = ExprValue::Number(match op {
                "*" => a * b,
                "/" => a / b,
                _ => a % b,
            });
        }
        Ok(lhs)
    }

    fn unary(&mut self) -> Result<ExprValue, ExprError> {
        match self.eat_op(&["!", "-"]) {
            Some("!") => Ok(ExprValue::Bool(!self.unary()?.is_truthy())),
            Some(_) => {
                let v = self.unary()?;
                let n = v.as_number().ok_or_else(|| ExprError::NotNumeric {
                    op: "-",
                    lhs: String::new(),
                    rhs: v.to_string(),
                })?;
                Ok(ExprValue::Number(-n))
            }
            None => self.primary(),
        }
    }

    fn primary(&mut self) -> Result<ExprValue, ExprError> {
        let tok = self.toks.get(self.pos).cloned().ok_or(ExprError::UnexpectedEnd)?;
        self.pos += 1;
        match tok {
            Tok::Num(n) => Ok(ExprValue::Number(n)),
            Tok::Str(s) => Ok(ExprValue::Str(s)),
            Tok::Ident(name) => Ok(match name.as_str() {
                "true" => ExprValue::Bool(true),
                "false" => ExprValue::Bool(false),
                "null" => ExprValue::Null,
                _ => match (self.resolve)(&name) {
                    Some(bound) => ExprValue::from_binding(&bound),
                    None => ExprValue::Str(name),
                },
            }),
            Tok::Placeholder(raw) => match (self.resolve)(&raw) {
                Some(value) => Ok(ExprValue::from_binding(&value)),
                None => Err(ExprError::Unresolved(raw)),
            },
            Tok::LParen => {
                let v = self.or()?;
                match self.toks.get(self.pos) {
                    Some(Tok::RParen) => {
                        self.pos += 1;
                        Ok(v)
                    }
                    Some(other) => Err(ExprError::UnexpectedToken(other.to_string())),
                    None => Err(ExprError::UnexpectedEnd),
                }
            }
            other => Err(ExprError::UnexpectedToken(other.to_string())),
        }
    }
}

fn numbers(op: &'static str, lhs: &ExprValue, rhs: &ExprValue) -> Result<(f64, f64), ExprError> {
    match (lhs.as_number(), rhs.as_number()) {
        (Some(a), Some(b)) => Ok((a, b)),
        _ => Err(ExprError::NotNumeric { op, lhs: lhs.to_string(), rhs: rhs.to_string() }),
    }
}

/// Evaluate `src`, resolving identifiers and `{…}` placeholders (passed with
/// their braces) through `resolve`.
pub fn evaluate(src: &str, resolve: &dyn Fn(&str) -> Option<String>) -> Result<ExprValue, ExprError> {
    let toks = tokenize(src)?;
    if toks.is_empty() {
        return Err(ExprError::UnexpectedEnd);
    }
    let mut eval = Eval { toks, pos: 0, resolve };
    let value = eval.or()?;
    match eval.toks.get(eval.pos) {
        None => Ok(value),
        Some(extra) => Err(ExprError::UnexpectedToken(extra.to_string())),
    }
}
