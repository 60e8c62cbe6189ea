/// Restricted expression evaluator for assignments and inline conditions.
///
/// Script text may come from an unverified generator, so input is checked
/// against a character allow-list before it is tokenised, then parsed by a
/// small recursive-descent parser into an [`Expr`] tree that is evaluated
/// directly against the session variables. Nothing is ever executed as code.
use thiserror::Error;

use crate::schema::value::{Value, Variables};

/// Punctuation admitted outside string literals, besides ASCII letters and
/// digits. Admitted characters are not necessarily valid tokens.
const ALLOWED_PUNCT: &[char] = &[
    ' ', '\t', '\r', '\n', '_', '[', ']', '\'', '"', '.', ',', ':', '+', '*', '/', '(', ')', '<',
    '>', '!', '=', '?', '&', '|', '-', '\\',
];

/// Words that never refer to variables.
pub const KEYWORDS: &[&str] = &["true", "false", "null", "and", "or", "not"];

pub const DEFAULT_MAX_LEN: usize = 512;
pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum EvalError {
    #[error("expression is {len} bytes long (limit {max})")]
    TooLong { len: usize, max: usize },
    #[error("disallowed character {0:?} in expression")]
    Disallowed(char),
    #[error("unterminated string literal")]
    UnterminatedString,
    #[error("invalid number literal '{0}'")]
    BadNumber(String),
    #[error("unexpected token '{0}'")]
    UnexpectedToken(String),
    #[error("unexpected end of expression")]
    UnexpectedEnd,
    #[error("expression nests deeper than {0} levels")]
    TooDeep(usize),
    #[error("unbound identifier '{0}'")]
    Unbound(String),
    #[error("cannot apply '{op}' to {lhs} and {rhs}")]
    TypeMismatch {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("cannot apply '{op}' to {operand}")]
    BadOperand {
        op: &'static str,
        operand: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow")]
    Overflow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> &'static str {
        match self {
            BinaryOp::Or => "||",
            BinaryOp::And => "&&",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
        }
    }
}

/// Parsed expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Literal(Value),
    Var(String),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Lit(Value),
    Str(String),
    Ident(String),
    LParen,
    RParen,
    Not,
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// `-` is binary or unary depending on position.
    Minus,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Lit(v) => v.to_string(),
            Token::Str(s) => format!("\"{}\"", s),
            Token::Ident(name) => name.clone(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Not => "!".to_string(),
            Token::Unary(_) => "not".to_string(),
            Token::Binary(op) => op.symbol().to_string(),
            Token::Minus => "-".to_string(),
        }
    }
}

/// Reject anything outside the allow-list. String literal contents are
/// exempt.
pub fn check_allowed(src: &str) -> Result<(), EvalError> {
    let mut chars = src.chars();
    while let Some(c) = chars.next() {
        if c == '"' || c == '\'' {
            skip_string(&mut chars, c)?;
            continue;
        }
        if !(c.is_ascii_alphanumeric() || ALLOWED_PUNCT.contains(&c)) {
            return Err(EvalError::Disallowed(c));
        }
    }
    Ok(())
}

pub(crate) fn skip_string(chars: &mut std::str::Chars<'_>, quote: char) -> Result<(), EvalError> {
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        } else if c == quote {
            return Ok(());
        }
    }
    Err(EvalError::UnterminatedString)
}

/// Identifiers an expression refers to, found by a lexical scan that skips
/// string literals and keywords. Works on text the parser would reject.
pub fn identifiers_in(src: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();
    let chars: Vec<char> = src.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '"' || c == '\'' {
            i += 1;
            while i < chars.len() && chars[i] != c {
                if chars[i] == '\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
        } else if c.is_ascii_digit() {
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                i += 1;
            }
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                i += 1;
            }
            let word: String = chars[start..i].iter().collect();
            if !KEYWORDS.contains(&word.as_str()) && !found.contains(&word) {
                found.push(word);
            }
        } else {
            i += 1;
        }
    }
    found
}

fn tokenize(src: &str) -> Result<Vec<Token>, EvalError> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();
        match c {
            c if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '+' => {
                tokens.push(Token::Binary(BinaryOp::Add));
                i += 1;
            }
            '-' => {
                tokens.push(Token::Minus);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Binary(BinaryOp::Mul));
                i += 1;
            }
            '/' => {
                tokens.push(Token::Binary(BinaryOp::Div));
                i += 1;
            }
            '<' | '>' => {
                let with_eq = next == Some('=');
                tokens.push(Token::Binary(match (c, with_eq) {
                    ('<', true) => BinaryOp::Le,
                    ('<', false) => BinaryOp::Lt,
                    (_, true) => BinaryOp::Ge,
                    (_, false) => BinaryOp::Gt,
                }));
                i += if with_eq { 2 } else { 1 };
            }
            '=' if next == Some('=') => {
                tokens.push(Token::Binary(BinaryOp::Eq));
                i += 2;
            }
            '!' if next == Some('=') => {
                tokens.push(Token::Binary(BinaryOp::Ne));
                i += 2;
            }
            '!' => {
                tokens.push(Token::Not);
                i += 1;
            }
            '&' if next == Some('&') => {
                tokens.push(Token::Binary(BinaryOp::And));
                i += 2;
            }
            '|' if next == Some('|') => {
                tokens.push(Token::Binary(BinaryOp::Or));
                i += 2;
            }
            '"' | '\'' => {
                let (literal, end) = lex_string(&chars, i)?;
                tokens.push(Token::Str(literal));
                i = end;
            }
            c if c.is_ascii_digit() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                tokens.push(Token::Lit(lex_number(&text)?));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                tokens.push(match word.as_str() {
                    "true" => Token::Lit(Value::Bool(true)),
                    "false" => Token::Lit(Value::Bool(false)),
                    "and" => Token::Binary(BinaryOp::And),
                    "or" => Token::Binary(BinaryOp::Or),
                    "not" => Token::Unary(UnaryOp::Not),
                    _ => Token::Ident(word),
                });
            }
            other => return Err(EvalError::UnexpectedToken(other.to_string())),
        }
    }
    Ok(tokens)
}

fn lex_string(chars: &[char], start: usize) -> Result<(String, usize), EvalError> {
    let quote = chars[start];
    let mut out = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = chars.get(i + 1).ok_or(EvalError::UnterminatedString)?;
                out.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    other => *other,
                });
                i += 2;
            }
            c if c == quote => return Ok((out, i + 1)),
            c => {
                out.push(c);
                i += 1;
            }
        }
    }
    Err(EvalError::UnterminatedString)
}

fn lex_number(text: &str) -> Result<Value, EvalError> {
    let bad = || EvalError::BadNumber(text.to_string());
    if text.bytes().all(|b| b.is_ascii_digit()) {
        return text.parse().map(Value::Int).map_err(|_| bad());
    }
    match text.split_once('.') {
        Some((whole, frac))
            if !frac.is_empty()
                && whole.bytes().all(|b| b.is_ascii_digit())
                && frac.bytes().all(|b| b.is_ascii_digit()) =>
        {
            text.parse().map(Value::Float).map_err(|_| bad())
        }
        _ => Err(bad()),
    }
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn enter(&mut self) -> Result<(), EvalError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(EvalError::TooDeep(self.max_depth));
        }
        Ok(())
    }

    fn parse(mut self) -> Result<Expr, EvalError> {
        let expr = self.parse_or()?;
        match self.peek() {
            None => Ok(expr),
            Some(token) => Err(EvalError::UnexpectedToken(token.describe())),
        }
    }

    /// Parse a left-associative level: `next (op next)*`.
    fn binary_level(
        &mut self,
        ops: &[BinaryOp],
        next: fn(&mut Parser) -> Result<Expr, EvalError>,
    ) -> Result<Expr, EvalError> {
        let mut lhs = next(self)?;
        loop {
            let op = match self.peek() {
                Some(Token::Binary(op)) if ops.contains(op) => *op,
                Some(Token::Minus) if ops.contains(&BinaryOp::Sub) => BinaryOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = next(self)?;
            lhs = Expr::Binary(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn parse_or(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[BinaryOp::Or], Parser::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[BinaryOp::And], Parser::parse_equality)
    }

    fn parse_equality(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[BinaryOp::Eq, BinaryOp::Ne], Parser::parse_comparison)
    }

    fn parse_comparison(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(
            &[BinaryOp::Lt, BinaryOp::Le, BinaryOp::Gt, BinaryOp::Ge],
            Parser::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[BinaryOp::Add, BinaryOp::Sub], Parser::parse_term)
    }

    fn parse_term(&mut self) -> Result<Expr, EvalError> {
        self.binary_level(&[BinaryOp::Mul, BinaryOp::Div], Parser::parse_unary)
    }

    fn parse_unary(&mut self) -> Result<Expr, EvalError> {
        let op = match self.peek() {
            Some(Token::Not) | Some(Token::Unary(UnaryOp::Not)) => UnaryOp::Not,
            Some(Token::Minus) => UnaryOp::Neg,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        self.enter()?;
        let operand = self.parse_unary()?;
        self.depth -= 1;
        Ok(Expr::Unary(op, Box::new(operand)))
    }

    fn parse_primary(&mut self) -> Result<Expr, EvalError> {
        match self.advance() {
            Some(Token::Lit(value)) => Ok(Expr::Literal(value)),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::Ident(name)) => Ok(Expr::Var(name)),
            Some(Token::LParen) => {
                self.enter()?;
                let inner = self.parse_or()?;
                self.depth -= 1;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    Some(other) => Err(EvalError::UnexpectedToken(other.describe())),
                    None => Err(EvalError::UnexpectedEnd),
                }
            }
            Some(other) => Err(EvalError::UnexpectedToken(other.describe())),
            None => Err(EvalError::UnexpectedEnd),
        }
    }
}

impl Expr {
    /// Evaluate against a variable environment.
    pub fn eval(&self, vars: &Variables) -> Result<Value, EvalError> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Var(name) => vars
                .get(name)
                .cloned()
                .ok_or_else(|| EvalError::Unbound(name.clone())),
            Expr::Unary(op, operand) => eval_unary(*op, operand.eval(vars)?),
            Expr::Binary(BinaryOp::And, lhs, rhs) => {
                if !lhs.eval(vars)?.is_truthy() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(rhs.eval(vars)?.is_truthy()))
            }
            Expr::Binary(BinaryOp::Or, lhs, rhs) => {
                if lhs.eval(vars)?.is_truthy() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(rhs.eval(vars)?.is_truthy()))
            }
            Expr::Binary(op, lhs, rhs) => eval_binary(*op, lhs.eval(vars)?, rhs.eval(vars)?),
        }
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> Result<Value, EvalError> {
    match (op, value) {
        (UnaryOp::Not, v) => Ok(Value::Bool(!v.is_truthy())),
        (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int).ok_or(EvalError::Overflow),
        (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
        (UnaryOp::Neg, other) => Err(EvalError::BadOperand {
            op: "-",
            operand: other.type_name(),
        }),
    }
}

fn eval_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    let mismatch = |lhs: &Value, rhs: &Value| EvalError::TypeMismatch {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    };

    match op {
        BinaryOp::Eq => Ok(Value::Bool(values_equal(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!values_equal(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (&lhs, &rhs) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => match (lhs.as_f64(), rhs.as_f64()) {
                    (Some(a), Some(b)) => a.partial_cmp(&b),
                    _ => return Err(mismatch(&lhs, &rhs)),
                },
            };
            let Some(ordering) = ordering else {
                return Ok(Value::Bool(false));
            };
            Ok(Value::Bool(match op {
                BinaryOp::Lt => ordering.is_lt(),
                BinaryOp::Le => ordering.is_le(),
                BinaryOp::Gt => ordering.is_gt(),
                _ => ordering.is_ge(),
            }))
        }
        BinaryOp::Add if matches!(lhs, Value::String(_)) || matches!(rhs, Value::String(_)) => {
            Ok(Value::String(format!("{}{}", lhs, rhs)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div => {
            arithmetic(op, &lhs, &rhs).ok_or_else(|| mismatch(&lhs, &rhs))?
        }
        // Logical operators short-circuit in `Expr::eval`.
        BinaryOp::And | BinaryOp::Or => Ok(Value::Bool(lhs.is_truthy() && rhs.is_truthy())),
    }
}

/// `None` when either side is not a number.
fn arithmetic(op: BinaryOp, lhs: &Value, rhs: &Value) -> Option<Result<Value, EvalError>> {
    if let (Value::Int(a), Value::Int(b)) = (lhs, rhs) {
        let (a, b) = (*a, *b);
        return Some(match op {
            BinaryOp::Add => a.checked_add(b).map(Value::Int).ok_or(EvalError::Overflow),
            BinaryOp::Sub => a.checked_sub(b).map(Value::Int).ok_or(EvalError::Overflow),
            BinaryOp::Mul => a.checked_mul(b).map(Value::Int).ok_or(EvalError::Overflow),
            _ if b == 0 => Err(EvalError::DivisionByZero),
            _ => match (a.checked_rem(b), a.checked_div(b)) {
                (Some(0), Some(quotient)) => Ok(Value::Int(quotient)),
                (Some(_), Some(_)) => Ok(Value::Float(a as f64 / b as f64)),
                _ => Err(EvalError::Overflow),
            },
        });
    }
    let (a, b) = (lhs.as_f64()?, rhs.as_f64()?);
    Some(match op {
        BinaryOp::Add => Ok(Value::Float(a + b)),
        BinaryOp::Sub => Ok(Value::Float(a - b)),
        BinaryOp::Mul => Ok(Value::Float(a * b)),
        _ if b == 0.0 => Err(EvalError::DivisionByZero),
        _ => Ok(Value::Float(a / b)),
    })
}

fn values_equal(lhs: &Value, rhs: &Value) -> bool {
    match (lhs.as_f64(), rhs.as_f64()) {
        (Some(a), Some(b)) => a == b,
        _ => lhs == rhs,
    }
}

/// Evaluator entry point carrying the trust-boundary limits.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    max_len: usize,
    max_depth: usize,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_LEN, DEFAULT_MAX_DEPTH)
    }
}

impl Evaluator {
    pub fn new(max_len: usize, max_depth: usize) -> Self {
        Self { max_len, max_depth }
    }

    /// Check, tokenise and parse an expression.
    pub fn parse(&self, src: &str) -> Result<Expr, EvalError> {
        if src.len() > self.max_len {
            return Err(EvalError::TooLong {
                len: src.len(),
                max: self.max_len,
            });
        }
        check_allowed(src)?;
        let tokens = tokenize(src)?;
        if tokens.is_empty() {
            return Err(EvalError::UnexpectedEnd);
        }
        Parser {
            tokens,
            pos: 0,
            depth: 0,
            max_depth: self.max_depth,
        }
        .parse()
    }

    pub fn evaluate(&self, src: &str, vars: &Variables) -> Result<Value, EvalError> {
        self.parse(src)?.eval(vars)
    }

    /// Evaluate a condition; any rejection or failure reads as `false`.
    pub fn condition(&self, src: &str, vars: &Variables) -> bool {
        match self.evaluate(src, vars) {
            Ok(value) => value.is_truthy(),
            Err(e) => {
                tracing::warn!(expr = src, error = %e, "condition rejected, treating as false");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars() -> Variables {
        Variables::from([
            ("coins".to_string(), Value::Int(3)),
            ("name".to_string(), Value::String("Ann".to_string())),
            ("met".to_string(), Value::Bool(true)),
            ("ratio".to_string(), Value::Float(0.5)),
        ])
    }

    fn eval(src: &str) -> Result<Value, EvalError> {
        Evaluator::default().evaluate(src, &vars())
    }

    #[test]
    fn arithmetic_precedence() {
        assert_eq!(eval("1 + 2 * 3"), Ok(Value::Int(7)));
        assert_eq!(eval("(1 + 2) * 3"), Ok(Value::Int(9)));
        assert_eq!(eval("coins - 1 - 1"), Ok(Value::Int(1)));
        assert_eq!(eval("-coins + 4"), Ok(Value::Int(1)));
        assert_eq!(eval("7 / 2"), Ok(Value::Float(3.5)));
        assert_eq!(eval("6 / 2"), Ok(Value::Int(3)));
        assert_eq!(eval("ratio * 4"), Ok(Value::Float(2.0)));
    }

    #[test]
    fn comparison_and_logic() {
        assert_eq!(eval("coins > 2 && met"), Ok(Value::Bool(true)));
        assert_eq!(eval("coins >= 4 || !met"), Ok(Value::Bool(false)));
        assert_eq!(eval("coins == 3.0"), Ok(Value::Bool(true)));
        assert_eq!(eval("name != \"Bob\""), Ok(Value::Bool(true)));
        assert_eq!(eval("not met or coins < 10"), Ok(Value::Bool(true)));
        assert_eq!(eval("'a' < 'b'"), Ok(Value::Bool(true)));
    }

    #[test]
    fn string_concatenation() {
        assert_eq!(eval("\"Hi \" + name"), Ok(Value::String("Hi Ann".to_string())));
        assert_eq!(eval("name + coins"), Ok(Value::String("Ann3".to_string())));
    }

    #[test]
    fn short_circuit_skips_unbound() {
        assert_eq!(eval("false && missing"), Ok(Value::Bool(false)));
        assert_eq!(eval("true || missing"), Ok(Value::Bool(true)));
    }

    #[test]
    fn allow_list_rejects_foreign_characters() {
        assert_eq!(eval("coins % 2"), Err(EvalError::Disallowed('%')));
        assert_eq!(eval("coins; drop"), Err(EvalError::Disallowed(';')));
        assert_eq!(eval("`x`"), Err(EvalError::Disallowed('`')));
        assert_eq!(eval("{coins}"), Err(EvalError::Disallowed('{')));
    }

    #[test]
    fn string_contents_are_exempt_from_allow_list() {
        assert_eq!(eval("\"50% off; привет\""), Ok(Value::String("50% off; привет".to_string())));
    }

    #[test]
    fn admitted_but_meaningless_tokens_fail_to_parse() {
        assert!(matches!(eval("a.b"), Err(EvalError::UnexpectedToken(_))));
        assert!(matches!(eval("coins = 1"), Err(EvalError::UnexpectedToken(_))));
        assert!(matches!(eval("met ? 1 : 2"), Err(EvalError::UnexpectedToken(_))));
        assert!(matches!(eval("alert(1)"), Err(EvalError::UnexpectedToken(_))));
    }

    #[test]
    fn structural_errors() {
        assert_eq!(eval(""), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("(1 + 2"), Err(EvalError::UnexpectedEnd));
        assert_eq!(eval("\"open"), Err(EvalError::UnterminatedString));
        assert_eq!(eval("1.2.3"), Err(EvalError::BadNumber("1.2.3".to_string())));
    }

    #[test]
    fn runtime_errors() {
        assert_eq!(eval("missing + 1"), Err(EvalError::Unbound("missing".to_string())));
        assert_eq!(eval("coins / 0"), Err(EvalError::DivisionByZero));
        assert!(matches!(eval("name - 1"), Err(EvalError::TypeMismatch { op: "-", .. })));
        assert!(matches!(eval("-name"), Err(EvalError::BadOperand { .. })));
        assert_eq!(eval("9223372036854775807 + 1"), Err(EvalError::Overflow));
        assert_eq!(eval("(-9223372036854775807 - 1) / -1"), Err(EvalError::Overflow));
        assert_eq!(eval("(-9223372036854775807 - 1) / 1"), Ok(Value::Int(i64::MIN)));
    }

    #[test]
    fn overflowing_division_in_condition_is_false() {
        let evaluator = Evaluator::default();
        assert!(!evaluator.condition("(-9223372036854775807 - 1) / -1 > 0", &vars()));
    }

    #[test]
    fn limits() {
        let evaluator = Evaluator::new(16, 3);
        assert!(matches!(
            evaluator.evaluate("1 + 1 + 1 + 1 + 1 + 1", &vars()),
            Err(EvalError::TooLong { .. })
        ));
        assert_eq!(evaluator.evaluate("((((1))))", &vars()), Err(EvalError::TooDeep(3)));
        assert_eq!(evaluator.evaluate("((1))", &vars()), Ok(Value::Int(1)));
    }

    #[test]
    fn condition_degrades_to_false() {
        let evaluator = Evaluator::default();
        assert!(evaluator.condition("coins > 1", &vars()));
        assert!(!evaluator.condition("coins %% 1", &vars()));
        assert!(!evaluator.condition("missing", &vars()));
    }

    #[test]
    fn identifier_scan() {
        assert_eq!(
            identifiers_in("coins > 2 and name == \"gold coins\" or true"),
            vec!["coins".to_string(), "name".to_string()]
        );
        assert_eq!(identifiers_in("null || 3x"), Vec::<String>::new());
    }
}
