//! Boolean expressions for `@if` / `@elseif`
//!
//! A small sandboxed language: literals (numbers, quoted strings, `true`,
//! `false`, `null`), names bound from the configuration namespace, `!`,
//! unary `-`, comparisons (`==`, `!=`, `<`, `<=`, `>`, `>=`, with `===` and
//! `!==` accepted as spellings of the first two), `&&`, `||` and
//! parentheses. Nothing else is evaluated.

use crate::ConfigMap;
use serde_json::Value;
use std::cmp::Ordering;
use std::fmt;

type EvalResult<T> = std::result::Result<T, String>;

/// Deepest run of unary operators or parentheses the parser accepts.
const MAX_NESTING: usize = 128;

/// Most binary operators one expression may contain.
const MAX_OPERATORS: usize = 512;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Name(String),
    Number(f64),
    Str(String),
    True,
    False,
    Null,
    Not,
    Minus,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LeftParen,
    RightParen,
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Token::Name(name) => write!(f, "name '{}'", name),
            Token::Number(n) => write!(f, "number {}", n),
            Token::Str(s) => write!(f, "string \"{}\"", s),
            Token::True => write!(f, "true"),
            Token::False => write!(f, "false"),
            Token::Null => write!(f, "null"),
            Token::Not => write!(f, "!"),
            Token::Minus => write!(f, "-"),
            Token::And => write!(f, "&&"),
            Token::Or => write!(f, "||"),
            Token::Eq => write!(f, "=="),
            Token::Ne => write!(f, "!="),
            Token::Lt => write!(f, "<"),
            Token::Le => write!(f, "<="),
            Token::Gt => write!(f, ">"),
            Token::Ge => write!(f, ">="),
            Token::LeftParen => write!(f, "("),
            Token::RightParen => write!(f, ")"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Comparison {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    Literal(Value),
    Name(String),
    Not(Box<Expr>),
    Negate(Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Compare(Comparison, Box<Expr>, Box<Expr>),
}

/// Evaluate `source` against `scope` and reduce the result to a boolean.
pub fn evaluate(source: &str, scope: &ConfigMap) -> EvalResult<bool> {
    let tokens = tokenize(source)?;
    if tokens.is_empty() {
        return Err("Empty expression".to_string());
    }
    let mut parser = Parser {
        tokens,
        position: 0,
        depth: 0,
        operators: 0,
    };
    let expr = parser.parse_or()?;
    if let Some(token) = parser.peek() {
        return Err(format!("Unexpected {} after expression", token));
    }
    Ok(truthy(&expr.eval(scope)?))
}

/// Truthiness of a configuration value: `false`, `null`, `0` and `""` are
/// false, everything else is true.
pub fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0 && !f.is_nan()).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

fn tokenize(source: &str) -> EvalResult<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let next = chars.get(i + 1).copied();
        let after = chars.get(i + 2).copied();

        if ch.is_whitespace() {
            i += 1;
            continue;
        }

        let (token, width) = match ch {
            '(' => (Token::LeftParen, 1),
            ')' => (Token::RightParen, 1),
            '-' => (Token::Minus, 1),
            '!' if next == Some('=') && after == Some('=') => (Token::Ne, 3),
            '!' if next == Some('=') => (Token::Ne, 2),
            '!' => (Token::Not, 1),
            '=' if next == Some('=') && after == Some('=') => (Token::Eq, 3),
            '=' if next == Some('=') => (Token::Eq, 2),
            '=' => return Err("Assignment is not allowed in conditions".to_string()),
            '<' if next == Some('=') => (Token::Le, 2),
            '<' => (Token::Lt, 1),
            '>' if next == Some('=') => (Token::Ge, 2),
            '>' => (Token::Gt, 1),
            '&' if next == Some('&') => (Token::And, 2),
            '|' if next == Some('|') => (Token::Or, 2),
            '"' | '\'' => {
                let (text, width) = read_string(&chars[i..])?;
                (Token::Str(text), width)
            }
            c if c.is_ascii_digit() || (c == '.' && next.map_or(false, |n| n.is_ascii_digit())) => {
                let mut width = 0;
                while let Some(&c) = chars.get(i + width) {
                    let exponent_sign = (c == '+' || c == '-')
                        && width > 0
                        && matches!(chars.get(i + width - 1), Some('e') | Some('E'))
                        && chars.get(i + width + 1).map_or(false, |d| d.is_ascii_digit());
                    if c.is_ascii_alphanumeric() || c == '.' || exponent_sign {
                        width += 1;
                    } else {
                        break;
                    }
                }
                let text: String = chars[i..i + width].iter().collect();
                let number = text
                    .parse::<f64>()
                    .map_err(|_| format!("Invalid number: {}", text))?;
                (Token::Number(number), width)
            }
            c if c.is_alphabetic() || c == '_' || c == '$' => {
                let width = chars[i..]
                    .iter()
                    .take_while(|c| c.is_alphanumeric() || **c == '_' || **c == '$')
                    .count();
                let word: String = chars[i..i + width].iter().collect();
                let token = match word.as_str() {
                    "true" => Token::True,
                    "false" => Token::False,
                    "null" | "undefined" => Token::Null,
                    _ => Token::Name(word),
                };
                (token, width)
            }
            other => return Err(format!("Unexpected character: '{}'", other)),
        };

        tokens.push(token);
        i += width;
    }

    Ok(tokens)
}

/// Read a quoted string starting at `chars[0]`; returns the text and the
/// number of characters consumed including both quotes.
fn read_string(chars: &[char]) -> EvalResult<(String, usize)> {
    let quote = chars[0];
    let mut text = String::new();
    let mut i = 1;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                let escaped = chars.get(i + 1).ok_or("Unterminated string literal")?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => *other,
                });
                i += 2;
            }
            c if c == quote => return Ok((text, i + 1)),
            c => {
                text.push(c);
                i += 1;
            }
        }
    }
    Err("Unterminated string literal".to_string())
}

struct Parser {
    tokens: Vec<Token>,
    position: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.position)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.position).cloned();
        if token.is_some() {
            self.position += 1;
        }
        token
    }

    fn nested(&mut self, parse: fn(&mut Self) -> EvalResult<Expr>) -> EvalResult<Expr> {
        if self.depth >= MAX_NESTING {
            return Err("Expression nested too deeply".to_string());
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    fn count_operator(&mut self) -> EvalResult<()> {
        self.operators += 1;
        if self.operators > MAX_OPERATORS {
            return Err("Expression has too many operators".to_string());
        }
        Ok(())
    }

    fn parse_or(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.advance();
            let right = self.parse_and()?;
            self.count_operator()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_equality()?;
        while self.peek() == Some(&Token::And) {
            self.advance();
            let right = self.parse_equality()?;
            self.count_operator()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_relational()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => Comparison::Eq,
                Some(Token::Ne) => Comparison::Ne,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_relational()?;
            self.count_operator()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_relational(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => Comparison::Lt,
                Some(Token::Le) => Comparison::Le,
                Some(Token::Gt) => Comparison::Gt,
                Some(Token::Ge) => Comparison::Ge,
                _ => return Ok(left),
            };
            self.advance();
            let right = self.parse_unary()?;
            self.count_operator()?;
            left = Expr::Compare(op, Box::new(left), Box::new(right));
        }
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        match self.peek() {
            Some(Token::Not) => {
                self.advance();
                Ok(Expr::Not(Box::new(self.nested(Self::parse_unary)?)))
            }
            Some(Token::Minus) => {
                self.advance();
                Ok(Expr::Negate(Box::new(self.nested(Self::parse_unary)?)))
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        match self.advance() {
            Some(Token::Name(name)) => Ok(Expr::Name(name)),
            Some(Token::Number(n)) => Ok(Expr::Literal(number_value(n)?)),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::LeftParen) => {
                let inner = self.nested(Self::parse_or)?;
                match self.advance() {
                    Some(Token::RightParen) => Ok(inner),
                    Some(other) => Err(format!("Expected ')' but found {}", other)),
                    None => Err("Expected ')' but reached end of expression".to_string()),
                }
            }
            Some(other) => Err(format!("Unexpected {}", other)),
            None => Err("Unexpected end of expression".to_string()),
        }
    }
}

fn number_value(n: f64) -> EvalResult<Value> {
    serde_json::Number::from_f64(n)
        .map(Value::Number)
        .ok_or_else(|| format!("Invalid number: {}", n))
}

impl Expr {
    fn eval(&self, scope: &ConfigMap) -> EvalResult<Value> {
        match self {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Name(name) => scope
                .get(name)
                .cloned()
                .ok_or_else(|| format!("Unknown name '{}'", name)),
            Expr::Not(inner) => Ok(Value::Bool(!truthy(&inner.eval(scope)?))),
            Expr::Negate(inner) => match inner.eval(scope)?.as_f64() {
                Some(n) => number_value(-n),
                None => Err("Unary '-' needs a number".to_string()),
            },
            Expr::And(left, right) => {
                if !truthy(&left.eval(scope)?) {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(truthy(&right.eval(scope)?)))
            }
            Expr::Or(left, right) => {
                if truthy(&left.eval(scope)?) {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(truthy(&right.eval(scope)?)))
            }
            Expr::Compare(op, left, right) => {
                let left = left.eval(scope)?;
                let right = right.eval(scope)?;
                compare(*op, &left, &right).map(Value::Bool)
            }
        }
    }
}

fn compare(op: Comparison, left: &Value, right: &Value) -> EvalResult<bool> {
    let equal = match (left.as_f64(), right.as_f64()) {
        (Some(l), Some(r)) => l == r,
        _ => left == right,
    };
    match op {
        Comparison::Eq => return Ok(equal),
        Comparison::Ne => return Ok(!equal),
        _ => {}
    }

    let ordering = match (left, right) {
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .zip(r.as_f64())
            .and_then(|(l, r)| l.partial_cmp(&r)),
        (Value::String(l), Value::String(r)) => Some(l.cmp(r)),
        _ => None,
    }
    .ok_or_else(|| format!("Cannot compare {} with {}", left, right))?;

    Ok(match op {
        Comparison::Lt => ordering == Ordering::Less,
        Comparison::Le => ordering != Ordering::Greater,
        Comparison::Gt => ordering == Ordering::Greater,
        _ => ordering != Ordering::Less,
    })
}
