//! Attribute filters attached to catalogue checks.
//!
//! The supported grammar is the subset of SQL where-clauses the catalogue uses:
//! comparisons, `[NOT] IN (...)`, `IS [NOT] NULL`, `[NOT] LIKE`, `AND`, `OR`,
//! `NOT` and parentheses. Identifiers may be bare or double-quoted.

use std::cmp::Ordering;

use crate::collect::provider::FieldValue;
use crate::error::{Result, RouteCardError};

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(f64),
    Op(CompareOp),
    LParen,
    RParen,
    Comma,
    And,
    Or,
    Not,
    In,
    Is,
    Null,
    Like,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone, PartialEq)]
enum Literal {
    Str(String),
    Num(f64),
}

#[derive(Debug, Clone, PartialEq)]
enum Expr {
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Compare(String, CompareOp, Literal),
    In(String, Vec<Literal>, bool),
    IsNull(String, bool),
    Like(String, String, bool),
}

/// A parsed where-clause, evaluated against one feature at a time
#[derive(Debug, Clone, PartialEq)]
pub struct DefinitionQuery {
    source: String,
    expr: Expr,
}

impl DefinitionQuery {
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = tokenize(source)?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser.parse_or()?;
        if parser.pos != parser.tokens.len() {
            return Err(invalid(source, "unexpected trailing tokens"));
        }
        Ok(DefinitionQuery {
            source: source.to_string(),
            expr,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    /// Field names referenced by the clause
    pub fn fields(&self) -> Vec<String> {
        let mut names = Vec::new();
        collect_fields(&self.expr, &mut names);
        names
    }

    /// Evaluate against a feature; `lookup` resolves a field name to its value.
    /// Unknown fields behave like NULL.
    pub fn matches<'a, F>(&self, lookup: F) -> bool
    where
        F: Fn(&str) -> Option<&'a FieldValue>,
    {
        eval(&self.expr, &lookup)
    }
}

fn invalid(source: &str, reason: &str) -> RouteCardError {
    RouteCardError::provider(
        "definition query",
        format!("invalid definition query '{}': {}", source, reason),
    )
}

fn tokenize(source: &str) -> Result<Vec<Token>> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            _ if c.is_whitespace() => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '=' => {
                tokens.push(Token::Op(CompareOp::Eq));
                i += 1;
            }
            '!' if chars.get(i + 1) == Some(&'=') => {
                tokens.push(Token::Op(CompareOp::Ne));
                i += 2;
            }
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    tokens.push(Token::Op(CompareOp::Le));
                    i += 2;
                }
                Some('>') => {
                    tokens.push(Token::Op(CompareOp::Ne));
                    i += 2;
                }
                _ => {
                    tokens.push(Token::Op(CompareOp::Lt));
                    i += 1;
                }
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Op(CompareOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Op(CompareOp::Gt));
                    i += 1;
                }
            }
            '\'' => {
                let mut value = String::new();
                i += 1;
                loop {
                    match chars.get(i) {
                        None => return Err(invalid(source, "unterminated string literal")),
                        Some('\'') if chars.get(i + 1) == Some(&'\'') => {
                            value.push('\'');
                            i += 2;
                        }
                        Some('\'') => {
                            i += 1;
                            break;
                        }
                        Some(ch) => {
                            value.push(*ch);
                            i += 1;
                        }
                    }
                }
                tokens.push(Token::Str(value));
            }
            '"' | '[' => {
                let close = if c == '"' { '"' } else { ']' };
                let start = i + 1;
                let end = chars[start..]
                    .iter()
                    .position(|ch| *ch == close)
                    .map(|p| start + p)
                    .ok_or_else(|| invalid(source, "unterminated quoted identifier"))?;
                tokens.push(Token::Ident(chars[start..end].iter().collect()));
                i = end + 1;
            }
            _ if c.is_ascii_digit() || c == '.' || (c == '-' && next_is_number(&chars, i)) => {
                let start = i;
                i += 1;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| invalid(source, "malformed number"))?;
                tokens.push(Token::Num(value));
            }
            _ if c.is_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_alphanumeric() || chars[i] == '_' || chars[i] == '.') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                let token = match word.to_ascii_uppercase().as_str() {
                    "AND" => Token::And,
                    "OR" => Token::Or,
                    "NOT" => Token::Not,
                    "IN" => Token::In,
                    "IS" => Token::Is,
                    "NULL" => Token::Null,
                    "LIKE" => Token::Like,
                    _ => Token::Ident(word),
                };
                tokens.push(token);
            }
            _ => return Err(invalid(source, &format!("unexpected character '{}'", c))),
        }
    }
    Ok(tokens)
}

fn next_is_number(chars: &[char], i: usize) -> bool {
    chars.get(i + 1).map(|c| c.is_ascii_digit()).unwrap_or(false)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn error(&self, reason: &str) -> RouteCardError {
        RouteCardError::provider(
            "definition query",
            format!("invalid definition query at token {}: {}", self.pos, reason),
        )
    }

    fn parse_or(&mut self) -> Result<Expr> {
        let mut left = self.parse_and()?;
        while self.peek() == Some(&Token::Or) {
            self.pos += 1;
            let right = self.parse_and()?;
            left = Expr::Or(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_and(&mut self) -> Result<Expr> {
        let mut left = self.parse_unary()?;
        while self.peek() == Some(&Token::And) {
            self.pos += 1;
            let right = self.parse_unary()?;
            left = Expr::And(Box::new(left), Box::new(right));
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> Result<Expr> {
        match self.peek() {
            Some(Token::Not) => {
                self.pos += 1;
                Ok(Expr::Not(Box::new(self.parse_unary()?)))
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.parse_or()?;
                match self.next() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("expected ')'")),
                }
            }
            _ => self.parse_predicate(),
        }
    }

    fn parse_predicate(&mut self) -> Result<Expr> {
        let field = match self.next() {
            Some(Token::Ident(name)) => name,
            _ => return Err(self.error("expected a field name")),
        };

        match self.next() {
            Some(Token::Op(op)) => Ok(Expr::Compare(field, op, self.parse_literal()?)),
            Some(Token::Is) => {
                let negated = if self.peek() == Some(&Token::Not) {
                    self.pos += 1;
                    true
                } else {
                    false
                };
                match self.next() {
                    Some(Token::Null) => Ok(Expr::IsNull(field, negated)),
                    _ => Err(self.error("expected NULL")),
                }
            }
            Some(Token::In) => Ok(Expr::In(field, self.parse_list()?, false)),
            Some(Token::Like) => Ok(Expr::Like(field, self.parse_pattern()?, false)),
            Some(Token::Not) => match self.next() {
                Some(Token::In) => Ok(Expr::In(field, self.parse_list()?, true)),
                Some(Token::Like) => Ok(Expr::Like(field, self.parse_pattern()?, true)),
                _ => Err(self.error("expected IN or LIKE after NOT")),
            },
            _ => Err(self.error("expected an operator")),
        }
    }

    fn parse_literal(&mut self) -> Result<Literal> {
        match self.next() {
            Some(Token::Str(s)) => Ok(Literal::Str(s)),
            Some(Token::Num(n)) => Ok(Literal::Num(n)),
            _ => Err(self.error("expected a literal")),
        }
    }

    fn parse_pattern(&mut self) -> Result<String> {
        match self.next() {
            Some(Token::Str(s)) => Ok(s),
            _ => Err(self.error("expected a quoted pattern")),
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Literal>> {
        if self.next() != Some(Token::LParen) {
            return Err(self.error("expected '('"));
        }
        let mut values = vec![self.parse_literal()?];
        loop {
            match self.next() {
                Some(Token::Comma) => values.push(self.parse_literal()?),
                Some(Token::RParen) => return Ok(values),
                _ => return Err(self.error("expected ',' or ')'")),
            }
        }
    }
}

fn collect_fields(expr: &Expr, names: &mut Vec<String>) {
    match expr {
        Expr::And(a, b) | Expr::Or(a, b) => {
            collect_fields(a, names);
            collect_fields(b, names);
        }
        Expr::Not(inner) => collect_fields(inner, names),
        Expr::Compare(field, _, _)
        | Expr::In(field, _, _)
        | Expr::IsNull(field, _)
        | Expr::Like(field, _, _) => {
            if !names.iter().any(|n| n.eq_ignore_ascii_case(field)) {
                names.push(field.clone());
            }
        }
    }
}

fn eval<'a, F>(expr: &Expr, lookup: &F) -> bool
where
    F: Fn(&str) -> Option<&'a FieldValue>,
{
    let value_of = |field: &str| lookup(field).filter(|v| !v.is_null());
    match expr {
        Expr::And(a, b) => eval(a, lookup) && eval(b, lookup),
        Expr::Or(a, b) => eval(a, lookup) || eval(b, lookup),
        Expr::Not(inner) => !eval(inner, lookup),
        Expr::IsNull(field, negated) => value_of(field).is_none() != *negated,
        Expr::Compare(field, op, literal) => match value_of(field) {
            Some(value) => compare(value, literal)
                .map(|ord| match op {
                    CompareOp::Eq => ord == Ordering::Equal,
                    CompareOp::Ne => ord != Ordering::Equal,
                    CompareOp::Lt => ord == Ordering::Less,
                    CompareOp::Le => ord != Ordering::Greater,
                    CompareOp::Gt => ord == Ordering::Greater,
                    CompareOp::Ge => ord != Ordering::Less,
                })
                .unwrap_or(false),
            None => false,
        },
        Expr::In(field, list, negated) => match value_of(field) {
            Some(value) => {
                let found = list
                    .iter()
                    .any(|lit| compare(value, lit) == Some(Ordering::Equal));
                found != *negated
            }
            None => false,
        },
        Expr::Like(field, pattern, negated) => match value_of(field) {
            Some(value) => like(&value.to_string(), pattern) != *negated,
            None => false,
        },
    }
}

fn compare(value: &FieldValue, literal: &Literal) -> Option<Ordering> {
    match literal {
        Literal::Num(n) => value.as_f64().and_then(|v| v.partial_cmp(n)),
        Literal::Str(s) => Some(value.to_string().as_str().cmp(s.as_str())),
    }
}

// `%` matches any run, `_` exactly one character
fn like(text: &str, pattern: &str) -> bool {
    let t: Vec<char> = text.chars().collect();
    let p: Vec<char> = pattern.chars().collect();
    let (mut ti, mut pi) = (0usize, 0usize);
    let mut backtrack: Option<(usize, usize)> = None;

    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || p[pi] == t[ti]) {
            ti += 1;
            pi += 1;
        } else if pi < p.len() && p[pi] == '%' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star, matched)) = backtrack {
            pi = star + 1;
            ti = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '%')
}
