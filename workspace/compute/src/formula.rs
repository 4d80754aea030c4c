//! Spreadsheet-style formula evaluation.
//!
//! Financial fields may be entered as small spreadsheet formulas such as
//! `=D3/3`, `=G3+10%` or `=SUM(food:admin_utilities)`. Formulas come from user
//! input, so they are never handed to a general-purpose evaluator: this module
//! parses them with a small recursive-descent grammar that only knows
//!
//! ```text
//! expr    := term (('+' | '-') term)*
//! term    := unary (('*' | '/') unary)*
//! unary   := ('+' | '-') unary | postfix
//! postfix := primary '%'*
//! primary := number | reference | 'SUM' '(' [expr ((':' | ',') expr)*] ')' | '(' expr ')'
//! ```
//!
//! References are either cell references from a fixed table (`D3`, `$E$3`) or
//! lower-case field names. Both read the current value of a named field, zero
//! when absent. `SUM(a:b)` does not expand ranges: it sums the listed parts.

use model::entities::FinancialData;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;
use tracing::trace;

/// Cell references understood by formulas and the field each one reads.
pub const CELL_REFERENCES: [(&str, &str); 7] = [
    ("D3", "termly_school_fees"),
    ("E3", "direct_spending_school_fees_ugx_monthly"),
    ("G3", "food"),
    ("H3", "average_medical"),
    ("I3", "school_personal_requirements_transport"),
    ("J3", "admin_utilities"),
    ("L3", "cash_received_euro"),
];

/// Nesting limit for parentheses and unary signs.
const MAX_DEPTH: usize = 64;

/// Why a formula could not be evaluated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FormulaError {
    #[error("Formula must start with '='")]
    NotAFormula,

    #[error("Unexpected character '{ch}' at position {position}")]
    UnexpectedChar { ch: char, position: usize },

    #[error("Invalid number literal '{0}'")]
    InvalidNumber(String),

    #[error("Unexpected token {0}")]
    UnexpectedToken(String),

    #[error("Unexpected end of formula")]
    UnexpectedEnd,

    #[error("Unknown cell reference '{0}'")]
    UnknownReference(String),

    #[error("Unknown function '{0}'")]
    UnknownFunction(String),

    #[error("Division by zero")]
    DivisionByZero,

    #[error("Formula result is not a finite number")]
    NonFinite,

    #[error("Formula is nested too deeply")]
    TooDeep,
}

/// Anything formulas can read named numeric fields from.
pub trait FieldSource {
    /// Current value of `name`, or `None` when the field is absent.
    fn field(&self, name: &str) -> Option<f64>;
}

impl FieldSource for HashMap<String, f64> {
    fn field(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl FieldSource for BTreeMap<String, f64> {
    fn field(&self, name: &str) -> Option<f64> {
        self.get(name).copied()
    }
}

impl FieldSource for FinancialData {
    fn field(&self, name: &str) -> Option<f64> {
        self.input(name)
    }
}

/// Whether `raw` is a formula (starts with `=`, ignoring leading whitespace).
pub fn is_formula(raw: &str) -> bool {
    raw.trim_start().starts_with('=')
}

/// Evaluates `formula`, degrading every failure to `0.0`.
pub fn evaluate(formula: &str, fields: &dyn FieldSource) -> f64 {
    match try_evaluate(formula, fields) {
        Ok(value) => value,
        Err(error) => {
            trace!(formula, %error, "Formula evaluation failed, using 0");
            0.0
        }
    }
}

/// Evaluates `formula`, reporting why it failed.
pub fn try_evaluate(formula: &str, fields: &dyn FieldSource) -> Result<f64, FormulaError> {
    let body = formula
        .trim_start()
        .strip_prefix('=')
        .ok_or(FormulaError::NotAFormula)?;

    let tokens = tokenize(body)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        fields,
    };

    let value = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(FormulaError::UnexpectedToken(token.describe()));
    }

    if value.is_finite() {
        Ok(value)
    } else {
        Err(FormulaError::NonFinite)
    }
}

/// Resolves a cell reference such as `D3` or `$E$3` to its field name.
pub fn cell_reference_field(reference: &str) -> Option<&'static str> {
    let normalized: String = reference
        .chars()
        .filter(|c| *c != '$')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    CELL_REFERENCES
        .iter()
        .find(|(cell, _)| *cell == normalized)
        .map(|(_, field)| *field)
}

/// `letters` followed by `digits`, with optional `$` anchors.
fn looks_like_cell_reference(ident: &str) -> bool {
    let stripped: String = ident.chars().filter(|c| *c != '$').collect();
    let letters = stripped.chars().take_while(|c| c.is_ascii_alphabetic()).count();
    letters > 0
        && letters < stripped.len()
        && stripped[letters..].chars().all(|c| c.is_ascii_digit())
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    LParen,
    RParen,
    Colon,
    Comma,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Number(n) => format!("number {}", n),
            Token::Ident(name) => format!("'{}'", name),
            Token::Plus => "'+'".to_string(),
            Token::Minus => "'-'".to_string(),
            Token::Star => "'*'".to_string(),
            Token::Slash => "'/'".to_string(),
            Token::Percent => "'%'".to_string(),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
            Token::Colon => "':'".to_string(),
            Token::Comma => "','".to_string(),
        }
    }
}

fn tokenize(body: &str) -> Result<Vec<Token>, FormulaError> {
    let chars: Vec<char> = body.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '0'..='9' | '.' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_digit() || chars[i] == '.') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let value = text
                    .parse::<f64>()
                    .map_err(|_| FormulaError::InvalidNumber(text.clone()))?;
                tokens.push(Token::Number(value));
            }
            c if c.is_ascii_alphabetic() || c == '_' || c == '$' => {
                let start = i;
                while i < chars.len()
                    && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '$')
                {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            _ => {
                let token = match c {
                    '+' => Token::Plus,
                    '-' => Token::Minus,
                    '*' => Token::Star,
                    '/' => Token::Slash,
                    '%' => Token::Percent,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    ':' => Token::Colon,
                    ',' => Token::Comma,
                    other => {
                        return Err(FormulaError::UnexpectedChar {
                            ch: other,
                            position: i,
                        });
                    }
                };
                tokens.push(token);
                i += 1;
            }
        }
    }

    Ok(tokens)
}

struct Parser<'a> {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    fields: &'a dyn FieldSource,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: Token) -> Result<(), FormulaError> {
        match self.advance() {
            Some(token) if token == expected => Ok(()),
            Some(token) => Err(FormulaError::UnexpectedToken(token.describe())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    fn parse_expr(&mut self) -> Result<f64, FormulaError> {
        let mut value = self.parse_term()?;
        loop {
            match self.peek() {
                Some(Token::Plus) => {
                    self.pos += 1;
                    value += self.parse_term()?;
                }
                Some(Token::Minus) => {
                    self.pos += 1;
                    value -= self.parse_term()?;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_term(&mut self) -> Result<f64, FormulaError> {
        let mut value = self.parse_unary()?;
        loop {
            match self.peek() {
                Some(Token::Star) => {
                    self.pos += 1;
                    value *= self.parse_unary()?;
                }
                Some(Token::Slash) => {
                    self.pos += 1;
                    let divisor = self.parse_unary()?;
                    if divisor == 0.0 {
                        return Err(FormulaError::DivisionByZero);
                    }
                    value /= divisor;
                }
                _ => return Ok(value),
            }
        }
    }

    fn parse_unary(&mut self) -> Result<f64, FormulaError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(FormulaError::TooDeep);
        }

        let value = match self.peek() {
            Some(Token::Plus) => {
                self.pos += 1;
                self.parse_unary()?
            }
            Some(Token::Minus) => {
                self.pos += 1;
                -self.parse_unary()?
            }
            _ => self.parse_postfix()?,
        };

        self.depth -= 1;
        Ok(value)
    }

    fn parse_postfix(&mut self) -> Result<f64, FormulaError> {
        let mut value = self.parse_primary()?;
        while let Some(Token::Percent) = self.peek() {
            self.pos += 1;
            value /= 100.0;
        }
        Ok(value)
    }

    fn parse_primary(&mut self) -> Result<f64, FormulaError> {
        match self.advance() {
            Some(Token::Number(value)) => Ok(value),
            Some(Token::LParen) => {
                let value = self.parse_expr()?;
                self.expect(Token::RParen)?;
                Ok(value)
            }
            Some(Token::Ident(name)) => {
                if let Some(Token::LParen) = self.peek() {
                    self.pos += 1;
                    self.parse_call(&name)
                } else {
                    self.resolve(&name)
                }
            }
            Some(token) => Err(FormulaError::UnexpectedToken(token.describe())),
            None => Err(FormulaError::UnexpectedEnd),
        }
    }

    /// Parses the arguments of a call whose opening parenthesis was consumed.
    fn parse_call(&mut self, name: &str) -> Result<f64, FormulaError> {
        if !name.eq_ignore_ascii_case("SUM") {
            return Err(FormulaError::UnknownFunction(name.to_string()));
        }

        let mut total = 0.0;
        if let Some(Token::RParen) = self.peek() {
            self.pos += 1;
            return Ok(total);
        }

        loop {
            total += self.parse_expr()?;
            match self.advance() {
                Some(Token::Colon) | Some(Token::Comma) => continue,
                Some(Token::RParen) => return Ok(total),
                Some(token) => return Err(FormulaError::UnexpectedToken(token.describe())),
                None => return Err(FormulaError::UnexpectedEnd),
            }
        }
    }

    fn resolve(&self, name: &str) -> Result<f64, FormulaError> {
        if looks_like_cell_reference(name) {
            let field = cell_reference_field(name)
                .ok_or_else(|| FormulaError::UnknownReference(name.to_string()))?;
            return Ok(self.fields.field(field).unwrap_or(0.0));
        }

        // Field names are lower-case identifiers; anything else is not a reference.
        if name.contains('$') || name.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(FormulaError::UnknownReference(name.to_string()));
        }
        Ok(self.fields.field(name).unwrap_or(0.0))
    }
}
