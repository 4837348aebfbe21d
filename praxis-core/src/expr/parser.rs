//! Hand-rolled lexer and recursive-descent parser for guard expressions
//!
//! Grammar (lowest precedence first):
//!
//! ```text
//! expr    := or
//! or      := and ('or' and)*
//! and     := not ('and' not)*
//! not     := 'not' not | cmp
//! cmp     := atom (('==' | '!=' | '<' | '<=' | '>' | '>=') atom)?
//! atom    := ref | number | string | 'true' | 'false' | 'null' | '(' expr ')'
//! ref     := '$' ident ('.' ident)*
//! ```

use serde_json::{Number, Value};

use super::error::ExprError;
use super::path::RefPath;

/// Comparison operators of the sub-language
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    /// The operator as written in source
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Ne => "!=",
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }

    /// Whether this operator requires an ordering between its operands
    pub fn is_ordered(&self) -> bool {
        !matches!(self, CmpOp::Eq | CmpOp::Ne)
    }
}

/// Parsed guard/escalation expression
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// A literal number, string, boolean, or null
    Literal(Value),
    /// A `$step.path` reference into the context
    Ref(RefPath),
    /// Truthiness negation
    Not(Box<Expr>),
    /// Short-circuit conjunction
    And(Box<Expr>, Box<Expr>),
    /// Short-circuit disjunction
    Or(Box<Expr>, Box<Expr>),
    /// Binary comparison
    Cmp {
        op: CmpOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Expr {
    /// Parse an expression, reporting failures with the offending text
    pub fn parse(source: &str) -> Result<Expr, ExprError> {
        let tokens = lex(source).map_err(|message| ExprError::parse(source, message))?;
        let mut parser = Parser { tokens, pos: 0 };
        let expr = parser
            .parse_or()
            .map_err(|message| ExprError::parse(source, message))?;
        if let Some(token) = parser.peek() {
            return Err(ExprError::parse(
                source,
                format!("unexpected trailing {}", token.describe()),
            ));
        }
        Ok(expr)
    }

    /// Every reference appearing anywhere in the expression
    pub fn references(&self) -> Vec<&RefPath> {
        let mut out = Vec::new();
        self.collect_refs(&mut out);
        out
    }

    fn collect_refs<'a>(&'a self, out: &mut Vec<&'a RefPath>) {
        match self {
            Expr::Literal(_) => {}
            Expr::Ref(path) => out.push(path),
            Expr::Not(inner) => inner.collect_refs(out),
            Expr::And(lhs, rhs) | Expr::Or(lhs, rhs) => {
                lhs.collect_refs(out);
                rhs.collect_refs(out);
            }
            Expr::Cmp { lhs, rhs, .. } => {
                lhs.collect_refs(out);
                rhs.collect_refs(out);
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ref(RefPath),
    Number(Number),
    Str(String),
    True,
    False,
    Null,
    And,
    Or,
    Not,
    Cmp(CmpOp),
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Token::Ref(path) => format!("reference '{}'", path),
            Token::Number(n) => format!("number {}", n),
            Token::Str(s) => format!("string '{}'", s),
            Token::True => "'true'".to_string(),
            Token::False => "'false'".to_string(),
            Token::Null => "'null'".to_string(),
            Token::And => "'and'".to_string(),
            Token::Or => "'or'".to_string(),
            Token::Not => "'not'".to_string(),
            Token::Cmp(op) => format!("operator '{}'", op.symbol()),
            Token::LParen => "'('".to_string(),
            Token::RParen => "')'".to_string(),
        }
    }
}

fn lex(source: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            ' ' | '\t' | '\r' | '\n' => i += 1,
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            '=' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Cmp(CmpOp::Eq));
                    i += 2;
                } else {
                    return Err("single '=' is not an operator (use '==')".to_string());
                }
            }
            '!' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Cmp(CmpOp::Ne));
                    i += 2;
                } else {
                    return Err("single '!' is not an operator (use 'not')".to_string());
                }
            }
            '<' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Cmp(CmpOp::Le));
                    i += 2;
                } else {
                    tokens.push(Token::Cmp(CmpOp::Lt));
                    i += 1;
                }
            }
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    tokens.push(Token::Cmp(CmpOp::Ge));
                    i += 2;
                } else {
                    tokens.push(Token::Cmp(CmpOp::Gt));
                    i += 1;
                }
            }
            '\'' | '"' => {
                let quote = c;
                let start = i + 1;
                let mut end = start;
                while end < chars.len() && chars[end] != quote {
                    end += 1;
                }
                if end >= chars.len() {
                    return Err("unterminated string literal".to_string());
                }
                tokens.push(Token::Str(chars[start..end].iter().collect()));
                i = end + 1;
            }
            '$' => {
                let (path, next) = lex_reference(&chars, i)?;
                tokens.push(Token::Ref(path));
                i = next;
            }
            '-' => {
                if chars.get(i + 1).map(|c| c.is_ascii_digit()).unwrap_or(false) {
                    let (number, next) = lex_number(&chars, i)?;
                    tokens.push(Token::Number(number));
                    i = next;
                } else {
                    return Err("unexpected character '-'".to_string());
                }
            }
            c if c.is_ascii_digit() => {
                let (number, next) = lex_number(&chars, i)?;
                tokens.push(Token::Number(number));
                i = next;
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let word: String = chars[start..i].iter().collect();
                match word.as_str() {
                    "and" => tokens.push(Token::And),
                    "or" => tokens.push(Token::Or),
                    "not" => tokens.push(Token::Not),
                    "true" => tokens.push(Token::True),
                    "false" => tokens.push(Token::False),
                    "null" => tokens.push(Token::Null),
                    other => {
                        return Err(format!(
                            "unexpected identifier '{}' (references start with '$')",
                            other
                        ))
                    }
                }
            }
            other => return Err(format!("unexpected character '{}'", other)),
        }
    }

    Ok(tokens)
}

fn lex_reference(chars: &[char], start: usize) -> Result<(RefPath, usize), String> {
    // start points at '$'
    let mut i = start + 1;
    let mut segments = Vec::new();

    loop {
        let seg_start = i;
        if i >= chars.len() || !(chars[i].is_ascii_alphabetic() || chars[i] == '_') {
            return Err("'$' must be followed by a step identifier".to_string());
        }
        while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
            i += 1;
        }
        segments.push(chars[seg_start..i].iter().collect::<String>());

        // a '.' continues the path only when an identifier follows
        let continues = chars.get(i) == Some(&'.')
            && chars
                .get(i + 1)
                .map(|c| c.is_ascii_alphabetic() || *c == '_')
                .unwrap_or(false);
        if continues {
            i += 1;
        } else {
            break;
        }
    }

    let root = segments.remove(0);
    Ok((RefPath::new(root, segments), i))
}

fn lex_number(chars: &[char], start: usize) -> Result<(Number, usize), String> {
    let mut i = start;
    if chars[i] == '-' {
        i += 1;
    }
    while i < chars.len() && chars[i].is_ascii_digit() {
        i += 1;
    }
    let mut is_float = false;
    if chars.get(i) == Some(&'.')
        && chars
            .get(i + 1)
            .map(|c| c.is_ascii_digit())
            .unwrap_or(false)
    {
        is_float = true;
        i += 1;
        while i < chars.len() && chars[i].is_ascii_digit() {
            i += 1;
        }
    }

    let text: String = chars[start..i].iter().collect();
    let number = if is_float {
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .ok_or_else(|| format!("invalid number '{}'", text))?
    } else {
        Number::from(
            text.parse::<i64>()
                .map_err(|_| format!("invalid number '{}'", text))?,
        )
    };
    Ok((number, i))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
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

    fn parse_or(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_and()?;
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            let rhs = self.parse_and()?;
            expr = Expr::Or(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_and(&mut self) -> Result<Expr, String> {
        let mut expr = self.parse_not()?;
        while matches!(self.peek(), Some(Token::And)) {
            self.advance();
            let rhs = self.parse_not()?;
            expr = Expr::And(Box::new(expr), Box::new(rhs));
        }
        Ok(expr)
    }

    fn parse_not(&mut self) -> Result<Expr, String> {
        if matches!(self.peek(), Some(Token::Not)) {
            self.advance();
            let inner = self.parse_not()?;
            return Ok(Expr::Not(Box::new(inner)));
        }
        self.parse_cmp()
    }

    fn parse_cmp(&mut self) -> Result<Expr, String> {
        let lhs = self.parse_atom()?;
        if let Some(Token::Cmp(op)) = self.peek() {
            let op = *op;
            self.advance();
            let rhs = self.parse_atom()?;
            return Ok(Expr::Cmp {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn parse_atom(&mut self) -> Result<Expr, String> {
        match self.advance() {
            Some(Token::Ref(path)) => Ok(Expr::Ref(path)),
            Some(Token::Number(n)) => Ok(Expr::Literal(Value::Number(n))),
            Some(Token::Str(s)) => Ok(Expr::Literal(Value::String(s))),
            Some(Token::True) => Ok(Expr::Literal(Value::Bool(true))),
            Some(Token::False) => Ok(Expr::Literal(Value::Bool(false))),
            Some(Token::Null) => Ok(Expr::Literal(Value::Null)),
            Some(Token::LParen) => {
                let expr = self.parse_or()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(expr),
                    _ => Err("expected ')'".to_string()),
                }
            }
            Some(token) => Err(format!("unexpected {}", token.describe())),
            None => Err("unexpected end of expression".to_string()),
        }
    }
}
