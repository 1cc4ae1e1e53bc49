use serde::{Deserialize, Serialize};
use thiserror::Error as ThisError;

///
/// Validation-rule grammar
///
/// Rules are a closed expression language, compiled at schema-definition
/// time and interpreted at write time:
///
/// ```text
/// rule     := cond '?' string ':' string
/// cond     := '!' cond | helper '(' args ')' | operand cmp operand
/// cmp      := '==' | '!=' | '<' | '<=' | '>' | '>='
/// operand  := attributeName | string | number | 'null'
/// helper   := 'matches' | 'lenGt' | 'lenLt'
/// ```
///
/// The selected branch string is the outcome: empty means the value passed,
/// anything else is the failure message surfaced verbatim. Constructs
/// outside this grammar never reach a stored schema version.
///

///
/// CmpOp
///

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CmpOp {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
}

///
/// Operand
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Reference to the submitted value by the attribute's own name.
    Attribute(String),
    Text(String),
    Number(i64),
    Null,
}

///
/// Cond
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Cond {
    Compare {
        lhs: Operand,
        op: CmpOp,
        rhs: Operand,
    },
    /// Regex match against the submitted text value.
    Matches { attribute: String, pattern: String },
    /// Text length strictly greater than `min`.
    LenGt { attribute: String, min: i64 },
    /// Text length strictly less than `max`.
    LenLt { attribute: String, max: i64 },
    Not(Box<Cond>),
}

///
/// Rule
///

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    pub source: String,
    pub cond: Cond,
    pub on_true: String,
    pub on_false: String,
}

impl Rule {
    /// Compile rule source, rejecting anything outside the closed grammar.
    pub fn parse(source: &str) -> Result<Self, RuleError> {
        let tokens = lex(source)?;
        let mut parser = Parser { tokens, pos: 0 };

        let cond = parser.cond()?;
        parser.expect(Token::Question)?;
        let on_true = parser.string()?;
        parser.expect(Token::Colon)?;
        let on_false = parser.string()?;

        if parser.pos != parser.tokens.len() {
            return Err(RuleError::TrailingInput {
                found: parser.tokens[parser.pos].describe(),
            });
        }

        let rule = Self {
            source: source.to_string(),
            cond,
            on_true,
            on_false,
        };
        rule.check_patterns()?;

        Ok(rule)
    }

    // Regex patterns must compile before the rule can be stored.
    fn check_patterns(&self) -> Result<(), RuleError> {
        let mut stack = vec![&self.cond];
        while let Some(cond) = stack.pop() {
            match cond {
                Cond::Matches { pattern, .. } => {
                    regex::Regex::new(pattern).map_err(|err| RuleError::BadPattern {
                        pattern: pattern.clone(),
                        reason: err.to_string(),
                    })?;
                }
                Cond::Not(inner) => stack.push(inner),
                Cond::Compare { .. } | Cond::LenGt { .. } | Cond::LenLt { .. } => {}
            }
        }

        Ok(())
    }

    /// Attribute names the rule reads.
    #[must_use]
    pub fn referenced_attributes(&self) -> Vec<&str> {
        let mut out = Vec::new();
        let mut stack = vec![&self.cond];
        while let Some(cond) = stack.pop() {
            match cond {
                Cond::Compare { lhs, rhs, .. } => {
                    for operand in [lhs, rhs] {
                        if let Operand::Attribute(name) = operand {
                            out.push(name.as_str());
                        }
                    }
                }
                Cond::Matches { attribute, .. }
                | Cond::LenGt { attribute, .. }
                | Cond::LenLt { attribute, .. } => out.push(attribute.as_str()),
                Cond::Not(inner) => stack.push(inner),
            }
        }
        out
    }
}

///
/// RuleError
///

#[derive(Debug, Eq, PartialEq, ThisError)]
pub enum RuleError {
    #[error("unexpected character '{ch}' at byte {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unterminated string literal starting at byte {pos}")]
    UnterminatedString { pos: usize },

    #[error("number out of range at byte {pos}")]
    BadNumber { pos: usize },

    #[error("expected {expected}, found {found}")]
    UnexpectedToken { expected: String, found: String },

    #[error("unknown helper '{name}'; helpers are matches, lenGt, lenLt")]
    UnknownHelper { name: String },

    #[error("helper '{name}' takes ({expected})")]
    BadHelperArgs { name: String, expected: String },

    #[error("invalid pattern '{pattern}': {reason}")]
    BadPattern { pattern: String, reason: String },

    #[error("trailing input after rule: {found}")]
    TrailingInput { found: String },
}

///
/// Token
///

#[derive(Clone, Debug, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Num(i64),
    Null,
    Cmp(CmpOp),
    Bang,
    Question,
    Colon,
    Comma,
    LParen,
    RParen,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Ident(s) => format!("identifier '{s}'"),
            Self::Str(_) => "string literal".to_string(),
            Self::Num(n) => format!("number {n}"),
            Self::Null => "'null'".to_string(),
            Self::Cmp(_) => "comparison operator".to_string(),
            Self::Bang => "'!'".to_string(),
            Self::Question => "'?'".to_string(),
            Self::Colon => "':'".to_string(),
            Self::Comma => "','".to_string(),
            Self::LParen => "'('".to_string(),
            Self::RParen => "')'".to_string(),
        }
    }
}

fn lex(source: &str) -> Result<Vec<Token>, RuleError> {
    let mut tokens = Vec::new();
    let bytes = source.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let b = bytes[pos];
        match b {
            b' ' | b'\t' | b'\r' | b'\n' => pos += 1,
            b'?' => {
                tokens.push(Token::Question);
                pos += 1;
            }
            b':' => {
                tokens.push(Token::Colon);
                pos += 1;
            }
            b',' => {
                tokens.push(Token::Comma);
                pos += 1;
            }
            b'(' => {
                tokens.push(Token::LParen);
                pos += 1;
            }
            b')' => {
                tokens.push(Token::RParen);
                pos += 1;
            }
            b'=' if bytes.get(pos + 1) == Some(&b'=') => {
                tokens.push(Token::Cmp(CmpOp::Eq));
                pos += 2;
            }
            b'!' if bytes.get(pos + 1) == Some(&b'=') => {
                tokens.push(Token::Cmp(CmpOp::Ne));
                pos += 2;
            }
            b'!' => {
                tokens.push(Token::Bang);
                pos += 1;
            }
            b'<' if bytes.get(pos + 1) == Some(&b'=') => {
                tokens.push(Token::Cmp(CmpOp::Lte));
                pos += 2;
            }
            b'<' => {
                tokens.push(Token::Cmp(CmpOp::Lt));
                pos += 1;
            }
            b'>' if bytes.get(pos + 1) == Some(&b'=') => {
                tokens.push(Token::Cmp(CmpOp::Gte));
                pos += 2;
            }
            b'>' => {
                tokens.push(Token::Cmp(CmpOp::Gt));
                pos += 1;
            }
            b'"' => {
                let (text, next) = lex_string(source, pos)?;
                tokens.push(Token::Str(text));
                pos = next;
            }
            b'-' | b'0'..=b'9' => {
                let start = pos;
                pos += 1;
                while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                    pos += 1;
                }
                let num = source[start..pos]
                    .parse::<i64>()
                    .map_err(|_| RuleError::BadNumber { pos: start })?;
                tokens.push(Token::Num(num));
            }
            b'a'..=b'z' | b'A'..=b'Z' | b'_' => {
                let start = pos;
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_')
                {
                    pos += 1;
                }
                let ident = &source[start..pos];
                if ident == "null" {
                    tokens.push(Token::Null);
                } else {
                    tokens.push(Token::Ident(ident.to_string()));
                }
            }
            _ => {
                let ch = source[pos..].chars().next().unwrap_or('\u{fffd}');
                return Err(RuleError::UnexpectedChar { ch, pos });
            }
        }
    }

    Ok(tokens)
}

// String literals keep unknown escapes verbatim so regex patterns like
// `\.` survive without double escaping; only `\"` and `\\` are folded.
fn lex_string(source: &str, start: usize) -> Result<(String, usize), RuleError> {
    let bytes = source.as_bytes();
    let mut out = String::new();
    let mut pos = start + 1;

    while pos < bytes.len() {
        match bytes[pos] {
            b'"' => return Ok((out, pos + 1)),
            b'\\' => match bytes.get(pos + 1) {
                Some(b'"') => {
                    out.push('"');
                    pos += 2;
                }
                Some(b'\\') => {
                    out.push('\\');
                    pos += 2;
                }
                Some(_) => {
                    out.push('\\');
                    pos += 1;
                }
                None => return Err(RuleError::UnterminatedString { pos: start }),
            },
            _ => {
                let ch = source[pos..].chars().next().unwrap_or('\u{fffd}');
                out.push(ch);
                pos += ch.len_utf8();
            }
        }
    }

    Err(RuleError::UnterminatedString { pos: start })
}

///
/// Parser
///

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<Token, RuleError> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token.ok_or_else(|| RuleError::UnexpectedToken {
            expected: "more input".to_string(),
            found: "end of rule".to_string(),
        })
    }

    fn expect(&mut self, expected: Token) -> Result<(), RuleError> {
        let found = self.next()?;
        if found == expected {
            Ok(())
        } else {
            Err(RuleError::UnexpectedToken {
                expected: expected.describe(),
                found: found.describe(),
            })
        }
    }

    fn string(&mut self) -> Result<String, RuleError> {
        match self.next()? {
            Token::Str(s) => Ok(s),
            other => Err(RuleError::UnexpectedToken {
                expected: "string literal".to_string(),
                found: other.describe(),
            }),
        }
    }

    fn cond(&mut self) -> Result<Cond, RuleError> {
        if self.peek() == Some(&Token::Bang) {
            self.pos += 1;
            return Ok(Cond::Not(Box::new(self.cond()?)));
        }

        // Ident followed by '(' is a helper call; everything else is a
        // comparison.
        if let (Some(Token::Ident(name)), Some(Token::LParen)) =
            (self.peek(), self.tokens.get(self.pos + 1))
        {
            let name = name.clone();
            self.pos += 2;
            return self.helper(&name);
        }

        let lhs = self.operand()?;
        let op = match self.next()? {
            Token::Cmp(op) => op,
            other => {
                return Err(RuleError::UnexpectedToken {
                    expected: "comparison operator".to_string(),
                    found: other.describe(),
                });
            }
        };
        let rhs = self.operand()?;

        Ok(Cond::Compare { lhs, op, rhs })
    }

    fn operand(&mut self) -> Result<Operand, RuleError> {
        match self.next()? {
            Token::Ident(name) => Ok(Operand::Attribute(name)),
            Token::Str(s) => Ok(Operand::Text(s)),
            Token::Num(n) => Ok(Operand::Number(n)),
            Token::Null => Ok(Operand::Null),
            other => Err(RuleError::UnexpectedToken {
                expected: "attribute, literal, or null".to_string(),
                found: other.describe(),
            }),
        }
    }

    fn helper(&mut self, name: &str) -> Result<Cond, RuleError> {
        let cond = match name {
            "matches" => {
                let attribute = self.attribute_arg(name, "attribute, pattern")?;
                self.expect(Token::Comma)?;
                let pattern = self.string().map_err(|_| RuleError::BadHelperArgs {
                    name: name.to_string(),
                    expected: "attribute, pattern".to_string(),
                })?;
                Cond::Matches { attribute, pattern }
            }
            "lenGt" => {
                let attribute = self.attribute_arg(name, "attribute, length")?;
                self.expect(Token::Comma)?;
                let min = self.number_arg(name, "attribute, length")?;
                Cond::LenGt { attribute, min }
            }
            "lenLt" => {
                let attribute = self.attribute_arg(name, "attribute, length")?;
                self.expect(Token::Comma)?;
                let max = self.number_arg(name, "attribute, length")?;
                Cond::LenLt { attribute, max }
            }
            _ => {
                return Err(RuleError::UnknownHelper {
                    name: name.to_string(),
                });
            }
        };
        self.expect(Token::RParen)?;

        Ok(cond)
    }

    fn attribute_arg(&mut self, name: &str, expected: &str) -> Result<String, RuleError> {
        match self.next()? {
            Token::Ident(attr) => Ok(attr),
            _ => Err(RuleError::BadHelperArgs {
                name: name.to_string(),
                expected: expected.to_string(),
            }),
        }
    }

    fn number_arg(&mut self, name: &str, expected: &str) -> Result<i64, RuleError> {
        match self.next()? {
            Token::Num(n) => Ok(n),
            _ => Err(RuleError::BadHelperArgs {
                name: name.to_string(),
                expected: expected.to_string(),
            }),
        }
    }
}

///
/// TESTS
///
