// crates/rule-logic/src/dsl.rs
// ============================================================================
// Module: Predicate Expression DSL
// Description: Author-facing expression syntax for requirement trees.
// Purpose: Turn human-readable predicate text into `Requirement<P>` with
//          validation and atom resolution.
// Dependencies: crate::{literal, requirement, validator}
// ============================================================================

//! ## Overview
//!
//! The DSL is the textual form of rule predicates and gate conditions. It
//! supports boolean composition (`&&`, `||`, `!` and their keyword forms),
//! function forms (`all(...)`, `any(...)`, `not(...)`), parenthesized grouping,
//! and comparison atoms of the form `path <comparator> literal`. A bare path is
//! a boolean field reference. Atoms are turned into leaf predicates by a
//! caller-supplied [`AtomResolver`].
//!
//! ### Grammar (informal)
//! - **Atoms**: `verified`, `role == "admin"`, `check_access >= 50`, `quote.total < 10.5`
//! - **Comparators**: `==`, `!=`, `<`, `<=`, `>`, `>=`
//! - **Literals**: integers, decimals, `'single'` or `"double"` quoted strings, `true`, `false`
//! - **Boolean operators**: `a && b`, `a || b`, `!a`, `a and b`, `a or b`, `not a`
//! - **Functions**: `all(a, b, c)`, `any(a, b)`, `not(a)`
//!
//! ### Example
//!
//! ```
//! use rule_logic::AtomResolver;
//! use rule_logic::Comparator;
//! use rule_logic::Literal;
//! use rule_logic::Requirement;
//! use rule_logic::parse_requirement;
//!
//! struct Echo;
//!
//! impl AtomResolver<String> for Echo {
//!     fn resolve_field(&self, path: &str) -> Option<String> {
//!         Some(path.to_string())
//!     }
//!
//!     fn resolve_comparison(
//!         &self,
//!         path: &str,
//!         comparator: Comparator,
//!         literal: Literal,
//!     ) -> Option<String> {
//!         Some(format!("{path} {comparator} {literal}"))
//!     }
//! }
//!
//! let req: Requirement<String> =
//!     parse_requirement("role == 'member' && verified", &Echo).unwrap();
//! assert_eq!(req.to_string(), "role == \"member\" && verified");
//! ```

use std::fmt;

use crate::literal::Comparator;
use crate::literal::Literal;
use crate::requirement::Requirement;
use crate::validator::RequirementValidator;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum allowed DSL input size in bytes.
const MAX_DSL_INPUT_BYTES: usize = 1024 * 1024;
/// Maximum supported nesting depth for DSL expressions.
const MAX_DSL_NESTING: usize = 32;

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Errors that can occur while parsing or validating a DSL expression.
///
/// # Invariants
/// - None. Variants capture structured parse and validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DslError {
    /// Input was empty or contained only whitespace.
    EmptyInput,
    /// Input exceeded the configured size limit.
    InputTooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Actual input length in bytes.
        actual_bytes: usize,
    },
    /// Input exceeded the configured nesting depth.
    NestingTooDeep {
        /// Maximum allowed nesting depth.
        max_depth: usize,
        /// Actual nesting depth when the error occurred.
        actual_depth: usize,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Unexpected token encountered during parsing.
    UnexpectedToken {
        /// Human-friendly expectation summary.
        expected: &'static str,
        /// The token that was actually seen.
        found: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// String literal was not closed before end of input.
    UnterminatedString {
        /// Byte offset of the opening quote.
        position: usize,
    },
    /// Atom could not be resolved into a leaf predicate.
    UnknownCondition {
        /// The unresolved atom text.
        name: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// DSL function name was not recognized.
    UnknownFunction {
        /// The unknown function identifier.
        name: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Numeric literal failed to parse or overflowed.
    InvalidNumber {
        /// The raw numeric text.
        raw: String,
        /// Byte offset in the original input.
        position: usize,
    },
    /// Structural validation failed after parsing.
    Validation(String),
    /// Unexpected trailing input after a complete expression.
    TrailingInput {
        /// Byte offset where unexpected input begins.
        position: usize,
    },
}

impl fmt::Display for DslError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyInput => write!(f, "input is empty"),
            Self::InputTooLarge {
                max_bytes,
                actual_bytes,
            } => {
                write!(f, "input exceeds size limit: {actual_bytes} bytes (max {max_bytes})")
            }
            Self::NestingTooDeep {
                max_depth,
                actual_depth,
                position,
            } => write!(
                f,
                "input nesting exceeds limit: depth {actual_depth} (max {max_depth}) at {position}"
            ),
            Self::UnexpectedToken {
                expected,
                found,
                position,
            } => {
                write!(f, "unexpected token `{found}` at {position}, expected {expected}")
            }
            Self::UnterminatedString {
                position,
            } => write!(f, "unterminated string literal starting at {position}"),
            Self::UnknownCondition {
                name,
                position,
            } => {
                write!(f, "unknown condition `{name}` at {position}")
            }
            Self::UnknownFunction {
                name,
                position,
            } => {
                write!(f, "unknown function `{name}` at {position}")
            }
            Self::InvalidNumber {
                raw,
                position,
            } => {
                write!(f, "invalid number `{raw}` at {position}")
            }
            Self::Validation(msg) => write!(f, "{msg}"),
            Self::TrailingInput {
                position,
            } => {
                write!(f, "unexpected trailing input at {position}")
            }
        }
    }
}

impl std::error::Error for DslError {}

/// Resolves DSL atoms into the domain-specific leaf type `P`.
pub trait AtomResolver<P> {
    /// Returns the leaf for a bare field reference, or `None` if unknown.
    fn resolve_field(&self, path: &str) -> Option<P>;

    /// Returns the leaf for a `path comparator literal` atom, or `None` if unknown.
    fn resolve_comparison(&self, path: &str, comparator: Comparator, literal: Literal)
    -> Option<P>;
}

/// Parses a DSL expression into a validated [`Requirement`] tree.
///
/// # Errors
/// Returns [`DslError`] for syntax issues, unknown atoms, invalid numbers,
/// trailing input, or post-parse validation failures.
pub fn parse_requirement<P, R>(input: &str, resolver: &R) -> Result<Requirement<P>, DslError>
where
    R: AtomResolver<P>,
{
    if input.len() > MAX_DSL_INPUT_BYTES {
        return Err(DslError::InputTooLarge {
            max_bytes: MAX_DSL_INPUT_BYTES,
            actual_bytes: input.len(),
        });
    }
    let mut lexer = Lexer::new(input);
    let tokens = lexer.lex()?;

    let mut parser = Parser::new(tokens, resolver);
    let requirement = parser.parse_expression()?;
    parser.expect_eof()?;

    RequirementValidator::with_defaults()
        .validate(&requirement)
        .map_err(|err| DslError::Validation(err.to_string()))?;

    Ok(requirement)
}

// ============================================================================
// SECTION: Lexer
// ============================================================================

/// Lexer token produced from the DSL input.
#[derive(Debug, Clone, PartialEq)]
enum Token<'a> {
    /// Identifier token.
    Ident(&'a str),
    /// Numeric literal token (may carry a leading `-` and a fraction).
    Number(&'a str),
    /// Unescaped string literal.
    Str(String),
    /// `true` keyword.
    True,
    /// `false` keyword.
    False,
    /// Comparison operator.
    Compare(Comparator),
    /// Path separator.
    Dot,
    /// Logical AND operator.
    And,
    /// Logical OR operator.
    Or,
    /// Logical NOT operator.
    Not,
    /// Left parenthesis.
    LParen,
    /// Right parenthesis.
    RParen,
    /// Comma separator.
    Comma,
    /// End-of-input marker.
    Eof,
}

/// Token paired with its byte offset.
#[derive(Debug, Clone)]
struct SpannedToken<'a> {
    /// Token value.
    token: Token<'a>,
    /// Byte offset into the input.
    position: usize,
}

/// Lexer for the predicate DSL.
struct Lexer<'a> {
    /// Source input being tokenized.
    input: &'a str,
    /// Current byte offset into the input.
    offset: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer for the given input.
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            offset: 0,
        }
    }

    /// Lexes the input into a sequence of tokens.
    fn lex(&mut self) -> Result<Vec<SpannedToken<'a>>, DslError> {
        let mut tokens = Vec::new();
        let bytes = self.input.as_bytes();

        while self.offset < bytes.len() {
            let ch = bytes[self.offset];
            match ch {
                b' ' | b'\t' | b'\n' | b'\r' => {
                    self.offset += 1;
                }
                b'(' => self.push_simple(&mut tokens, Token::LParen, 1),
                b')' => self.push_simple(&mut tokens, Token::RParen, 1),
                b',' => self.push_simple(&mut tokens, Token::Comma, 1),
                b'.' => self.push_simple(&mut tokens, Token::Dot, 1),
                b'!' => {
                    if self.peek_char(bytes) == Some(b'=') {
                        self.push_simple(&mut tokens, Token::Compare(Comparator::NotEquals), 2);
                    } else {
                        self.push_simple(&mut tokens, Token::Not, 1);
                    }
                }
                b'=' => {
                    if self.peek_char(bytes) == Some(b'=') {
                        self.push_simple(&mut tokens, Token::Compare(Comparator::Equals), 2);
                    } else {
                        return Err(DslError::UnexpectedToken {
                            expected: "==",
                            found: "=".to_string(),
                            position: self.offset,
                        });
                    }
                }
                b'<' => {
                    if self.peek_char(bytes) == Some(b'=') {
                        self.push_simple(
                            &mut tokens,
                            Token::Compare(Comparator::LessThanOrEqual),
                            2,
                        );
                    } else {
                        self.push_simple(&mut tokens, Token::Compare(Comparator::LessThan), 1);
                    }
                }
                b'>' => {
                    if self.peek_char(bytes) == Some(b'=') {
                        self.push_simple(
                            &mut tokens,
                            Token::Compare(Comparator::GreaterThanOrEqual),
                            2,
                        );
                    } else {
                        self.push_simple(&mut tokens, Token::Compare(Comparator::GreaterThan), 1);
                    }
                }
                b'&' => {
                    if self.peek_char(bytes) == Some(b'&') {
                        self.push_simple(&mut tokens, Token::And, 2);
                    } else {
                        return Err(DslError::UnexpectedToken {
                            expected: "&&",
                            found: "&".to_string(),
                            position: self.offset,
                        });
                    }
                }
                b'|' => {
                    if self.peek_char(bytes) == Some(b'|') {
                        self.push_simple(&mut tokens, Token::Or, 2);
                    } else {
                        return Err(DslError::UnexpectedToken {
                            expected: "||",
                            found: "|".to_string(),
                            position: self.offset,
                        });
                    }
                }
                b'\'' | b'"' => {
                    let start = self.offset;
                    let value = self.lex_string(bytes, ch)?;
                    tokens.push(SpannedToken {
                        token: Token::Str(value),
                        position: start,
                    });
                }
                b'-' | b'0' ..= b'9' => {
                    let start = self.offset;
                    if ch == b'-' {
                        self.offset += 1;
                    }
                    self.consume_while(bytes, |b| b.is_ascii_digit());
                    if bytes.get(self.offset) == Some(&b'.')
                        && bytes.get(self.offset + 1).is_some_and(u8::is_ascii_digit)
                    {
                        self.offset += 1;
                        self.consume_while(bytes, |b| b.is_ascii_digit());
                    }
                    tokens.push(SpannedToken {
                        token: Token::Number(&self.input[start .. self.offset]),
                        position: start,
                    });
                }
                b'a' ..= b'z' | b'A' ..= b'Z' | b'_' => {
                    let start = self.offset;
                    self.consume_while(bytes, |b| b.is_ascii_alphanumeric() || b == b'_');
                    let slice = &self.input[start .. self.offset];
                    tokens.push(SpannedToken {
                        token: Self::keyword_or_ident(slice),
                        position: start,
                    });
                }
                _ => {
                    let found = self.input[self.offset ..].chars().next().unwrap_or('?');
                    return Err(DslError::UnexpectedToken {
                        expected: "identifier, literal, or operator",
                        found: found.to_string(),
                        position: self.offset,
                    });
                }
            }
        }

        if tokens.is_empty() {
            return Err(DslError::EmptyInput);
        }

        tokens.push(SpannedToken {
            token: Token::Eof,
            position: self.offset,
        });
        Ok(tokens)
    }

    /// Pushes a fixed-width token at the current offset and advances past it.
    fn push_simple(&mut self, tokens: &mut Vec<SpannedToken<'a>>, token: Token<'a>, width: usize) {
        tokens.push(SpannedToken {
            token,
            position: self.offset,
        });
        self.offset += width;
    }

    /// Lexes a quoted string literal starting at the current offset.
    fn lex_string(&mut self, bytes: &[u8], quote: u8) -> Result<String, DslError> {
        let start = self.offset;
        self.offset += 1;
        let mut out = String::new();
        let mut segment_start = self.offset;

        while let Some(&b) = bytes.get(self.offset) {
            if b == quote {
                out.push_str(&self.input[segment_start .. self.offset]);
                self.offset += 1;
                return Ok(out);
            }
            if b == b'\\' {
                out.push_str(&self.input[segment_start .. self.offset]);
                let escaped = match bytes.get(self.offset + 1) {
                    Some(b'\\') => '\\',
                    Some(b'\'') => '\'',
                    Some(b'"') => '"',
                    Some(b'n') => '\n',
                    Some(b't') => '\t',
                    Some(other) => {
                        return Err(DslError::UnexpectedToken {
                            expected: "escape sequence",
                            found: format!("\\{}", char::from(*other)),
                            position: self.offset,
                        });
                    }
                    None => break,
                };
                out.push(escaped);
                self.offset += 2;
                segment_start = self.offset;
                continue;
            }
            self.offset += 1;
        }

        Err(DslError::UnterminatedString {
            position: start,
        })
    }

    /// Returns the next byte without advancing.
    fn peek_char(&self, bytes: &[u8]) -> Option<u8> {
        bytes.get(self.offset + 1).copied()
    }

    /// Advances while the condition matches the current byte.
    fn consume_while<F>(&mut self, bytes: &[u8], condition: F)
    where
        F: Fn(u8) -> bool,
    {
        while let Some(&b) = bytes.get(self.offset) {
            if condition(b) {
                self.offset += 1;
            } else {
                break;
            }
        }
    }

    /// Maps a slice to a keyword token or identifier token.
    fn keyword_or_ident(slice: &'a str) -> Token<'a> {
        match slice {
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "true" => Token::True,
            "false" => Token::False,
            _ => Token::Ident(slice),
        }
    }
}

// ============================================================================
// SECTION: Parser
// ============================================================================

/// Recursive-descent parser for the predicate DSL.
struct Parser<'input, 'resolver, P, R> {
    /// Token stream with source positions.
    tokens: Vec<SpannedToken<'input>>,
    /// Current token index.
    index: usize,
    /// Atom resolver for leaves.
    resolver: &'resolver R,
    /// Current nesting depth for bracketed, negated, or function expressions.
    nesting: usize,
    /// Marker for the leaf type.
    _marker: std::marker::PhantomData<P>,
}

impl<'input, 'resolver, P, R> Parser<'input, 'resolver, P, R>
where
    R: AtomResolver<P>,
{
    /// Creates a parser over the token stream.
    const fn new(tokens: Vec<SpannedToken<'input>>, resolver: &'resolver R) -> Self {
        Self {
            tokens,
            index: 0,
            resolver,
            nesting: 0,
            _marker: std::marker::PhantomData,
        }
    }

    /// Parses a full expression.
    fn parse_expression(&mut self) -> Result<Requirement<P>, DslError> {
        self.parse_or()
    }

    /// Parses OR expressions.
    fn parse_or(&mut self) -> Result<Requirement<P>, DslError> {
        let mut parts = vec![self.parse_and()?];

        while self.matches(&Token::Or) {
            parts.push(self.parse_and()?);
        }

        if parts.len() == 1 { Ok(parts.remove(0)) } else { Ok(Requirement::or(parts)) }
    }

    /// Parses AND expressions.
    fn parse_and(&mut self) -> Result<Requirement<P>, DslError> {
        let mut parts = vec![self.parse_unary()?];

        while self.matches(&Token::And) {
            parts.push(self.parse_unary()?);
        }

        if parts.len() == 1 { Ok(parts.remove(0)) } else { Ok(Requirement::and(parts)) }
    }

    /// Parses unary expressions, including NOT.
    fn parse_unary(&mut self) -> Result<Requirement<P>, DslError> {
        let position = self.current().position;
        if self.matches(&Token::Not) {
            return self.with_nesting(position, |parser| {
                let requirement = parser.parse_unary()?;
                Ok(Requirement::negate(requirement))
            });
        }
        self.parse_primary()
    }

    /// Parses a primary expression.
    fn parse_primary(&mut self) -> Result<Requirement<P>, DslError> {
        let position = self.current().position;
        match &self.current().token {
            Token::Ident(name) => {
                let name = *name;
                self.advance();

                if self.matches(&Token::LParen) {
                    self.parse_function(name, position)
                } else {
                    self.parse_atom(name, position)
                }
            }
            Token::LParen => {
                self.advance();
                self.with_nesting(position, |parser| {
                    let expr = parser.parse_expression()?;
                    parser.expect(&Token::RParen, "`)`")?;
                    Ok(expr)
                })
            }
            Token::True => {
                self.advance();
                Ok(Requirement::always())
            }
            Token::False => {
                self.advance();
                Ok(Requirement::never())
            }
            Token::Number(raw) => Err(DslError::UnexpectedToken {
                expected: "field reference or `(`",
                found: (*raw).to_string(),
                position,
            }),
            Token::Str(_)
            | Token::Compare(_)
            | Token::Dot
            | Token::RParen
            | Token::Comma
            | Token::And
            | Token::Or
            | Token::Not
            | Token::Eof => Err(DslError::UnexpectedToken {
                expected: "condition or expression",
                found: self.describe_current(),
                position,
            }),
        }
    }

    /// Parses a function-style expression.
    fn parse_function(
        &mut self,
        name: &'input str,
        name_pos: usize,
    ) -> Result<Requirement<P>, DslError> {
        self.with_nesting(name_pos, |parser| match name {
            "all" => {
                let args = parser.parse_argument_list()?;
                Ok(Requirement::and(args))
            }
            "any" => {
                let args = parser.parse_argument_list()?;
                Ok(Requirement::or(args))
            }
            _ => Err(DslError::UnknownFunction {
                name: name.to_string(),
                position: name_pos,
            }),
        })
    }

    /// Parses a comma-separated argument list.
    fn parse_argument_list(&mut self) -> Result<Vec<Requirement<P>>, DslError> {
        let mut args = Vec::new();
        if self.matches(&Token::RParen) {
            return Ok(args);
        }

        loop {
            args.push(self.parse_expression()?);
            if self.matches(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RParen, "`)` after arguments")?;
            break;
        }
        Ok(args)
    }

    /// Parses an atom: a dotted path optionally followed by `comparator literal`.
    fn parse_atom(&mut self, head: &'input str, position: usize) -> Result<Requirement<P>, DslError> {
        let mut path = head.to_string();
        while self.matches(&Token::Dot) {
            match &self.current().token {
                Token::Ident(segment) => {
                    path.push('.');
                    path.push_str(segment);
                    self.advance();
                }
                _ => {
                    return Err(DslError::UnexpectedToken {
                        expected: "identifier after `.`",
                        found: self.describe_current(),
                        position: self.current().position,
                    });
                }
            }
        }

        let Token::Compare(comparator) = self.current().token else {
            return self.resolver.resolve_field(&path).map(Requirement::predicate).ok_or(
                DslError::UnknownCondition {
                    name: path,
                    position,
                },
            );
        };
        self.advance();

        let literal = self.parse_literal()?;
        let name = format!("{path} {comparator} {literal}");
        self.resolver
            .resolve_comparison(&path, comparator, literal)
            .map(Requirement::predicate)
            .ok_or(DslError::UnknownCondition {
                name,
                position,
            })
    }

    /// Parses a literal on the right-hand side of a comparison.
    fn parse_literal(&mut self) -> Result<Literal, DslError> {
        let position = self.current().position;
        let literal = match &self.current().token {
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Str(value) => Literal::Str(value.clone()),
            Token::Number(raw) => parse_number(raw, position)?,
            _ => {
                return Err(DslError::UnexpectedToken {
                    expected: "literal",
                    found: self.describe_current(),
                    position,
                });
            }
        };
        self.advance();
        Ok(literal)
    }

    /// Runs a parser step while enforcing the nesting limit.
    fn with_nesting<T>(
        &mut self,
        position: usize,
        f: impl FnOnce(&mut Self) -> Result<T, DslError>,
    ) -> Result<T, DslError> {
        let next_depth = self.nesting + 1;
        if next_depth > MAX_DSL_NESTING {
            return Err(DslError::NestingTooDeep {
                max_depth: MAX_DSL_NESTING,
                actual_depth: next_depth,
                position,
            });
        }
        self.nesting = next_depth;
        let result = f(self);
        self.nesting = self.nesting.saturating_sub(1);
        result
    }

    /// Consumes the expected token or returns an error.
    fn expect(&mut self, token: &Token<'_>, expected: &'static str) -> Result<(), DslError> {
        if self.matches(token) {
            Ok(())
        } else {
            Err(DslError::UnexpectedToken {
                expected,
                found: self.describe_current(),
                position: self.current().position,
            })
        }
    }

    /// Ensures the parser is at end-of-input.
    fn expect_eof(&self) -> Result<(), DslError> {
        if matches!(self.current().token, Token::Eof) {
            Ok(())
        } else {
            Err(DslError::TrailingInput {
                position: self.current().position,
            })
        }
    }

    /// Consumes the token if it matches the expected kind.
    fn matches(&mut self, kind: &Token<'_>) -> bool {
        if std::mem::discriminant(&self.current().token) == std::mem::discriminant(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Returns the current token.
    fn current(&self) -> &SpannedToken<'input> {
        let last = self.tokens.len().saturating_sub(1);
        &self.tokens[self.index.min(last)]
    }

    /// Advances to the next token.
    const fn advance(&mut self) {
        if self.index + 1 < self.tokens.len() {
            self.index += 1;
        }
    }

    /// Formats the current token for diagnostics.
    fn describe_current(&self) -> String {
        match &self.current().token {
            Token::Ident(name) => (*name).to_string(),
            Token::Number(raw) => (*raw).to_string(),
            Token::Str(value) => Literal::Str(value.clone()).to_string(),
            Token::True => "true".to_string(),
            Token::False => "false".to_string(),
            Token::Compare(comparator) => comparator.symbol().to_string(),
            Token::Dot => ".".to_string(),
            Token::And => "&&".to_string(),
            Token::Or => "||".to_string(),
            Token::Not => "!".to_string(),
            Token::LParen => "(".to_string(),
            Token::RParen => ")".to_string(),
            Token::Comma => ",".to_string(),
            Token::Eof => "end of input".to_string(),
        }
    }
}

/// Parses a numeric token into an integer or float literal.
fn parse_number(raw: &str, position: usize) -> Result<Literal, DslError> {
    let invalid = || DslError::InvalidNumber {
        raw: raw.to_string(),
        position,
    };
    if raw.contains('.') {
        raw.parse::<f64>().map(Literal::Float).map_err(|_| invalid())
    } else {
        raw.parse::<i64>().map(Literal::Int).map_err(|_| invalid())
    }
}
