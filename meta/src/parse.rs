//! Reader for the Starlark subset found in Bazel `.bzl` declaration files.
//!
//! Only call expressions are kept. Each one becomes a [`Record`] holding the
//! keyword arguments written directly inside its parentheses; everything that
//! isn't a string, a list or another call is reduced to [`Value::Other`].

use crate::error::Error;

/// Value of a keyword argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A string literal, or several of them joined with `+` or by adjacency.
    Str(String),
    /// A `[...]` list.
    List(Vec<Value>),
    /// A nested call expression.
    Call(Record),
    /// Identifiers, numbers, dicts and any other expression.
    Other,
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

/// A call expression such as `native.http_archive(name = "x", ...)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record {
    /// The called name, dotted access included.
    pub callee: String,
    /// Keyword arguments in source order. Positional arguments are dropped.
    pub fields: Vec<(String, Value)>,
    /// Line where the call starts.
    pub line: usize,
}

impl Record {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// The value of `key` if it is a string literal.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// The string items of `key` if it is a list.
    pub fn strings(&self, key: &str) -> Vec<&str> {
        match self.get(key) {
            Some(Value::List(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => Vec::new(),
        }
    }
}

/// Every call expression in `text`, in source order, nested ones included.
pub fn records(text: &str) -> Result<Vec<Record>, Error> {
    let mut parser = Parser {
        tokens: lex(text)?,
        pos: 0,
        found: Vec::new(),
    };
    parser.module()?;

    let mut found = parser.found;
    found.sort_by_key(|(start, _)| *start);
    Ok(found.into_iter().map(|(_, record)| record).collect())
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    Open(char),
    Close(char),
    Assign,
    Plus,
    Comma,
    Colon,
    Other,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// `r"..."`, `b"..."` and friends.
fn is_string_prefix(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "r" | "b" | "u" | "rb" | "br"
    )
}

fn lex(text: &str) -> Result<Vec<(Token, usize)>, Error> {
    let chars: Vec<char> = text.chars().collect();
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut i = 0;

    while let Some(&c) = chars.get(i) {
        let start = line;
        let token = match c {
            '\n' => {
                line += 1;
                i += 1;
                continue;
            }
            '#' => {
                while chars.get(i).is_some_and(|&c| c != '\n') {
                    i += 1;
                }
                continue;
            }
            c if c.is_whitespace() || c == '\\' => {
                i += 1;
                continue;
            }
            '"' | '\'' => {
                let (s, next) = string(&chars, i, false, &mut line)?;
                i = next;
                Token::Str(s)
            }
            c if is_ident_start(c) => {
                let begin = i;
                while let Some(&c) = chars.get(i) {
                    let dotted = c == '.' && chars.get(i + 1).is_some_and(|&n| is_ident_start(n));
                    if !is_ident_char(c) && !dotted {
                        break;
                    }
                    i += 1;
                }
                let word: String = chars[begin..i].iter().collect();
                if chars.get(i).is_some_and(|&q| q == '"' || q == '\'') && is_string_prefix(&word)
                {
                    let raw = word.to_ascii_lowercase().contains('r');
                    let (s, next) = string(&chars, i, raw, &mut line)?;
                    i = next;
                    Token::Str(s)
                } else {
                    Token::Ident(word)
                }
            }
            c if c.is_ascii_digit() => {
                while chars.get(i).is_some_and(|&c| c.is_alphanumeric() || c == '.') {
                    i += 1;
                }
                Token::Other
            }
            '(' | '[' | '{' => {
                i += 1;
                Token::Open(c)
            }
            ')' | ']' | '}' => {
                i += 1;
                Token::Close(c)
            }
            ',' => {
                i += 1;
                Token::Comma
            }
            ':' => {
                i += 1;
                Token::Colon
            }
            '=' | '+' if chars.get(i + 1) != Some(&'=') => {
                i += 1;
                if c == '=' {
                    Token::Assign
                } else {
                    Token::Plus
                }
            }
            _ => {
                // Operators, optionally followed by `=` (`==`, `+=`, `<=`, ...).
                i += 1;
                if chars.get(i) == Some(&'=') {
                    i += 1;
                }
                Token::Other
            }
        };
        tokens.push((token, start));
    }

    Ok(tokens)
}

/// Reads the string literal starting at the quote `chars[i]`. Returns its value and
/// the index right after the closing quote.
fn string(
    chars: &[char],
    mut i: usize,
    raw: bool,
    line: &mut usize,
) -> Result<(String, usize), Error> {
    let unterminated = |line| Error::Parse {
        line,
        message: "unterminated string literal".into(),
    };

    let start = *line;
    let quote = chars[i];
    let triple = chars.get(i + 1) == Some(&quote) && chars.get(i + 2) == Some(&quote);
    i += if triple { 3 } else { 1 };

    let mut out = String::new();
    loop {
        let Some(&c) = chars.get(i) else {
            return Err(unterminated(start));
        };
        match c {
            c if c == quote && !triple => return Ok((out, i + 1)),
            c if c == quote
                && chars.get(i + 1) == Some(&quote)
                && chars.get(i + 2) == Some(&quote) =>
            {
                return Ok((out, i + 3));
            }
            '\n' if !triple => return Err(unterminated(start)),
            '\\' => {
                let Some(&next) = chars.get(i + 1) else {
                    return Err(unterminated(start));
                };
                if next == '\n' {
                    *line += 1;
                }
                if raw {
                    out.push('\\');
                    out.push(next);
                } else {
                    match next {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        '\n' => (),
                        '\\' | '"' | '\'' => out.push(next),
                        other => {
                            out.push('\\');
                            out.push(other);
                        }
                    }
                }
                i += 2;
                continue;
            }
            '\n' => *line += 1,
            _ => (),
        }
        out.push(c);
        i += 1;
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
    /// Records with the index of their first token, nested calls finish first.
    found: Vec<(usize, Record)>,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.peek_at(0)
    }

    fn peek_at(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.pos + n).map(|(t, _)| t)
    }

    fn line(&self) -> usize {
        self.tokens
            .get(self.pos)
            .or(self.tokens.last())
            .map_or(1, |(_, line)| *line)
    }

    fn error(&self, message: String) -> Error {
        Error::Parse {
            line: self.line(),
            message,
        }
    }

    fn is_call(&self) -> bool {
        matches!(self.peek(), Some(Token::Ident(_))) && self.peek_at(1) == Some(&Token::Open('('))
    }

    fn module(&mut self) -> Result<(), Error> {
        while let Some(token) = self.peek().cloned() {
            match token {
                Token::Ident(callee) if self.is_call() => {
                    self.call(callee)?;
                }
                Token::Open(_) => self.group()?,
                Token::Close(c) => return Err(self.error(format!("unexpected '{}'", c))),
                _ => self.pos += 1,
            }
        }
        Ok(())
    }

    /// Parses `callee(...)`, the current token being the callee.
    fn call(&mut self, callee: String) -> Result<Record, Error> {
        let start = self.pos;
        let line = self.line();
        self.pos += 2;

        let mut fields = Vec::new();
        loop {
            let Some(token) = self.peek().cloned() else {
                return Err(Error::Parse {
                    line,
                    message: format!("unclosed call to {}", callee),
                });
            };
            match token {
                Token::Close(')') => {
                    self.pos += 1;
                    break;
                }
                Token::Close(c) => {
                    return Err(self.error(format!("expected ')' but found '{}'", c)));
                }
                Token::Comma | Token::Colon => self.pos += 1,
                Token::Ident(key) if self.peek_at(1) == Some(&Token::Assign) => {
                    self.pos += 2;
                    let value = self.expr()?;
                    fields.push((key, value));
                }
                _ => {
                    self.expr()?;
                }
            }
        }

        let record = Record {
            callee,
            fields,
            line,
        };
        self.found.push((start, record.clone()));
        Ok(record)
    }

    /// Parses one expression, stopping before `,`, `:` or a closing bracket.
    fn expr(&mut self) -> Result<Value, Error> {
        let mut parts = Vec::new();
        while let Some(token) = self.peek().cloned() {
            match token {
                Token::Comma | Token::Colon | Token::Close(_) => break,
                Token::Plus => self.pos += 1,
                Token::Str(s) => {
                    self.pos += 1;
                    parts.push(Value::Str(s));
                }
                Token::Open('[') => parts.push(self.list()?),
                Token::Open(_) => {
                    self.group()?;
                    parts.push(Value::Other);
                }
                Token::Ident(callee) if self.is_call() => {
                    parts.push(Value::Call(self.call(callee)?))
                }
                _ => {
                    self.pos += 1;
                    parts.push(Value::Other);
                }
            }
        }
        Ok(join(parts))
    }

    fn list(&mut self) -> Result<Value, Error> {
        let line = self.line();
        self.pos += 1;

        let mut items = Vec::new();
        loop {
            let Some(token) = self.peek().cloned() else {
                return Err(Error::Parse {
                    line,
                    message: "unclosed '['".into(),
                });
            };
            match token {
                Token::Close(']') => {
                    self.pos += 1;
                    return Ok(Value::List(items));
                }
                Token::Close(c) => {
                    return Err(self.error(format!("expected ']' but found '{}'", c)));
                }
                Token::Comma | Token::Colon => self.pos += 1,
                _ => items.push(self.expr()?),
            }
        }
    }

    /// Skips a bracketed group, still collecting the calls inside it.
    fn group(&mut self) -> Result<(), Error> {
        let Some(Token::Open(open)) = self.peek().cloned() else {
            return Ok(());
        };
        let close = match open {
            '(' => ')',
            '[' => ']',
            _ => '}',
        };
        let line = self.line();
        self.pos += 1;

        loop {
            let Some(token) = self.peek().cloned() else {
                return Err(Error::Parse {
                    line,
                    message: format!("unclosed '{}'", open),
                });
            };
            match token {
                Token::Close(c) if c == close => {
                    self.pos += 1;
                    return Ok(());
                }
                Token::Close(c) => {
                    return Err(self.error(format!("expected '{}' but found '{}'", close, c)));
                }
                Token::Comma | Token::Colon => self.pos += 1,
                _ => {
                    self.expr()?;
                }
            }
        }
    }
}

/// A single part keeps its shape, string parts are concatenated, anything else
/// is opaque.
fn join(mut parts: Vec<Value>) -> Value {
    if parts.len() == 1 {
        return parts.swap_remove(0);
    }
    let mut joined = String::new();
    for part in &parts {
        match part {
            Value::Str(s) => joined.push_str(s),
            _ => return Value::Other,
        }
    }
    if parts.is_empty() {
        Value::Other
    } else {
        Value::Str(joined)
    }
}
