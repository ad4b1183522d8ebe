//! Textual session codec.
//!
//! A payload is stored as `<key>|<value>` pairs with nothing between them:
//!
//! | Value              | Encoding                        |
//! |--------------------|---------------------------------|
//! | `Null`             | `N;`                            |
//! | `Bool`             | `b:0;` / `b:1;`                 |
//! | `Int`              | `i:<decimal>;`                  |
//! | `Float`            | `d:<decimal>;` (`NAN`, `INF`, `-INF`) |
//! | `String` (n bytes) | `s:<n>:"<bytes>";`              |
//! | `Map` (n entries)  | `a:<n>:{<key><value>...}`       |
//!
//! Strings are length-prefixed, so their bytes are taken verbatim and may
//! contain `"`, `|`, `;` or NUL. Decoding is a single forward pass over a
//! byte cursor and either returns the whole payload or an error.

use std::fmt;

use crate::value::{Payload, Value};

/// Maximum nesting of maps accepted by the decoder.
const MAX_DEPTH: usize = 128;

/// What went wrong while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeErrorKind {
    /// No `|` terminates the key, or the key is empty.
    MissingKey,
    /// Top-level key is not valid UTF-8.
    KeyEncoding,
    /// No known type tag at the cursor.
    UnexpectedTag,
    /// Integer or float literal does not parse.
    BadNumber,
    /// Length or count prefix is missing or out of range.
    BadLength,
    /// A required delimiter is absent.
    Expected(char),
    /// Input ends inside a value.
    Truncated,
    /// Maps nest deeper than the decoder allows.
    TooDeep,
}

impl fmt::Display for DecodeErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeErrorKind::MissingKey => write!(f, "missing key terminator"),
            DecodeErrorKind::KeyEncoding => write!(f, "key is not valid UTF-8"),
            DecodeErrorKind::UnexpectedTag => write!(f, "unrecognized type tag"),
            DecodeErrorKind::BadNumber => write!(f, "malformed number"),
            DecodeErrorKind::BadLength => write!(f, "malformed length prefix"),
            DecodeErrorKind::Expected(c) => write!(f, "expected '{c}'"),
            DecodeErrorKind::Truncated => write!(f, "unexpected end of input"),
            DecodeErrorKind::TooDeep => write!(f, "nesting too deep"),
        }
    }
}

/// Decoding failure at a byte offset.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid session format (index:{offset}): {kind}")]
pub struct DecodeError {
    pub offset: usize,
    pub kind: DecodeErrorKind,
}

/// Payload that cannot be represented in the stored format.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EncodeError {
    #[error("Session key must not be empty")]
    EmptyKey,

    #[error("Session key must not contain '|': '{0}'")]
    KeyContainsDelimiter(String),

    /// Stored records are trimmed before decoding, so a leading blank would
    /// be lost from the first key.
    #[error("Session key must not start with whitespace: '{0}'")]
    KeyLeadingWhitespace(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Encoding
// ─────────────────────────────────────────────────────────────────────────────

/// Encode a payload.
pub fn encode(payload: &Payload) -> Result<Vec<u8>, EncodeError> {
    let mut out = Vec::new();
    for (key, value) in payload.iter() {
        if key.is_empty() {
            return Err(EncodeError::EmptyKey);
        }
        if key.contains('|') {
            return Err(EncodeError::KeyContainsDelimiter(key.to_string()));
        }
        if key.starts_with(|c: char| c.is_ascii_whitespace()) {
            return Err(EncodeError::KeyLeadingWhitespace(key.to_string()));
        }
        out.extend_from_slice(key.as_bytes());
        out.push(b'|');
        encode_value(value, &mut out);
    }
    Ok(out)
}

/// Append the encoding of one value.
pub fn encode_value(value: &Value, out: &mut Vec<u8>) {
    match value {
        Value::Null => out.extend_from_slice(b"N;"),
        Value::Bool(false) => out.extend_from_slice(b"b:0;"),
        Value::Bool(true) => out.extend_from_slice(b"b:1;"),
        Value::Int(n) => out.extend_from_slice(format!("i:{n};").as_bytes()),
        Value::Float(f) => {
            out.extend_from_slice(b"d:");
            out.extend_from_slice(format_float(*f).as_bytes());
            out.push(b';');
        }
        Value::String(bytes) => {
            out.extend_from_slice(format!("s:{}:\"", bytes.len()).as_bytes());
            out.extend_from_slice(bytes);
            out.extend_from_slice(b"\";");
        }
        Value::Map(entries) => {
            out.extend_from_slice(format!("a:{}:{{", entries.len()).as_bytes());
            for (k, v) in entries {
                encode_value(k, out);
                encode_value(v, out);
            }
            out.push(b'}');
        }
    }
}

// `Display` for f64 is the shortest string that parses back to the same value.
fn format_float(f: f64) -> String {
    if f.is_nan() {
        "NAN".to_string()
    } else if f.is_infinite() {
        if f > 0.0 { "INF" } else { "-INF" }.to_string()
    } else {
        f.to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────────

/// Decode a whole payload.
pub fn decode(source: &[u8]) -> Result<Payload, DecodeError> {
    let mut parser = Parser::new(source);
    let mut payload = Payload::new();
    while !parser.at_end() {
        let key = parser.key()?;
        let value = parser.value(0)?;
        payload.insert(key, value);
    }
    Ok(payload)
}

/// Decode exactly one value; trailing bytes are an error.
pub fn decode_value(source: &[u8]) -> Result<Value, DecodeError> {
    let mut parser = Parser::new(source);
    let value = parser.value(0)?;
    if !parser.at_end() {
        return Err(parser.error(DecodeErrorKind::UnexpectedTag));
    }
    Ok(value)
}

struct Parser<'a> {
    src: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a [u8]) -> Self {
        Self { src, pos: 0 }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn rest(&self) -> &'a [u8] {
        &self.src[self.pos.min(self.src.len())..]
    }

    fn error(&self, kind: DecodeErrorKind) -> DecodeError {
        DecodeError {
            offset: self.pos,
            kind,
        }
    }

    fn eat(&mut self, tag: &[u8]) -> bool {
        if self.rest().starts_with(tag) {
            self.pos += tag.len();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> Result<(), DecodeError> {
        match self.rest().first() {
            Some(&b) if b == c as u8 => {
                self.pos += 1;
                Ok(())
            }
            Some(_) => Err(self.error(DecodeErrorKind::Expected(c))),
            None => Err(self.error(DecodeErrorKind::Truncated)),
        }
    }

    fn take_while(&mut self, pred: impl Fn(u8) -> bool) -> &'a [u8] {
        let rest = self.rest();
        let len = rest.iter().take_while(|&&b| pred(b)).count();
        self.pos += len;
        &rest[..len]
    }

    /// `<key>|` at the top level.
    fn key(&mut self) -> Result<String, DecodeError> {
        let rest = self.rest();
        let end = match rest.iter().position(|&b| b == b'|') {
            Some(0) | None => return Err(self.error(DecodeErrorKind::MissingKey)),
            Some(end) => end,
        };
        let key = std::str::from_utf8(&rest[..end])
            .map_err(|_| self.error(DecodeErrorKind::KeyEncoding))?
            .to_string();
        self.pos += end + 1;
        Ok(key)
    }

    /// Unsigned decimal prefix used for string lengths and map counts.
    fn length(&mut self) -> Result<usize, DecodeError> {
        let start = self.pos;
        let digits = self.take_while(|b| b.is_ascii_digit());
        std::str::from_utf8(digits)
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or(DecodeError {
                offset: start,
                kind: DecodeErrorKind::BadLength,
            })
    }

    fn value(&mut self, depth: usize) -> Result<Value, DecodeError> {
        if self.at_end() {
            return Err(self.error(DecodeErrorKind::Truncated));
        }
        if self.eat(b"N;") {
            return Ok(Value::Null);
        }
        if self.eat(b"b:0;") {
            return Ok(Value::Bool(false));
        }
        if self.eat(b"b:1;") {
            return Ok(Value::Bool(true));
        }
        if self.eat(b"i:") {
            return self.int();
        }
        if self.eat(b"d:") {
            return self.float();
        }
        if self.eat(b"s:") {
            return self.string();
        }
        if self.eat(b"a:") {
            return self.map(depth);
        }
        Err(self.error(DecodeErrorKind::UnexpectedTag))
    }

    fn int(&mut self) -> Result<Value, DecodeError> {
        let start = self.pos;
        let literal = self.take_while(|b| b.is_ascii_digit() || b == b'-' || b == b'+');
        let n = std::str::from_utf8(literal)
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .ok_or(DecodeError {
                offset: start,
                kind: DecodeErrorKind::BadNumber,
            })?;
        self.expect(';')?;
        Ok(Value::Int(n))
    }

    fn float(&mut self) -> Result<Value, DecodeError> {
        let start = self.pos;
        let literal =
            self.take_while(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'+'));
        let parsed = match literal {
            b"NAN" => Some(f64::NAN),
            b"INF" => Some(f64::INFINITY),
            b"-INF" => Some(f64::NEG_INFINITY),
            _ => std::str::from_utf8(literal)
                .ok()
                .filter(|s| s.bytes().all(|b| !b.is_ascii_alphabetic() || b == b'e' || b == b'E'))
                .and_then(|s| s.parse::<f64>().ok()),
        };
        let f = parsed.ok_or(DecodeError {
            offset: start,
            kind: DecodeErrorKind::BadNumber,
        })?;
        self.expect(';')?;
        Ok(Value::Float(f))
    }

    fn string(&mut self) -> Result<Value, DecodeError> {
        let len = self.length()?;
        self.expect(':')?;
        self.expect('"')?;
        let start = self.pos;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.src.len())
            .ok_or(DecodeError {
                offset: start,
                kind: DecodeErrorKind::Truncated,
            })?;
        self.pos = end;
        self.expect('"')?;
        self.expect(';')?;
        Ok(Value::String(self.src[start..end].to_vec()))
    }

    fn map(&mut self, depth: usize) -> Result<Value, DecodeError> {
        if depth >= MAX_DEPTH {
            return Err(self.error(DecodeErrorKind::TooDeep));
        }
        let count = self.length()?;
        self.expect(':')?;
        self.expect('{')?;

        // Each entry needs at least four bytes, so a count beyond that is a lie.
        let mut entries: Vec<(Value, Value)> =
            Vec::with_capacity(count.min(self.rest().len() / 4));
        for _ in 0..count {
            let key = self.value(depth + 1)?;
            let value = self.value(depth + 1)?;
            match entries.iter_mut().find(|(k, _)| *k == key) {
                Some((_, slot)) => *slot = value,
                None => entries.push((key, value)),
            }
        }
        self.expect('}')?;
        Ok(Value::Map(entries))
    }
}
