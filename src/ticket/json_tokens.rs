//! A small bounded-token JSON tokenizer.
//!
//! This mirrors the resource-bounded parsing style of `jsmn` (the tokenizer
//! the original C implementation parsed tickets with): tokens are offsets
//! into the input, no string is copied, and the number of tokens the parser
//! is willing to produce is capped up front. A ticket that needs more tokens
//! than the cap is rejected rather than causing unbounded allocation.
//!
//! Only the JSON subset tickets actually use is supported: objects, arrays,
//! strings and primitives (numbers/bools/null as bare token text). There is
//! no support for nested objects/arrays beyond one array of strings, which
//! is all `Ticket` needs.

use super::MAX_TOKENS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum TokenKind {
    Object,
    Array,
    String,
    Primitive,
}

#[derive(Debug, Clone, Copy)]
pub(super) struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
    /// For Object/Array: number of direct children (key/value pairs count
    /// as 2 children per jsmn convention on the key token... here we count
    /// values only, since a JSON object here is only ever the ticket root).
    pub size: usize,
}

impl Token {
    pub fn text<'a>(&self, input: &'a str) -> &'a str {
        &input[self.start..self.end]
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone, Copy)]
pub(super) enum TokenizeError {
    #[error("ticket JSON corrupted")]
    Inval,
    #[error("too many JSON tokens in ticket")]
    NTokens,
    #[error("ticket JSON misses a part")]
    Part,
}

/// Tokenize `input`, a JSON document expected to be a single flat object
/// whose values are strings, unsigned integers, booleans, or arrays of
/// strings. Returns tokens in document order; `tokens[0]` is always the
/// root object.
pub(super) fn tokenize(input: &str) -> Result<Vec<Token>, TokenizeError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::with_capacity(MAX_TOKENS.min(64));
    let mut i = 0usize;

    skip_ws(bytes, &mut i);
    if i >= bytes.len() || bytes[i] != b'{' {
        return Err(TokenizeError::Inval);
    }
    let root_idx = push_token(&mut tokens, TokenKind::Object, i, i)?;
    i += 1;

    let mut size = 0usize;
    loop {
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(TokenizeError::Part);
        }
        if bytes[i] == b'}' {
            i += 1;
            break;
        }
        if size > 0 {
            if bytes[i] != b',' {
                return Err(TokenizeError::Inval);
            }
            i += 1;
            skip_ws(bytes, &mut i);
        }

        // key
        let key = parse_string(bytes, &mut i)?;
        push_token(&mut tokens, TokenKind::String, key.0, key.1)?;

        skip_ws(bytes, &mut i);
        if i >= bytes.len() || bytes[i] != b':' {
            return Err(TokenizeError::Inval);
        }
        i += 1;
        skip_ws(bytes, &mut i);
        if i >= bytes.len() {
            return Err(TokenizeError::Part);
        }

        match bytes[i] {
            b'"' => {
                let (s, e) = parse_string(bytes, &mut i)?;
                push_token(&mut tokens, TokenKind::String, s, e)?;
            }
            b'[' => {
                parse_string_array(bytes, &mut i, &mut tokens)?;
            }
            _ => {
                let (s, e) = parse_primitive(bytes, &mut i)?;
                push_token(&mut tokens, TokenKind::Primitive, s, e)?;
            }
        }
        size += 1;
    }

    tokens[root_idx].size = size;

    skip_ws(bytes, &mut i);
    if i != bytes.len() {
        return Err(TokenizeError::Inval);
    }

    Ok(tokens)
}

fn push_token(
    tokens: &mut Vec<Token>,
    kind: TokenKind,
    start: usize,
    end: usize,
) -> Result<usize, TokenizeError> {
    if tokens.len() >= MAX_TOKENS {
        return Err(TokenizeError::NTokens);
    }
    tokens.push(Token {
        kind,
        start,
        end,
        size: 0,
    });
    Ok(tokens.len() - 1)
}

fn skip_ws(bytes: &[u8], i: &mut usize) {
    while *i < bytes.len() && matches!(bytes[*i], b' ' | b'\t' | b'\r' | b'\n') {
        *i += 1;
    }
}

/// Returns the (start, end) byte range of the string contents, excluding
/// quotes. Advances `i` past the closing quote. No escape processing beyond
/// `\"` and `\\`, which is all ticket field values use in practice.
fn parse_string(bytes: &[u8], i: &mut usize) -> Result<(usize, usize), TokenizeError> {
    if *i >= bytes.len() || bytes[*i] != b'"' {
        return Err(TokenizeError::Inval);
    }
    *i += 1;
    let start = *i;
    while *i < bytes.len() && bytes[*i] != b'"' {
        if bytes[*i] == b'\\' {
            *i += 1;
        }
        *i += 1;
    }
    if *i >= bytes.len() {
        return Err(TokenizeError::Part);
    }
    let end = *i;
    *i += 1; // closing quote
    Ok((start, end))
}

/// A bare (unquoted) token: digits, `true`, `false`, `null`. Stops at the
/// next structural character or whitespace.
fn parse_primitive(bytes: &[u8], i: &mut usize) -> Result<(usize, usize), TokenizeError> {
    let start = *i;
    while *i < bytes.len()
        && !matches!(
            bytes[*i],
            b',' | b'}' | b']' | b' ' | b'\t' | b'\r' | b'\n'
        )
    {
        *i += 1;
    }
    if *i == start {
        return Err(TokenizeError::Inval);
    }
    Ok((start, *i))
}

fn parse_string_array(
    bytes: &[u8],
    i: &mut usize,
    tokens: &mut Vec<Token>,
) -> Result<(), TokenizeError> {
    debug_assert_eq!(bytes[*i], b'[');
    let array_start = *i;
    *i += 1;
    let array_idx = push_token(tokens, TokenKind::Array, array_start, array_start)?;

    let mut size = 0usize;
    loop {
        skip_ws(bytes, i);
        if *i >= bytes.len() {
            return Err(TokenizeError::Part);
        }
        if bytes[*i] == b']' {
            *i += 1;
            break;
        }
        if size > 0 {
            if bytes[*i] != b',' {
                return Err(TokenizeError::Inval);
            }
            *i += 1;
            skip_ws(bytes, i);
        }
        let (s, e) = parse_string(bytes, i)?;
        push_token(tokens, TokenKind::String, s, e)?;
        size += 1;
    }
    tokens[array_idx].size = size;
    Ok(())
}
