//! Decrypted ticket parsing: [`Ticket`] is the authorization grant carried,
//! sealed, as the Hawk `id` parameter (spec.md §3 "Ticket", §4.4 "Ticket
//! Codec").
//!
//! Field dispatch and the error taxonomy below are a direct port of the
//! original `ticket.c`'s `ticket_from_string`: a bounded-token tokenizer
//! walks the flat JSON object once, each recognized key dispatches to a
//! small per-type parser, an unrecognized key is an error, and a duplicate
//! key simply overwrites the earlier value (last write wins, since we never
//! rewind the token cursor).

mod json_tokens;

use json_tokens::{tokenize, Token, TokenKind, TokenizeError};

use crate::hawk::HawkAlgorithm;

/// Upper bound on the number of tokens the ticket tokenizer will produce:
/// 1 for the root object, 2 per recognized key (key token + value token) for
/// up to 8 fields, plus one token per realm up to [`crate::MAX_REALMS`].
/// Mirrors `MAX_TOKENS` in the original `ticket.c`.
pub(crate) const MAX_TOKENS: usize = 27;

/// The decrypted authorization grant sealed inside a ticket.
///
/// `user` and `owner` are optional in the wire format; a missing optional
/// field is represented here as an empty `String`, matching spec.md §3.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub client: String,
    pub user: String,
    pub owner: String,
    pub pwd: String,
    pub hawk_algorithm: HawkAlgorithm,
    pub exp: u64,
    pub rw: bool,
    pub realms: Vec<String>,
}

/// Ticket JSON parse errors, named exactly as spec.md §4.4 enumerates them.
#[derive(Debug, thiserror::Error, PartialEq, Eq, Clone)]
pub enum TicketError {
    #[error("ticket JSON corrupted")]
    JsonInval,
    #[error("too many JSON tokens in ticket")]
    JsonNTokens,
    #[error("ticket JSON misses a part")]
    JsonPart,
    #[error("not enough tokens in ticket JSON to parse expected token")]
    MissingExpectedToken,
    #[error("unexpected token type")]
    UnexpectedTokenType,
    #[error("unexpected token name: {0:?}")]
    UnexpectedTokenName(String),
    #[error("unable to parse time value")]
    ParseTimeValue,
    #[error("too many realms in ticket")]
    NRealms,
    #[error("unknown Hawk algorithm: {0:?}")]
    UnknownHawkAlgorithm(String),
}

impl From<TokenizeError> for TicketError {
    fn from(e: TokenizeError) -> Self {
        match e {
            TokenizeError::Inval => TicketError::JsonInval,
            TokenizeError::NTokens => TicketError::JsonNTokens,
            TokenizeError::Part => TicketError::JsonPart,
        }
    }
}

impl Ticket {
    /// Parse a decrypted ticket JSON buffer.
    ///
    /// An absent `pwd` parses as an empty string; the handler's MAC step
    /// rejects that as a bad signature rather than this parser rejecting
    /// it as a shape error.
    pub fn parse(json: &[u8]) -> Result<Self, TicketError> {
        let input = std::str::from_utf8(json).map_err(|_| TicketError::JsonInval)?;
        let tokens = tokenize(input)?;

        let mut client = String::new();
        let mut user = String::new();
        let mut owner = String::new();
        let mut pwd = String::new();
        let mut hawk_algorithm = None;
        let mut exp = None;
        let mut rw = false;
        let mut realms = Vec::new();

        let mut i = 0usize;
        debug_assert_eq!(tokens[0].kind, TokenKind::Object);
        i += 1;

        while i < tokens.len() {
            let key_tok = &tokens[i];
            if key_tok.kind != TokenKind::String {
                return Err(TicketError::UnexpectedTokenType);
            }
            let key = key_tok.text(input);
            i += 1;

            match key {
                "client" => {
                    client = take_string(&tokens, input, &mut i)?;
                }
                "pwd" => {
                    pwd = take_string(&tokens, input, &mut i)?;
                }
                "owner" => {
                    owner = take_string(&tokens, input, &mut i)?;
                }
                "user" => {
                    user = take_string(&tokens, input, &mut i)?;
                }
                "hawkAlgorithm" => {
                    let name = take_string(&tokens, input, &mut i)?;
                    hawk_algorithm = Some(
                        HawkAlgorithm::by_name(&name)
                            .ok_or_else(|| TicketError::UnknownHawkAlgorithm(name))?,
                    );
                }
                "exp" => {
                    exp = Some(take_time(&tokens, input, &mut i)?);
                }
                "rw" => {
                    rw = take_rw(&tokens, input, &mut i)?;
                }
                "scope" | "scopes" => {
                    realms = take_realms(&tokens, input, &mut i)?;
                }
                other => {
                    return Err(TicketError::UnexpectedTokenName(other.to_string()));
                }
            }
        }

        Ok(Ticket {
            client,
            user,
            owner,
            pwd,
            hawk_algorithm: hawk_algorithm.ok_or(TicketError::MissingExpectedToken)?,
            exp: exp.ok_or(TicketError::MissingExpectedToken)?,
            rw,
            realms,
        })
    }

    /// Minimum scope obligation from spec.md §9: `realm ∈ ticket.realms`.
    pub fn has_scope(&self, realm: &str) -> bool {
        self.realms.iter().any(|r| r == realm)
    }
}

fn take_string(tokens: &[Token], input: &str, i: &mut usize) -> Result<String, TicketError> {
    let t = tokens.get(*i).ok_or(TicketError::MissingExpectedToken)?;
    if t.kind != TokenKind::String {
        return Err(TicketError::UnexpectedTokenType);
    }
    *i += 1;
    Ok(t.text(input).to_string())
}

fn take_time(tokens: &[Token], input: &str, i: &mut usize) -> Result<u64, TicketError> {
    let t = tokens.get(*i).ok_or(TicketError::MissingExpectedToken)?;
    if t.kind != TokenKind::Primitive {
        return Err(TicketError::UnexpectedTokenType);
    }
    *i += 1;
    let text = t.text(input);
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(TicketError::ParseTimeValue);
    }
    text.parse().map_err(|_| TicketError::ParseTimeValue)
}

fn take_rw(tokens: &[Token], input: &str, i: &mut usize) -> Result<bool, TicketError> {
    // rw=false is the safe default: absence or anything but the literal
    // `true` yields false, matching `do_rw` in ticket.c exactly.
    let t = tokens.get(*i).ok_or(TicketError::MissingExpectedToken)?;
    *i += 1;
    Ok(t.kind == TokenKind::Primitive && t.text(input) == "true")
}

fn take_realms(tokens: &[Token], input: &str, i: &mut usize) -> Result<Vec<String>, TicketError> {
    let t = tokens.get(*i).ok_or(TicketError::MissingExpectedToken)?;
    if t.kind != TokenKind::Array {
        return Err(TicketError::UnexpectedTokenType);
    }
    let size = t.size;
    *i += 1;
    if size > crate::MAX_REALMS {
        return Err(TicketError::NRealms);
    }
    let mut realms = Vec::with_capacity(size);
    for _ in 0..size {
        realms.push(take_string(tokens, input, i)?);
    }
    Ok(realms)
}
