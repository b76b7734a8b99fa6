//! Delegated Hawk-ticket request authentication.
//!
//! This crate implements the request-authentication pipeline for an
//! HTTP access-control filter: each request carries a Hawk-style MAC over a
//! canonical form of the request, keyed by material sealed inside a ticket
//! that rides along as the Hawk `id`. The filter unseals the ticket,
//! verifies the MAC with the key found inside it, and then enforces the
//! ticket's scope, expiry and read/write grant against the caller's
//! location policy.
//!
//! The pipeline, leaves first:
//!
//! * [`seal`]: authenticated-encryption of the ticket ([`seal::seal`] /
//!   [`seal::unseal`]).
//! * [`ticket`]: decoding and validating the JSON ticket payload
//!   ([`ticket::Ticket`]).
//! * [`hawk`]: parsing the `Authorization` header, computing and verifying
//!   the Hawk MAC, and building `WWW-Authenticate` challenges.
//! * [`config`]: per-location policy ([`config::LocationConfig`]) built and
//!   merged at startup.
//! * [`handler`]: orchestrates the above for a single request
//!   ([`handler::access_phase`]).
//!
//! Nonce replay protection is explicitly **not** implemented here (see
//! `DESIGN.md`); a production deployment needs an external bounded-memory
//! replay cache keyed by `(client, nonce)`.

#![forbid(unsafe_code)]

pub mod config;
pub mod handler;
pub mod hawk;
pub mod seal;
pub mod ticket;
mod time;

/// Maximum number of realms a ticket may grant (spec minimum is 8).
pub const MAX_REALMS: usize = 8;

/// Maximum number of entries in a location's password table.
pub const MAX_PWD_TAB_ENTRIES: usize = 100;

/// Static ceiling on the ciron-style decryption work area, in bytes.
///
/// Chosen the same way the original module picked its buffer sizes: observe
/// the size a normal ticket needs and leave generous headroom. Exceeding it
/// is treated as a likely attack rather than a legitimate large ticket.
pub const ENCRYPTION_WORK_AREA_CEILING: usize = 1024;

/// Static ceiling on the unsealed ticket JSON output, in bytes.
pub const UNSEAL_OUTPUT_CEILING: usize = 512;

pub use config::{ConfigError, LocationConfig, LocationConfigBuilder};
pub use handler::{access_phase, DenyReason, FilterOutcome, PublishedContext};
pub use hawk::{AuthHeader, HawkAlgorithm, HawkError};
pub use seal::{Password, SealError};
pub use ticket::{Ticket, TicketError};
