//! the-odds-api adapter: JSON codec and async HTTP client.
//!
//! [`parse`] turns a response body into [`Game`](commish_core::game::Game)s
//! with canonical team names. [`OddsClient`] fetches the `events` and `scores`
//! endpoints and implements
//! [`EventProvider`](commish_core::store::EventProvider).

pub mod client;
pub mod error;
pub mod parse;

pub use client::{OddsClient, OddsConfig};
pub use error::{Error, Result};
