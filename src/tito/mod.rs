//! Tito ticketing API access
//!
//! Only the question-answers endpoint is used: registrants answer a custom
//! ticket question with their Discord username, and verification looks the
//! clicking user up in that list.

pub mod client;
pub mod types;

pub use client::{TicketLookup, TitoClient};
pub use types::{find_matching_answer, MatchPolicy, TicketAnswer};
