//! API request and response data models.
//!
//! These structures define the public wire contract. They are kept separate
//! from the database records in [`crate::db::models`]: artifact URLs, for
//! instance, exist only here because they are minted per response.
//!
//! - [`speech`]: generation request and result
//! - [`projects`]: persisted generations
//! - [`voices`]: default and uploaded reference voices
//! - [`credits`]: balance and ledger entries
//! - [`payments`]: webhook acknowledgements
//! - [`pagination`]: shared `skip`/`limit` parameters

pub mod credits;
pub mod pagination;
pub mod payments;
pub mod projects;
pub mod speech;
pub mod voices;
