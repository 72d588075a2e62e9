//! Repository implementations for database access.
//!
//! Each repository wraps a `&mut PgConnection` (usually a transaction) and
//! exposes strongly-typed operations over one table. Callers that need several
//! statements to commit together open a transaction and build repositories from
//! it:
//!
//! ```ignore
//! use ttsctl::db::handlers::{Credits, Projects};
//!
//! async fn example(pool: &sqlx::PgPool) -> Result<(), Box<dyn std::error::Error>> {
//!     let mut tx = pool.begin().await?;
//!     let balance = Credits::new(&mut tx).try_debit(account_id, 3).await?;
//!     // ... insert the project with Projects::new(&mut tx)
//!     tx.commit().await?;
//!     Ok(())
//! }
//! ```

pub mod accounts;
pub mod credits;
pub mod projects;
pub mod voices;

pub use accounts::Accounts;
pub use credits::Credits;
pub use projects::Projects;
pub use voices::Voices;
