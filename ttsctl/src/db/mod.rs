//! Database layer for data persistence and access.
//!
//! ```text
//! ┌─────────────┐
//! │  Datastore  │  (store::postgres - one transaction per operation)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │ Repositories│  (db::handlers - queries over a single connection)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │   Models    │  (db::models - database records)
//! └──────┬──────┘
//!        │
//!        ↓
//! ┌─────────────┐
//! │  PostgreSQL │
//! └─────────────┘
//! ```
//!
//! # Modules
//!
//! - [`handlers`]: Repository implementations
//! - [`models`]: Database record structures matching table schemas
//! - [`errors`]: Database-specific error types
//!
//! # Transactions
//!
//! Repositories borrow a `&mut PgConnection`, so several repositories can share
//! one transaction:
//!
//! ```ignore
//! let mut tx = pool.begin().await?;
//! let outcome = Credits::new(&mut tx).try_debit(account_id, cost).await?;
//! let project = Projects::new(&mut tx).create(&request).await?;
//! tx.commit().await?;
//! ```
//!
//! # Migrations
//!
//! Migrations live in `migrations/` and are exposed through [`crate::migrator`]:
//!
//! ```ignore
//! ttsctl::migrator().run(&pool).await?;
//! ```

pub mod errors;
pub mod handlers;
pub mod models;
