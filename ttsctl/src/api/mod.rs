//! API layer for HTTP request handling and data models.
//!
//! This module contains the REST API implementation, organized into:
//!
//! - **[`handlers`]**: Axum route handlers for all API endpoints
//! - **[`models`]**: Request/response data structures for API communication
//!
//! # API Structure
//!
//! Account routes live under `/api/v1` and require a session:
//!
//! - **Speech** (`POST /speech`): priced, billed generation
//! - **Projects** (`/projects`, `/projects/{id}`): the caller's generations
//! - **Voices** (`/voices`): default voices and uploaded reference samples
//! - **Credits** (`/credits/balance`, `/credits/transactions`): balance and ledger
//!
//! The payment provider posts to `/webhooks/payments`, authenticated by signature instead of
//! a session.
//!
//! # OpenAPI Documentation
//!
//! All account endpoints are documented with `utoipa`. The document is served at
//! `/api-docs/openapi.json` and rendered at `/docs`.

pub mod handlers;
pub mod models;
