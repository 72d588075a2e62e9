//! Request authentication.
//!
//! Identity is owned by an external provider. This service only needs to know
//! which account a request belongs to, so authentication is reduced to one
//! narrow seam, [`session::SessionProvider`], which maps request headers to an
//! optional [`session::Session`].
//!
//! # Authentication Methods
//!
//! ## 1. Session tokens
//!
//! HS256 JWTs issued by the identity provider with the account id in `sub`:
//! - read from the session cookie (`auth.session.cookie_name`) for browser clients
//! - or from an `Authorization: Bearer <token>` header for programmatic clients
//!
//! ## 2. Trusted proxy header
//!
//! An upstream SSO proxy sets the account id in a header
//! (`auth.proxy_header.header_name`). Only enable this behind such a proxy.
//!
//! Both methods can be enabled at once; they are tried in that order.
//!
//! # Usage in Handlers
//!
//! ```ignore
//! use ttsctl::auth::current_user::CurrentAccount;
//!
//! async fn protected_handler(account: CurrentAccount) -> String {
//!     format!("Hello, {}!", account.id)
//! }
//! ```
//!
//! Handlers that read the balance take a [`scope::RequestScope`] instead, which
//! wraps the account and memoises ledger reads for the lifetime of one request.
//!
//! # Modules
//!
//! - [`current_user`]: the [`current_user::CurrentAccount`] extractor
//! - [`scope`]: per-request read cache
//! - [`session`]: the provider seam and its JWT and proxy-header implementations

pub mod current_user;
pub mod scope;
pub mod session;
