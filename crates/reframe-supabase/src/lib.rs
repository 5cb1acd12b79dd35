//! Reframe Supabase - hosted backend client
//!
//! Implements the collaborator traits from `reframe-backend` against a
//! hosted project:
//! - [`SupabaseStorage`]: photo uploads into a public bucket
//! - [`SupabaseRecords`]: transformation rows over PostgREST
//! - [`SupabaseAuth`]: email/password and OAuth sign-in
//!
//! All three share one [`SupabaseClient`] and one [`SessionStore`], so a
//! sign-in through [`SupabaseAuth`] immediately authenticates uploads and
//! record writes.
//!
//! # Example
//!
//! ```rust,no_run
//! use reframe_backend::SessionStore;
//! use reframe_supabase::{SupabaseClient, SupabaseConfig};
//! use std::sync::Arc;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let session = Arc::new(SessionStore::in_memory());
//! let client = SupabaseClient::new(
//!     SupabaseConfig::new("https://xyz.supabase.co", "anon-key"),
//!     session,
//! )?;
//! client.auth().sign_in_with_password("sam@example.com", "secret").await?;
//! let backend = client.backend();
//! # let _ = backend;
//! # Ok(())
//! # }
//! ```
//!
//! [`SessionStore`]: reframe_backend::SessionStore

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod records;
pub mod storage;

pub use auth::{parse_callback_tokens, CallbackTokens, SignUpOutcome, SupabaseAuth};
pub use client::SupabaseClient;
pub use config::SupabaseConfig;
pub use error::{HttpError, SupabaseError};
pub use records::SupabaseRecords;
pub use storage::SupabaseStorage;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
