//! Gym-scoped data access for Rackside.
//!
//! This crate handles:
//! - The tenant context that scopes every query to one gym
//! - The SQLCipher business database (customers, payments, tariffs)
//! - Stage-verify-swap application of pushed database snapshots
//!
//! # Design Principles
//!
//! - **No ambient tenant**: there is no "current gym" global; every call
//!   takes a [`TenantContext`] built from the license manager's status
//! - **Reads outlive the license**: a revoked or expired gym can still
//!   view its own data, but only an `Active` context can write
//! - **The live database survives everything**: a pushed snapshot is
//!   staged and verified before an atomic swap, and the previous file is
//!   kept as a backup

mod context;
mod db;
mod error;

pub mod snapshot;

pub use context::TenantContext;
pub use db::{Customer, Payment, Tariff, TenantDb};
pub use error::{TenantError, TenantResult};
