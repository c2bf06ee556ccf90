//! Adapters - Implementations of port interfaces.
//!
//! - `auth` - Session validators (JWT, mock)
//! - `chapa` - Chapa payment gateway, webhook signatures, mock gateway
//! - `http` - axum REST surface
//! - `memory` - In-process ledger, entitlements and catalog
//! - `postgres` - sqlx-backed ledger, entitlements and catalog

pub mod auth;
pub mod chapa;
pub mod http;
pub mod memory;
pub mod postgres;
