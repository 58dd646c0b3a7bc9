//! # Tour Booking Backend
//!
//! Storefront and back-office backend for a multi-language guided tour
//! business.
//!
//! ## Features
//!
//! - **Catalog**: tours with per-language text and content blocks, categories
//!   and highlight labels
//! - **Pricing**: flat, adult/child and seat-tier pricing, packages and upsells
//! - **Availability**: dated departures with seat capacity
//! - **Checkout**: seat reservation, payment intents and booking vouchers
//! - **Content**: translatable static pages and machine translation of text
//! - **Analytics**: page-visit beacons and an admin dashboard
//! - **HTTP API**: REST endpoints for the storefront and the admin panel
//!
//! ## Architecture
//!
//! - [`models`]: domain types shared by every layer
//! - [`db`]: repository traits and the in-memory / PostgreSQL backends
//! - [`clients`]: payment gateway, object storage, translator and auth
//! - [`services`]: business rules on top of repositories and clients
//! - [`config`]: TOML configuration with environment overrides
//! - [`http`]: axum server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod clients;
pub mod config;
pub mod db;
pub mod models;
pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
