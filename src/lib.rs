//! # RVU Modeling Backend
//!
//! Healthcare reimbursement modeling engine.
//!
//! This crate provides a Rust backend for physician reimbursement modeling:
//! CRUD management of CPT procedure codes, payer rates, providers,
//! institutions and billing sites, plus a valuation engine that converts
//! monthly procedure volumes into RVUs and professional/technical revenue
//! and compares Freestanding Office (FPA) against Hospital Outpatient
//! (Article 28) payment. The backend exposes a REST API via Axum for the
//! web frontend.
//!
//! ## Features
//!
//! - **Catalog Management**: CPT codes, payer rates, multipliers, providers,
//!   institutions and sites with referential integrity
//! - **Valuation Engine**: earned vs. attributed RVUs and revenue per
//!   provider type, split into professional/technical/global components
//! - **Scenario Comparison**: payer-mix weighted FPA vs. Article 28 totals
//!   with manual or multiplier-derived technical rates
//! - **Guest Sessions**: non-persistent, TTL-swept ownership of valuations
//!   created without an authenticated user
//! - **HTTP API**: RESTful endpoints for frontend integration
//!
//! ## Architecture
//!
//! The crate is organized into several logical modules:
//!
//! - [`api`]: Identifier newtypes and calculation result DTOs
//! - [`models`]: Domain entities (catalog, valuations, scenarios)
//! - [`db`]: Database operations, repository pattern, and persistence layer
//! - [`services`]: Calculation engines and guest-session bookkeeping
//! - [`http`]: Axum-based HTTP server and request handlers

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;

pub mod db;
pub mod models;

pub mod services;

#[cfg(feature = "http-server")]
pub mod http;
