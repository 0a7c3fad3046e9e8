//! AuraFin CLI - personal-finance data core
//!
//! This crate provides the core functionality for the `af` CLI tool.
//!
//! # Architecture
//!
//! - [`storage`] - Record stores (SQLite, in-memory) and object storage
//! - [`query`] - Equality/sort query builder
//! - [`scope`] - Ownership rules restricting rows to the session's identity
//! - [`db`] - Scoped reads and mutations over a store
//! - [`auth`] - Mock auth session persisted in the store
//! - [`model`] - Typed records (Transaction, Card, Receipt, Notification, Profile)
//! - [`finance`] - Dashboard, expense, tax, card and receipt views
//! - [`receipts`] - Receipt scanning and upload
//! - [`ai`] - AI collaborator (tips, mentorship, receipt extraction)
//! - [`webhook`] - Messaging webhook turning receipt photos into expenses
//! - [`config`] - Paths and collaborator settings
//! - [`cli`] - Command-line interface using clap
//! - [`error`] - Error types and handling

#![forbid(unsafe_code)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod ai;
pub mod auth;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod finance;
pub mod model;
pub mod query;
pub mod receipts;
pub mod scope;
pub mod storage;
pub mod validate;
pub mod webhook;

pub use error::{Error, Result};
