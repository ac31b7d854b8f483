//! stockflow
//!
//! ERP-style inventory and order domain services backed by a relational
//! database through SeaORM: categories, products, warehouses, a stock
//! ledger, stock reservations, an inventory transaction log, and an order
//! workflow that keeps them consistent.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod logging;
pub mod migrator;
pub mod services;

pub use errors::ServiceError;
pub use events::{Event, EventSender};
pub use services::Services;
