//! Wardbook: hospital appointment booking on a human-readable flat-file store.
//!
//! State lives in four pipe-separated text files under one directory and is
//! held fully in memory by [`db::Store`]; every mutation rewrites the affected
//! file atomically. On top of the store sit the availability resolver
//! ([`availability`]), the appointment status machine ([`booking`]) and care
//! assignment ([`assignment`]). Booking events fan out through the
//! [`notify::Notifier`] seam.

pub mod assignment;
pub mod availability;
pub mod booking;
pub mod config;
pub mod db;
pub mod models;
pub mod notify;

pub use db::{Store, StoreError};
