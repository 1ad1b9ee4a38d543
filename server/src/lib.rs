//! Village session router library.
//! This crate exposes internal modules for integration testing.
//! The binary entry point is in main.rs.

pub mod auth;
pub mod bot;
pub mod config;
pub mod error;
pub mod notify;
pub mod router;
pub mod routes;
pub mod state;
pub mod village;
pub mod ws;
