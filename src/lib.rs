// src/lib.rs

#[macro_use]
pub mod macros;
#[macro_use]
pub mod log;

pub mod config;
pub mod core;
pub mod csv;
pub mod error;
pub mod file;
pub mod model;
pub mod normalize;
pub mod progress;

pub mod view;
pub mod extract;
pub mod reconcile;
pub mod roster;

pub mod auth;
pub mod store;
pub mod upload;
pub mod session;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::{MatchMode, SyncOptions};
pub use error::{Outcome, SyncError};
pub use session::Session;
