//! `edmd_core` — an event-driven hard-sphere molecular dynamics core.
//! See each module's doc comment for the piece of the design it
//! implements; `engine` is the one type most callers construct directly.

pub mod boundary;
pub mod cli;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod init;
pub mod liouvillean;
pub mod neighbourlist;
pub mod particle;
pub mod registry;
pub mod runtime;
pub mod scheduler;
pub mod signal;
pub mod snapshot;
pub mod species;
pub mod store;
pub mod vector;
