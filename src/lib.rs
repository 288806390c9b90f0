//! Core library for the instrument_server application.
//!
//! This library contains the command dispatch engine for a line-oriented
//! instrument-control server: devices are attached at startup, command
//! plugins are registered in order, and each incoming line is matched to
//! the first plugin whose predicate accepts it.

pub mod command;
pub mod config;
pub mod device;
pub mod dispatch;
pub mod error;
pub mod server;
