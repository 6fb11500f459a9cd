//! # Agenda Server
//!
//! HTTP planner endpoint and the `agenda` command-line front end built on
//! [`agenda_core`].

pub mod api;
pub mod cli;
pub mod commands;
pub mod config;
pub mod router;
pub mod state;
