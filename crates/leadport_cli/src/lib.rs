//! Command-line front end for leadport.
//!
//! The `leadport` binary exports or restores the CRM database; `leadport-seed`
//! fills a development database with fake data. Both share the commands,
//! output helper and logging setup in this crate.

pub mod commands;
pub mod logging;
pub mod output;

pub use output::Output;
