//! export-solution - export a CRM solution package to a local file
//!
//! The library holds the pieces the binary wires together: an interval
//! timer used to log how long the export took, the connection string and
//! configuration loaders, and the export call itself behind the
//! [`export::SolutionService`] trait.

pub mod cli;
pub mod clock;
pub mod config;
pub mod connection;
pub mod export;
pub mod timer;
