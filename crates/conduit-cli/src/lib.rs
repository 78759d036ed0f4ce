//! conduit command line
//!
//! `conduit call` and `conduit notify` spawn a JSON-RPC 2.0 server as a child
//! process and talk to it over its stdio. `conduit serve` answers a few
//! diagnostic methods on its own stdio.

pub mod cli;
pub mod commands;
