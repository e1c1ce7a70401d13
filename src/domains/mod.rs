//! Domains module containing business logic organized by bounded contexts.
//!
//! The server exposes a single bounded context, `tools`; everything an MCP
//! client can do goes through it.

pub mod tools;
