//! Integration tests for core construction and the connection lifecycle.

#[path = "../support/mod.rs"]
mod support;

mod config;
mod connection;
