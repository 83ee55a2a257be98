//! Integration tests for models, instances and hooks.

#[path = "../support/mod.rs"]
mod support;

mod hooks;
mod typed;
