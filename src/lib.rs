//! Local heuristic guard for pages impersonating Google Forms.
//!
//! The engine reads a page model ([`core::dom::Document`]), decides whether
//! the page claims to be the brand, checks where its forms and links really
//! go, blocks suspicious forms behind a single warning banner and hands a
//! capped alert record to an external sink.

pub mod cli;
pub mod config;
pub mod core;
pub mod detectors;
pub mod pipeline;
