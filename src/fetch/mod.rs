//! Thin clients for the external opinion sources.
//!
//! These are I/O wrappers, not pipeline logic: each exposes one
//! logged-and-empty entry point so a dead source degrades to an empty
//! contribution instead of failing a request.

pub mod reddit;
pub mod yelp;
