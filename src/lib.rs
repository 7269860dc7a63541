//! A fixture HTTP server for exercising client-side header handling.
//!
//! Every `HEAD` request is answered with the same canned response head (see [`fixture`]);
//! everything else is turned away. Meant to be pointed at by other test suites.

pub mod def;
pub mod message;
pub mod fixture;
pub mod http;

pub use crate::http::{Address, Server, ServerError};
