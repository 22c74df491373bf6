//! Types, traits and errors shared across the client

pub mod errors;
pub mod traits;
pub mod types;
