//! HTTP adapters.

pub mod remediator;

pub use remediator::HttpRemediator;
