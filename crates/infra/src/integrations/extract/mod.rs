//! AI page-extraction integration

pub mod adapter;
pub mod client;

pub use adapter::ExtractAdapter;
pub use client::ExtractClient;
