//! iCal feed import and export

pub mod adapter;
pub mod feed;

pub use adapter::IcalAdapter;
pub use feed::export_feed;
