//! MongoDB source adapter

pub mod client;
pub mod source;

pub use client::MongoConnection;
pub use source::MongoSource;
