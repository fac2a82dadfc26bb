//! z/OSMF wire types consumed by the TSO client.

pub mod error;
pub mod tso;
