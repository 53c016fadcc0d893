//! Core data types for the crypto ticker.

pub mod pair;
pub mod price;

pub use pair::*;
pub use price::*;
