//! Core business logic abstractions

pub mod amount;
pub mod config;
pub mod convert;
pub mod log;
pub mod rates;

// Re-export main types for cleaner imports
pub use amount::Amount;
pub use convert::{ZERO_RESULT, convert};
pub use rates::{RateProvider, RateTable};
