//! Expiry-driven resolution of pending posts.

pub mod executor;
pub mod scanner;

pub use executor::{Resolution, ResolveSummary, Resolver, SkipReason};
pub use scanner::find_expired;
