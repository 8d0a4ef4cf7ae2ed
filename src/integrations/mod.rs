#[cfg(test)]
pub mod fake;
pub mod twitter;

pub use twitter::{LookupError, ProfileSource, TwitterClient};
