pub mod client;
mod provider;
mod types;
mod url_utils;

pub use provider::{GitLabProvider, Timeframe};
