mod api;
mod core;
pub mod graphql;
pub mod pagination;
#[cfg(test)]
pub mod testing;

pub use api::GitLabApi;
pub use core::{check_status, GitLabClient};
pub use pagination::fetch_all;
