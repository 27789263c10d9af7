pub mod gitlab;
pub mod registry;
