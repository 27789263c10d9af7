mod activity;
mod contributors;
mod core;
mod dependencies;
mod dora;
mod group;
mod health;
mod issues;
mod merge_requests;
mod pipelines;
mod project;
mod readme;

pub use core::GitLabProvider;
pub use merge_requests::Timeframe;
