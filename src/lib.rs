pub mod api;
pub mod common;
pub mod config;
pub mod logging;
pub mod market;
pub mod volume_profile;
