pub mod api;
pub mod config;
pub mod errors;
pub mod feed;
pub mod logging;
pub mod sitewatch_config;
pub mod ui;
