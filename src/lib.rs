pub mod auth;
pub mod client;
pub mod config;
pub mod domain;
pub mod execution;
pub mod logging;
pub mod rounding;
pub mod wallet;
