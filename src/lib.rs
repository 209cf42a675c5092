// SchoolPick session - library root for testing

pub mod auth;
pub mod config;
pub mod error;
pub mod http_client;
pub mod routing;
