// SharePoint search login - Library root

pub mod auth;
pub mod config;
pub mod error;
pub mod interactive;
pub mod ports;
pub mod preset;
pub mod report;
