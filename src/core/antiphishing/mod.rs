// Core anti-phishing module - block-list matching and the moderation policy.

pub mod link_scanner;
pub mod phishing_models;
pub mod phishing_service;

pub use phishing_models::*;
pub use phishing_service::*;
