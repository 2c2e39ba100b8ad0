// Core Cloudflare module - API port, typed models and request validation.

pub mod cloudflare_models;
pub mod cloudflare_service;
pub mod validation;

pub use cloudflare_models::*;
pub use cloudflare_service::*;
