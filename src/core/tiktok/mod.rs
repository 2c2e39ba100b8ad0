// Core TikTok module - creator follows, live polling and video downloads.

pub mod tiktok_models;
pub mod tiktok_service;

pub use tiktok_models::*;
pub use tiktok_service::*;
