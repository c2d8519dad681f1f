pub mod auth;
pub mod config;
pub mod errors;
pub mod gateway;
pub mod playback;
pub mod web;
