pub mod types;
pub mod config;
pub mod error;
pub mod data;
pub mod sampling;
pub mod selection;
pub mod projection;
pub mod buffer;
pub mod join;
pub mod view;
pub mod scene;
pub mod export;
pub mod render;
pub mod server;
