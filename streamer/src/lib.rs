pub mod app;
pub mod calibrate;
pub mod config;
pub mod error;
pub mod http;
pub mod hub;
pub mod pace;
pub mod relay;
pub mod sender;
pub mod source;

pub use app::{relay, send, serve};
pub use config::StreamerConfig;
pub use error::{Result, StreamerErr};
