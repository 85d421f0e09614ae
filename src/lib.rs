pub mod app;
pub mod board;
pub mod channel;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod handlers;
pub mod models;
pub mod multiplexer;
pub mod service;
pub mod ui;
pub mod state;
pub mod window;

pub use app::router;
pub use board::SharedBoard;
pub use config::Config;
pub use multiplexer::{ChannelEvent, Multiplexer};
pub use state::AppState;
