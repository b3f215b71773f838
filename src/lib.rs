pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod models;
pub mod provider;
pub mod retry;
pub mod state;
pub mod store;
pub mod sync;
