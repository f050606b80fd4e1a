pub mod commands;
pub mod start;

pub use start::{init_bot, Handler};
