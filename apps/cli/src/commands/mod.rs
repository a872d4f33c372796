//! 命令定义和实现

pub mod config;
pub mod hand;

pub use config::ConfigCommand;
pub use hand::{CalibrateCommand, FeedbackCommand, FlashCommand, MoveCommand};
