//! Presentation layer for massgen — console event rendering.

mod console;
mod live;

pub use console::ConsoleFormatter;
pub use live::ConsoleSubscriber;
