//! termspeed TUI - full-screen terminal for termspeed.
//!
//! This crate provides the ratatui-based interactive UI. It draws what the
//! `termspeed-core` controller paints into a [`ScreenSink`] and feeds key
//! presses back as `KeyInput`s.

mod app;
mod input_handler;
mod layout_manager;
mod output_renderer;
mod screen;
#[cfg(test)]
pub(crate) mod test_helpers;

pub use app::*;
pub use input_handler::*;
pub use layout_manager::*;
pub use output_renderer::*;
pub use screen::*;
