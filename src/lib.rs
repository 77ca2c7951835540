//! hfdeck is a terminal client for a hosted inference API.
//!
//! The crate is organized around a small set of collaborating layers:
//! - [`core`] owns the session gate, the request dispatcher for the three
//!   capabilities (chat, text-to-image, transcription), and user settings.
//! - [`ui`] renders the tabbed terminal interface and runs the event loop that
//!   turns key presses into dispatcher calls.
//! - [`cli`] parses arguments and runs either the interface or a one-shot
//!   headless command.
//! - [`api`] defines the wire payloads exchanged with the inference endpoints.
//!
//! Runtime entrypoints live in the binary crate (`src/main.rs`) and route
//! through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod logging;
pub mod ui;
pub mod utils;
