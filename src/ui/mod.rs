//! Terminal UI layer: the token form and the three capability tabs.
//!
//! Key submodules:
//! - [`state`] and [`actions`]: interface state and the reducer that updates
//!   it. Side effects leave the reducer as [`actions::AppCommand`]s.
//! - [`executor`]: runs commands on Tokio tasks against
//!   [`crate::core::dispatch::Dispatcher`].
//! - [`event_loop`], [`renderer`] and [`lifecycle`]: input, drawing and
//!   terminal setup.

pub mod actions;
pub mod event_loop;
pub mod executor;
pub mod lifecycle;
pub mod renderer;
pub mod state;

pub use event_loop::run_ui;
