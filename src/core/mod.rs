pub mod audio;
pub mod chat;
pub mod config;
pub mod credential;
pub mod dispatch;
pub mod gate;
pub mod image;
