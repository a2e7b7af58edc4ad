pub mod app;
pub mod canvas;
pub mod clip;
pub mod config;
pub mod error;
pub mod logging;
pub mod media;
pub mod opc;
pub mod pixels;
pub mod player;
pub mod playlist;
pub mod provider;
pub mod render;
pub mod source;
pub mod streamer;
pub mod terminal;
