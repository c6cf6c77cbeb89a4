//! OSC input module: wire encoding and the UDP client that drives the game's input

pub mod client;
pub mod message;

pub use client::{InputSink, OscClient, DEFAULT_OSC_HOST, DEFAULT_OSC_PORT};
pub use message::{encode_int_message, USE_RIGHT_ADDRESS};
