//! Word-addressed holding-register codec and shared image.
//!
//! This crate knows nothing about bottling, Modbus wire framing, or the line
//! engine's state machine. It only knows how to name, pack, and guard the 100
//! words of shared register state.

pub mod codec;
pub mod image;
pub mod map;

pub use codec::{bool_word, pack_float32, pack_uint32, unpack_float32, unpack_uint32, word_bool};
pub use image::RegisterImage;
pub use map::TOTAL_REGISTERS;
