#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod buffer;
pub mod error;
#[cfg(feature = "marshal")]
pub mod marshal;
pub mod media;
pub mod util;

pub use buffer::{MAX_PACKET_SIZE, PacketBuffer};
pub use media::MediaKind;
