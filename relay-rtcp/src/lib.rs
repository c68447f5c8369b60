#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod compound;
pub mod fir;
pub mod header;

pub use compound::{CompoundRewrite, rewrite_compound, strip_fir};
pub use fir::{FirSequence, FullIntraRequest};
pub use header::{Header, PacketType};
