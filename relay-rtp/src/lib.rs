#![warn(rust_2018_idioms)]
#![allow(dead_code)]

pub mod header;
pub mod red;

pub use header::Header;
