//! Byte storage backing each channel direction.

mod ring;

pub use ring::ByteRing;
