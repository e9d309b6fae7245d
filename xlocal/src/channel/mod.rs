//! Bounded byte channels and the endpoints that pair them.
//!
//! Each direction of a socket pair is a [`Channel`]. A [`LocalEndpoint`]
//! writes into one channel and reads from the other, and is the backing
//! object of one of the pair's files.

mod bounded;
mod endpoint;

pub use bounded::Channel;
pub use endpoint::LocalEndpoint;
