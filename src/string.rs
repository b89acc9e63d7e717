//! String handling for the wire: frame codecs, casemapping, and SASL names.

pub mod base64;
mod casemap;
mod saslname;

pub use casemap::IrcCasemap;
pub use saslname::*;
