//! Wire encoding of command arguments and decoding of mailbox tokens.

pub mod decode;
pub mod encode;

pub use encode::{Encoded, Fragment, LiteralMode};
