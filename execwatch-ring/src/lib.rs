//! Bounded byte ring shared by non-blocking producers and a single draining
//! consumer.
//!
//! Record layout follows the kernel BPF ring buffer: an 8-byte header word
//! (length, `BUSY`, `DISCARD`) followed by the payload, padded to 8 bytes.
//! A record never straddles the end of the buffer; when it would, the tail
//! is claimed as a discarded padding record and the record starts at offset 0.

mod error;
mod ring;
mod sink;

pub use self::error::{Error, Result};
pub use ring::*;
pub use sink::*;
