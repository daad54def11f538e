#![cfg_attr(not(test), no_std)]

mod event;
mod producer;

pub use event::*;
pub use producer::*;
