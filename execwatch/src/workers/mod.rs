mod local;
mod ringbuf;
mod sink;
mod stats;

pub use local::*;
pub use ringbuf::*;
pub use sink::*;
pub use stats::*;
