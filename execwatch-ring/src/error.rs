use derive_more::Display;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display)]
#[display("{self:?}")]
pub enum Error {
	#[display("Ring capacity {capacity} must be a non-zero multiple of 8, at least 16")]
	InvalidCapacity { capacity: usize },
	#[display("Ring capacity {capacity} exceeds the maximum of {max}")]
	CapacityTooLarge { capacity: usize, max: usize },
}

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
