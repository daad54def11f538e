use derive_more::{Display, From};
use flume::{RecvError, SendError};
use tokio::task::JoinError;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Display, From)]
#[display("{self:?}")]
pub enum Error {
	#[from(String, &String, &str)]
	Custom(String),
	EventSend(String),
	EventRecv(RecvError),
	#[display("eBPF program '{_0}' not found in object")]
	EbpfProgNotFound(&'static str),
	#[display("eBPF map '{_0}' not found in object")]
	EbpfMapNotFound(&'static str),
	InvalidEventSize,
	#[display("Ring size {size} must be a power of two and a multiple of the page size ({page_size})")]
	InvalidRingSize {
		size: u32,
		page_size: u32,
	},
	#[display("Timed run is only possible in 'probe' mode")]
	InvalidTimeMode,
	#[display("At least one producer is required")]
	NoProducers,
	#[display("Could not attach to any of {candidates:?}: {cause}")]
	AttachFailed {
		candidates: Vec<String>,
		cause: String,
	},
	#[display("Accounting mismatch: {triggered} triggered, {delivered} delivered, {dropped} dropped")]
	AccountingMismatch {
		triggered: u64,
		delivered: u64,
		dropped: u64,
	},

	// -- Externals
	//
	#[from]
	Ring(execwatch_ring::Error),
	#[from]
	JoinError(JoinError),
	#[from]
	AyaEbpf(aya::EbpfError),
	#[from]
	AyaMaps(aya::maps::MapError),
	#[from]
	AyaProgram(aya::programs::ProgramError),
	#[from]
	Io(std::io::Error),
}

impl<T> From<SendError<T>> for Error {
	fn from(value: SendError<T>) -> Self {
		Self::EventSend(value.to_string())
	}
}

impl From<RecvError> for Error {
	fn from(err: RecvError) -> Self {
		Self::EventRecv(err)
	}
}

// region:    --- Error Boilerplate

impl std::error::Error for Error {}

// endregion: --- Error Boilerplate
