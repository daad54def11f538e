use std::{
	slice,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
};

use derive_more::Display;
use tracing::{debug, trace};

use crate::{Error, Result};

pub const HEADER_SIZE: usize = 8;
pub const RECORD_ALIGN: usize = 8;
pub const MIN_CAPACITY: usize = 2 * RECORD_ALIGN;
pub const MAX_CAPACITY: usize = 1 << 30;

// Header word: | PRESENT (32) | BUSY (31) | DISCARD (30) | len (0..30) |
// A zero word means the region was claimed but its header is not written yet.
const PRESENT_BIT: u64 = 1 << 32;
const BUSY_BIT: u64 = 1 << 31;
const DISCARD_BIT: u64 = 1 << 30;
const LEN_MASK: u64 = DISCARD_BIT - 1;

/// Bytes a record with `payload` bytes occupies in the ring, header included.
pub const fn record_size(payload: usize) -> usize {
	(HEADER_SIZE + payload + RECORD_ALIGN - 1) & !(RECORD_ALIGN - 1)
}

/// The only reservation failure. Expected under load, handled by dropping.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq)]
#[display("ring buffer full")]
pub struct Full;

impl std::error::Error for Full {}

/// Byte accounting of the ring at one instant.
///
/// `free + reserved + committed + reclaimable == capacity` always holds.
/// `reclaimable` covers discarded and wrap padding records that become free
/// once the consumer cursor moves past them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
	pub capacity: usize,
	pub free: usize,
	pub reserved: usize,
	pub committed: usize,
	pub reclaimable: usize,
}

struct Shared {
	words: Box<[AtomicU64]>,
	capacity: u64,
	producer_pos: AtomicU64,
	consumer_pos: AtomicU64,
	dropped: AtomicU64,
}

impl Shared {
	fn word_index(&self, pos: u64) -> usize {
		((pos % self.capacity) / RECORD_ALIGN as u64) as usize
	}

	fn header(&self, pos: u64) -> &AtomicU64 {
		&self.words[self.word_index(pos)]
	}

	fn payload_ptr(&self, pos: u64) -> *mut u8 {
		// SAFETY: the header word is in bounds and a record never straddles the
		// end of the buffer, so its payload fits in the words that follow.
		// Writes go through the atomics' UnsafeCell.
		unsafe { self.words.as_ptr().add(self.word_index(pos) + 1) as *mut u8 }
	}

	fn reserve(&self, size: usize) -> core::result::Result<u64, Full> {
		let len = size as u64;
		let total = record_size(size) as u64;
		if len > LEN_MASK || total > self.capacity {
			return Err(Full);
		}

		let mut prod = self.producer_pos.load(Ordering::Acquire);
		let (start, pad) = loop {
			let cons = self.consumer_pos.load(Ordering::Acquire);
			let offset = prod % self.capacity;
			let pad = if offset + total > self.capacity {
				self.capacity - offset
			} else {
				0
			};
			let next = prod + pad + total;

			// a stale `prod` only makes this check looser, the CAS catches it
			if next.saturating_sub(cons) > self.capacity {
				// Claim the tail on its own so the next attempt starts at offset 0.
				// A record longer than its own offset could never wrap otherwise.
				if pad > 0 && (prod + pad).saturating_sub(cons) <= self.capacity {
					match self.producer_pos.compare_exchange_weak(
						prod,
						prod + pad,
						Ordering::AcqRel,
						Ordering::Acquire,
					) {
						Ok(_) => self.store_padding(prod, pad),
						Err(actual) => {
							prod = actual;
							continue;
						}
					}
				}
				return Err(Full);
			}

			match self
				.producer_pos
				.compare_exchange_weak(prod, next, Ordering::AcqRel, Ordering::Acquire)
			{
				Ok(_) => break (prod + pad, pad),
				Err(actual) => prod = actual,
			}
		};

		if pad > 0 {
			self.store_padding(prod, pad);
		}
		self.header(start).store(PRESENT_BIT | BUSY_BIT | len, Ordering::Release);

		Ok(start)
	}

	fn store_padding(&self, pos: u64, pad: u64) {
		let pad_len = pad - HEADER_SIZE as u64;
		self.header(pos)
			.store(PRESENT_BIT | DISCARD_BIT | pad_len, Ordering::Release);
	}

	fn finish(&self, pos: u64, len: usize, discard: bool) {
		let flags = if discard { PRESENT_BIT | DISCARD_BIT } else { PRESENT_BIT };
		self.header(pos).store(flags | len as u64, Ordering::Release);
	}

	/// Zero the consumed record and publish the new consumer cursor.
	fn release(&self, pos: u64, total: u64) {
		let first = self.word_index(pos);
		let count = (total / RECORD_ALIGN as u64) as usize;
		for word in &self.words[first..first + count] {
			word.store(0, Ordering::Relaxed);
		}
		self.consumer_pos.store(pos + total, Ordering::Release);
	}
}

/// Create a ring of `capacity` bytes and split it into its two ends.
///
/// `capacity` must be a multiple of 8 between `MIN_CAPACITY` and
/// `MAX_CAPACITY`. It does not have to be a power of two.
pub fn new_ring(capacity: usize) -> Result<(Producer, Consumer)> {
	if capacity < MIN_CAPACITY || capacity % RECORD_ALIGN != 0 {
		return Err(Error::InvalidCapacity { capacity });
	}
	if capacity > MAX_CAPACITY {
		return Err(Error::CapacityTooLarge {
			capacity,
			max: MAX_CAPACITY,
		});
	}

	let words = (0..capacity / RECORD_ALIGN).map(|_| AtomicU64::new(0)).collect();
	let shared = Arc::new(Shared {
		words,
		capacity: capacity as u64,
		producer_pos: AtomicU64::new(0),
		consumer_pos: AtomicU64::new(0),
		dropped: AtomicU64::new(0),
	});
	debug!(capacity, "ring buffer created");

	Ok((
		Producer {
			shared: shared.clone(),
		},
		Consumer { shared },
	))
}

// region:    --- Producer

/// Writer end. Cheap to clone, one per simulated CPU is fine.
///
/// Nothing on this side allocates, sleeps or takes a lock.
#[derive(Clone)]
pub struct Producer {
	shared: Arc<Shared>,
}

impl Producer {
	/// Claim `size` contiguous bytes, or fail immediately.
	pub fn reserve(&self, size: usize) -> core::result::Result<Slot<'_>, Full> {
		let pos = self.shared.reserve(size)?;
		Ok(Slot {
			shared: &self.shared,
			pos,
			len: size,
			done: false,
		})
	}

	/// Count one event lost to a failed reservation.
	pub fn note_drop(&self) {
		self.shared.dropped.fetch_add(1, Ordering::Relaxed);
	}

	pub fn dropped(&self) -> u64 {
		self.shared.dropped.load(Ordering::Relaxed)
	}
}

/// Exclusively owned region between `reserve` and `commit`/`discard`.
///
/// Dropping a slot without finishing it discards it, so an aborted producer
/// never leaves a busy record blocking the consumer.
pub struct Slot<'a> {
	shared: &'a Shared,
	pos: u64,
	len: usize,
	done: bool,
}

impl Slot<'_> {
	pub fn len(&self) -> usize {
		self.len
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub fn as_mut_slice(&mut self) -> &mut [u8] {
		// SAFETY: the region [pos + HEADER_SIZE, pos + HEADER_SIZE + len) is owned by
		// this slot until commit/discard, no other producer overlaps it and the
		// consumer does not read it while the header is busy.
		unsafe { slice::from_raw_parts_mut(self.shared.payload_ptr(self.pos), self.len) }
	}

	/// Publish the record. Everything written before this is visible to the
	/// consumer once it observes the record.
	pub fn commit(mut self) {
		self.done = true;
		self.shared.finish(self.pos, self.len, false);
	}

	/// Give the region back without exposing any data.
	pub fn discard(mut self) {
		self.done = true;
		self.shared.finish(self.pos, self.len, true);
	}
}

impl Drop for Slot<'_> {
	fn drop(&mut self) {
		if !self.done {
			self.shared.finish(self.pos, self.len, true);
		}
	}
}

// endregion: --- Producer

// region:    --- Consumer

/// Reader end. There is exactly one.
pub struct Consumer {
	shared: Arc<Shared>,
}

impl Consumer {
	/// Committed records in reservation order, up to what was published when
	/// the call was made. Stops early at a record still being written.
	///
	/// Each yielded record is already released back to the producers.
	pub fn drain(&mut self) -> Drain<'_> {
		let limit = self.shared.producer_pos.load(Ordering::Acquire);
		Drain {
			shared: &self.shared,
			limit,
			done: false,
		}
	}

	pub fn occupancy(&self) -> Occupancy {
		let shared = &*self.shared;
		let prod = shared.producer_pos.load(Ordering::Acquire);
		let mut pos = shared.consumer_pos.load(Ordering::Acquire);

		let (mut reserved, mut committed, mut reclaimable) = (0u64, 0u64, 0u64);
		while pos < prod {
			let header = shared.header(pos).load(Ordering::Acquire);
			if header & PRESENT_BIT == 0 {
				// claimed, header not out yet
				reserved += prod - pos;
				break;
			}

			let total = record_size((header & LEN_MASK) as usize) as u64;
			if header & BUSY_BIT != 0 {
				reserved += total;
			} else if header & DISCARD_BIT != 0 {
				reclaimable += total;
			} else {
				committed += total;
			}
			pos += total;
		}

		let used = reserved + committed + reclaimable;
		Occupancy {
			capacity: shared.capacity as usize,
			free: shared.capacity.saturating_sub(used) as usize,
			reserved: reserved as usize,
			committed: committed as usize,
			reclaimable: reclaimable as usize,
		}
	}

	pub fn dropped(&self) -> u64 {
		self.shared.dropped.load(Ordering::Relaxed)
	}

	pub fn capacity(&self) -> usize {
		self.shared.capacity as usize
	}
}

pub struct Drain<'a> {
	shared: &'a Shared,
	limit: u64,
	done: bool,
}

impl Iterator for Drain<'_> {
	type Item = Vec<u8>;

	fn next(&mut self) -> Option<Vec<u8>> {
		while !self.done {
			let pos = self.shared.consumer_pos.load(Ordering::Relaxed);
			if pos >= self.limit {
				break;
			}

			let header = self.shared.header(pos).load(Ordering::Acquire);
			if header & PRESENT_BIT == 0 || header & BUSY_BIT != 0 {
				trace!(pos, "drain blocked on in-flight record");
				break;
			}

			let len = (header & LEN_MASK) as usize;
			let record = (header & DISCARD_BIT == 0).then(|| {
				// SAFETY: committed header observed with acquire, the producer is done
				// with the payload and nobody else writes it until it is released.
				unsafe { slice::from_raw_parts(self.shared.payload_ptr(pos), len) }.to_vec()
			});
			self.shared.release(pos, record_size(len) as u64);

			if record.is_some() {
				return record;
			}
		}

		self.done = true;
		None
	}
}

impl std::iter::FusedIterator for Drain<'_> {}

// endregion: --- Consumer

// region:    --- Tests


// endregion: --- Tests
