//! One-shot teardown latch shared by synchronous and asynchronous disposal.

use std::sync::atomic::{AtomicU8, Ordering};

bitflags::bitflags! {
	/// Disposal paths that have been entered.
	#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
	pub struct DisposalState: u8 {
		/// `dispose` was called.
		const SYNC = 1 << 0;
		/// `dispose_async` was called.
		const ASYNC = 1 << 1;
		/// Teardown ran.
		const COMMON = 1 << 2;
	}
}

/// Atomic set of [`DisposalState`] flags.
#[derive(Debug, Default)]
pub struct DisposalLatch {
	state: AtomicU8,
}

impl DisposalLatch {
	pub const fn new() -> Self {
		Self {
			state: AtomicU8::new(0),
		}
	}

	/// Sets `flag` and reports whether this call was the one to set it.
	pub fn try_acquire(&self, flag: DisposalState) -> bool {
		let prev = self.state.fetch_or(flag.bits(), Ordering::AcqRel);
		prev & flag.bits() == 0
	}

	pub fn state(&self) -> DisposalState {
		DisposalState::from_bits_truncate(self.state.load(Ordering::Acquire))
	}

	/// Whether any disposal path has been entered.
	pub fn is_disposed(&self) -> bool {
		!self.state().is_empty()
	}
}
