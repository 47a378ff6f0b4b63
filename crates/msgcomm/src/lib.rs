//! Point-to-point TCP messaging between threads of different processes.
//!
//! # Crate Structure
//!
//! - [`channel`]: zero-terminated framing and the blocking connection handle
//! - [`queue`]: ownership-transferring FIFO shared with worker threads
//! - [`worker`]: start/stop lifecycle for a loop on its own thread
//! - [`actor`]: sender and receiver workers (behind `actor` feature)
//! - [`grammar`]: tagged text messages used by the demo actors

/// Re-export channel types.
pub mod channel {
    pub use msgcomm_channel::*;
}

/// Re-export queue types.
pub mod queue {
    pub use msgcomm_queue::*;
}

/// Re-export worker lifecycle types.
pub mod worker {
    pub use msgcomm_worker::*;
}

/// Re-export message worker types (requires `actor` feature).
#[cfg(feature = "actor")]
pub mod actor {
    pub use msgcomm_actor::*;
}

pub mod grammar;
