//! Registration worker: consumes the queue and processes one message at a
//! time.
//!
//! ## Processing Flow
//!
//! ```text
//! user_registration_queue → consumer → MessageProcessor → UserStore → Notifier → ack
//! ```

pub mod consumer;
pub mod processor;

pub use consumer::{run, PREFETCH_COUNT};
pub use processor::{Acknowledger, MessageOutcome, MessageProcessor};
