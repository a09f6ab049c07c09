//! Failed login accounting and brute-force rate limiting.
//!
//! Counts failed logins per `(origin, identifier)` in a resetting window and
//! decides whether the next attempt is allowed, allowed with a warning, or
//! blocked. All mutable state lives behind the [`AttemptStore`] port, so the
//! tracker itself is stateless and can run on any number of workers.

mod error;
mod ports;
mod service;


pub use error::RateLimitError;
pub use ports::AttemptStore;
pub use service::AttemptTracker;
