//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM / Ctrl-C → wait_for_signal resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger() → every subscriber wakes
//!         → periodic health checks stop
//!         → admin server finishes in-flight requests
//!         → season watcher exits
//!     main flushes every repository and exits
//! ```
//!
//! # Design Decisions
//! - One coordinator shared by all long-running tasks
//! - Tasks that subscribe after the trigger still observe it

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::wait_for_signal;
