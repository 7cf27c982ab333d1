//! Per-tablet, non-blocking mutual exclusion for structural operations.
mod guard;

pub use guard::TransitionError;
pub use guard::TransitionGuard;
pub use guard::TransitionToken;
