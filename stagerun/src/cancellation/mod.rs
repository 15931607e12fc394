//! Cooperative cancellation of stage runs.

mod token;

pub use token::CancellationToken;
