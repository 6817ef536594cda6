//! Output stage effects, applied by the engine to the mixed grain signal.

pub mod limiter;
