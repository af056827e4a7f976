//! Binary command implementations

pub mod sync;
