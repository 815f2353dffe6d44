//! Liveness and readiness checks
//!
//! - [`Registry`] - named checks evaluated on demand
//! - [`Checker`] - the check trait, with [`CheckFn`], [`ThresholdChecker`]
//!   and [`PeriodicChecker`] to compose policies
//! - [`MetaChecker`] - probe another service's `/-/ready`

mod checker;
mod registry;
mod remote;

pub use checker::{
    check_fn, periodic_threshold, CheckFn, Checker, PeriodicChecker, ThresholdChecker,
    PENDING_MESSAGE,
};
pub use registry::Registry;
pub use remote::MetaChecker;

#[cfg(test)]
#[path = "health_test.rs"]
mod tests;
