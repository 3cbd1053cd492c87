//! Service layer for business logic and orchestration.
//!
//! This module contains the calculation engines that sit between the
//! repository layer and the HTTP handlers, plus the guest-session store.
//! Services orchestrate repository calls and implement the reimbursement
//! business rules.

pub mod guest_sessions;

pub mod scenario;

pub mod valuation;

#[cfg(test)]
#[path = "valuation_tests.rs"]
mod valuation_tests;

#[cfg(test)]
#[path = "scenario_tests.rs"]
mod scenario_tests;

pub use guest_sessions::{spawn_expiry_sweep, GuestSessionStore};
pub use scenario::{calculate_scenario, get_scenario_comparison};
pub use valuation::{calculate_valuation, get_valuation_summary};
