//! Login attempt governor for the marketplace login portals.
//!
//! The lockout policy lives in [`auth::governor`]; the rest of the crate is
//! the HTTP service the customer, admin, member and logistic portals call.

pub mod app;
pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod handlers;
pub mod response;
pub mod store;
pub mod users;

pub use auth::governor::{
    AttemptRecord, FailedAttempt, GovernorError, LockoutPolicy, LoginAttemptGovernor,
};
pub use store::{AttemptStore, MemoryStore, StoreError};
