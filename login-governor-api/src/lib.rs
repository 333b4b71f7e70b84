//! # login-governor-api
//!
//! Shared API types for the login-governor service.
//! This crate is designed to be WASM-compatible and can be used in both
//! backend (Rust) and frontend (WASM/TypeScript via wasm-bindgen) applications.
//!
//! ## Features
//!
//! - Request DTOs (`LoginRequest`)
//! - Response DTOs (`LoginResponse`, `UserResponse`, `LockoutInfo`)
//! - Error response format (`ErrorResponse`)
//! - Generic response wrapper (`AppResponse`)
//! - Account partitioning (`UserType`)
//!
//! ## Example
//!
//! ```rust
//! use login_governor_api::LoginRequest;
//!
//! let request: LoginRequest = serde_json::from_str(
//!     r#"{"member_id":"M-0042","password":"secret"}"#,
//! ).unwrap();
//! assert_eq!(request.member_id.as_deref(), Some("M-0042"));
//! assert!(request.email.is_none());
//! ```

pub mod error;
pub mod requests;
pub mod responses;
pub mod result;
pub mod user_type;

// Re-exports for convenient access
pub use error::ErrorResponse;
pub use requests::*;
pub use responses::*;
pub use result::{AppResponse, StatusCode};
pub use user_type::UserType;
