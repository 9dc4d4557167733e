//! # secureapp-core — Domain Types for SecureApp
//!
//! Pure, synchronous building blocks shared by the API service and the
//! external catalog client. Nothing in this crate performs I/O.
//!
//! ## Modules
//!
//! - [`product`] — the `Product` record, its validation rules, and the seed
//!   catalog served by the API.
//! - [`role`] — `Role` and `RoleSet`, the authorities attached to a session.
//! - [`claims`] — identity claims from the single sign-on exchange and the
//!   role mapper that turns them into a `RoleSet`.
//! - [`policy`] — the ordered path rule table and the gate that evaluates it.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `secureapp-*` crates.
//! - No `.unwrap()` outside tests.
//! - Role derivation and policy evaluation are pure functions: identical
//!   inputs always produce identical outputs.

pub mod claims;
pub mod error;
pub mod policy;
pub mod product;
pub mod role;

pub use claims::{map_roles, IdentityClaims, GROUPS_CLAIM};
pub use error::ValidationError;
pub use policy::{AccessPolicy, AccessRule, Decision, PathPattern, Requirement};
pub use product::{Catalog, Product};
pub use role::{Role, RoleSet};
