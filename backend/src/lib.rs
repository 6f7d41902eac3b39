//! SCIM user provisioning backend.
//!
//! - [`domain`]: users, collection reconciliation, patches, query
//!   translation and the provisioning service.
//! - [`outbound`]: the PostgreSQL user store.
//! - [`config`]: provider settings.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

pub mod config;
pub mod domain;
pub mod outbound;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
