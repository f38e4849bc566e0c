//! Shared fixtures for the integration tests.

#![allow(dead_code)]

pub mod builders;
pub mod fakes;
pub mod strategies;

pub use builders::*;
pub use fakes::*;
