//! Core module tests
//!
//! Contains test suites for core functionality:
//! - Binding type and serialization tests
//! - Layout row and modifier signature parsing tests
//! - Translation algebra tests
//! - Reconciler tie-break tests
//! - Remap engine pass tests (plan, apply, revert)

#[cfg(test)]
mod reconciler_tests;
