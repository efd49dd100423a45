//! Unit tests for apiprobe configuration.
//!
//! This module contains tests organised into:
//! - [`helpers`] - Shared fixtures and helper functions
//! - [`types_tests`] - Type and serialisation tests
//! - [`validation`] - `HttpConfig` validation tests
//! - [`properties_tests`] - `.properties` parsing tests
//! - [`layer_precedence_tests`] - `MergeComposer` layer precedence tests
