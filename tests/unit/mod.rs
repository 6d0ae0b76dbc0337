//! Unit tests - exercise one component at a time against an in-process
//! registry, no external services.

mod fixtures;

mod binder_tests;
mod registry_tests;
mod scope_tests;
