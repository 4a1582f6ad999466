//! Unit tests for record documents.
//!
//! These tests cover the accepted input shapes, the baseline and import
//! filters, and the output documents.

mod import_tests;
