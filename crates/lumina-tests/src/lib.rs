//! Integration tests for the Lumina cost allocation engine.
//!
//! Empty on purpose — see `tests/integration.rs` for the black-box scenario
//! suite that exercises the public `lumina-pricing` API end-to-end.
