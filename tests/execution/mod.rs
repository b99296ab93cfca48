//! Plan execution tests

pub mod inputs;
