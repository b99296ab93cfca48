//! Global budget tests
