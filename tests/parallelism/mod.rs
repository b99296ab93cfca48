//! Fan-out and join tests

pub mod fanout;
