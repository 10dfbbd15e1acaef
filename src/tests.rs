//! Crate-level unit tests: the tick algorithm and the request handlers.

mod helpers;
