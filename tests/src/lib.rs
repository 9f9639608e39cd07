//! # Circuit Desk Test Suite
//!
//! Cross-crate tests driving the full in-process runtime: main loop,
//! window pumps, controllers and renderer clients.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── round_trip.rs   # request → controller → <channel>-reply
//!     ├── broadcast.rs    # fan-out to every window, reply-only channels
//!     └── teardown.rs     # cancelled, late and expired requests
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p desk-tests
//! cargo test -p desk-tests integration::teardown::
//! ```

pub mod integration;
