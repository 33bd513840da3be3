//! Git integration.
//!
//! A dedicated `std::thread` owns the `git2::Repository` (it is !Send) and
//! writes each render straight onto the shared surface.
pub mod rows;
pub mod types;
pub mod worker;
