//! Shared data structures for the gauge monitoring core
//!
//! - `equipment`: the machine → station → gauge hierarchy
//! - `gauge_type`: capability flags and defaults per gauge kind
//! - `reading`: the immutable observation record and its status encoding

mod equipment;
mod gauge_type;
mod reading;

pub use equipment::*;
pub use gauge_type::*;
pub use reading::*;
