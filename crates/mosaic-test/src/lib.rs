//! mosaic-test - Regression test harness for mosaic
//!
//! Integration tests record a sequence of numbered comparisons in a
//! [`RegParams`] and assert on [`RegParams::cleanup`] at the end, which
//! prints every failure instead of stopping at the first one.
//!
//! # Usage
//!
//! ```ignore
//! use mosaic_test::RegParams;
//!
//! let mut rp = RegParams::new("cache");
//! rp.compare_values(4.0, count as f64, 0.0);
//! assert!(rp.cleanup());
//! ```
//!
//! # Environment Variables
//!
//! - `REGTEST_MODE`: `compare` (default) or `display`; display mode also
//!   prints every comparison that passed.

mod params;
mod rng;

pub use params::{RegParams, RegTestMode};
pub use rng::Lcg;
