//! Local File Scanner (spec 4.A) and Hasher/Loader (spec 4.B).
//!
//! Both components are pure filesystem work with no network dependency:
//! a recursive walk collecting into a sorted `Vec`, `anyhow::Context` on
//! every I/O boundary, generalized from "find workspace member
//! manifests" to "find site files".

mod load;
mod scan;

pub use load::{load, ReadError};
pub use scan::{scan, IgnoreMatcher, NoopMatcher, ScanResult};
