#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// debug visualization hooks.
pub mod debug;

/// utilities to draw on images.
pub mod draw;

/// compute image histogram module.
pub mod histogram;

/// kernel banks, morphological operations and response merging.
pub mod morphology;

/// image padding module.
pub mod padding;

/// module containing parallization utilities.
pub mod parallel;

/// operations to threshold images.
pub mod threshold;
