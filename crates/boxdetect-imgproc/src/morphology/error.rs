use boxdetect_image::{ImageError, ImageSize};

use crate::parallel::ParallelError;

/// Errors related to kernel generation and morphological operations.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum MorphologyError {
    /// A kernel or kernel bank was requested with an invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// The kernel does not fit inside the image.
    #[error("Kernel of size {kernel_height}x{kernel_width} exceeds the image size {image_size}")]
    DimensionMismatch {
        /// Height of the offending kernel.
        kernel_height: usize,
        /// Width of the offending kernel.
        kernel_width: usize,
        /// Size of the target image.
        image_size: ImageSize,
    },

    /// No accumulator type is wide enough to sum the responses of the whole bank.
    #[error("A bank of {0} kernels cannot be accumulated without overflow")]
    OverflowRisk(usize),

    /// Error related to the image containers.
    #[error(transparent)]
    ImageError(#[from] ImageError),

    /// Error related to parallel execution.
    #[error(transparent)]
    ParallelError(#[from] ParallelError),
}
