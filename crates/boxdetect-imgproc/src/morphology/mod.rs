/// Error types used for kernel generation and morphological operations.
pub mod error;
pub use error::MorphologyError;

/// Kernel (structuring element) definitions.
pub mod kernels;
pub use kernels::{frame_kernel, solid_kernel, Kernel, KernelShape, Orientation, Segment};

/// Generation of kernel banks.
pub mod bank;
pub use bank::{generate_line_bank, generate_rect_bank, KernelBank, RectBankConfig};

/// Erosion, dilation and their compositions.
pub mod ops;
pub use ops::{
    check_kernel_fits, close, dilate, erode, morphology, morphology_ex, open, MorphOp, Primitive,
};

/// Applying a whole kernel bank and merging the responses.
pub mod merge;
pub use merge::{
    enhance_image, enhance_image_with_order, merge_transformations, AccumulatorWidth,
    EnhanceOrder, MergeOptions,
};
