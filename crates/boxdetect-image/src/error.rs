/// An error type for the image module.
#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    /// Error when channel and shape are not valid.
    #[error("Data length ({0}) does not match the image size ({1})")]
    InvalidChannelShape(usize, usize),

    /// Error when two images are expected to have the same size.
    #[error("Image size ({0}x{1}) does not match the expected size ({2}x{3})")]
    InvalidImageSize(usize, usize, usize, usize),

    /// Error when the pixel coordinates are outside of the image.
    #[error("Pixel index ({0}, {1}) is out of bounds ({2}x{3})")]
    PixelIndexOutOfBounds(usize, usize, usize, usize),

    /// Error when the channel index is out of bounds.
    #[error("Channel index ({0}) is out of bounds ({1})")]
    ChannelIndexOutOfBounds(usize, usize),

    /// Error when the number of histogram bins is not supported.
    #[error("Invalid number of histogram bins ({0})")]
    InvalidHistogramBins(usize),

    /// Error when an operation needs at least one pixel.
    #[error("The image has no pixels")]
    EmptyImage,
}
