use boxdetect_image::{Image, ImageError, ImageSize};
use rayon::prelude::*;

/// Represents 2D padding with top, bottom, left, and right values (in pixels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Padding2D {
    /// Amount of padding to add on the top side.
    pub top: usize,
    /// Amount of padding to add on the bottom side.
    pub bottom: usize,
    /// Amount of padding to add on the left side.
    pub left: usize,
    /// Amount of padding to add on the right side.
    pub right: usize,
}

impl Padding2D {
    /// Size of an image of `size` once this padding is applied.
    pub fn padded_size(&self, size: ImageSize) -> ImageSize {
        ImageSize {
            width: size.width + self.left + self.right,
            height: size.height + self.top + self.bottom,
        }
    }

    /// Validates that a new image size correctly matches the expected dimensions
    /// after applying this padding to an existing image.
    ///
    /// # Example
    /// ```rust
    /// use boxdetect_image::ImageSize;
    /// use boxdetect_imgproc::padding::Padding2D;
    /// let padding = Padding2D { top: 1, bottom: 1, left: 2, right: 2 };
    /// let old_size = ImageSize { width: 4, height: 4 };
    /// let new_size = ImageSize { width: 8, height: 6 };
    ///
    /// assert!(padding.validate_size(old_size, new_size));
    /// ```
    pub fn validate_size(&self, old_size: ImageSize, new_size: ImageSize) -> bool {
        self.padded_size(old_size) == new_size
    }
}

/// Copies `src` into the center of `dst` and fills the border with a constant value.
///
/// # Arguments
///
/// * `src` - The source image to pad.
/// * `dst` - The destination image where the padded output will be stored.
/// * `padding` - The amount of padding (in pixels) for all four sides.
/// * `constant_value` - The pixel value used for the border, one value per channel.
///
/// # Errors
///
/// Returns an error if the size of `dst` does not match with the expected size
/// i.e. after applying `padding` on `src`.
///
/// # Example
///
/// ```rust
/// use boxdetect_image::{ImageSize, Image};
/// use boxdetect_imgproc::padding::{constant_padding, Padding2D};
///
/// let src = Image::<u8, 1>::new(ImageSize { width: 2, height: 1 }, vec![1, 2]).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val(ImageSize { width: 4, height: 3 }, 0).unwrap();
///
/// constant_padding(
///     &src,
///     &mut dst,
///     Padding2D { top: 1, bottom: 1, left: 1, right: 1 },
///     [9],
/// ).unwrap();
///
/// assert_eq!(dst.as_slice(), &[9, 9, 9, 9, 9, 1, 2, 9, 9, 9, 9, 9]);
/// ```
pub fn constant_padding<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    padding: Padding2D,
    constant_value: [T; C],
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync,
{
    if !padding.validate_size(src.size(), dst.size()) {
        let expected = padding.padded_size(src.size());
        return Err(ImageError::InvalidImageSize(
            dst.width(),
            dst.height(),
            expected.width,
            expected.height,
        ));
    }

    let src_stride = src.width() * C;
    let dst_stride = dst.width() * C;
    if dst_stride == 0 {
        return Ok(());
    }

    let top = padding.top;
    let left = padding.left * C;
    let src_data = src.as_slice();

    dst.as_slice_mut()
        .par_chunks_exact_mut(dst_stride)
        .enumerate()
        .for_each(|(y, dst_row)| {
            dst_row
                .chunks_exact_mut(C)
                .for_each(|px| px.copy_from_slice(&constant_value));

            if y < top || y >= top + src.height() || src_stride == 0 {
                return;
            }

            let src_y = y - top;
            let src_row = &src_data[src_y * src_stride..(src_y + 1) * src_stride];
            dst_row[left..left + src_stride].copy_from_slice(src_row);
        });

    Ok(())
}
