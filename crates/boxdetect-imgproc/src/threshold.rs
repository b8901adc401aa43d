use num_traits::Zero;

use boxdetect_image::{Image, ImageError};

use crate::debug::{self, DebugHook};
use crate::histogram::compute_histogram;
use crate::parallel;

/// The type of thresholding to apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdType {
    /// Binary thresholding
    Binary,
    /// Inverse binary thresholding
    BinaryInv,
}

fn check_same_size<T, const C: usize, U, const D: usize>(
    src: &Image<T, C>,
    dst: &Image<U, D>,
) -> Result<(), ImageError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            src.cols(),
            src.rows(),
            dst.cols(),
            dst.rows(),
        ));
    }
    Ok(())
}

/// Apply a binary threshold to an image.
///
/// # Arguments
///
/// * `src` - The input image of an arbitrary number of channels and type.
/// * `dst` - The output image of an arbitrary number of channels and type.
/// * `threshold` - The threshold value. Must be the same type as the image.
/// * `max_value` - The maximum value to use when the input value is greater than the threshold.
///
/// # Examples
///
/// ```
/// use boxdetect_image::{Image, ImageSize};
/// use boxdetect_imgproc::threshold::threshold_binary;
///
/// let data = vec![100u8, 200, 50, 150, 200, 250];
/// let image = Image::<_, 1>::new(ImageSize { width: 2, height: 3 }, data).unwrap();
///
/// let mut thresholded = Image::<_, 1>::from_size_val(image.size(), 0).unwrap();
///
/// threshold_binary(&image, &mut thresholded, 100, 255).unwrap();
/// assert_eq!(thresholded.as_slice(), &[0, 255, 0, 255, 255, 255]);
/// ```
pub fn threshold_binary<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    threshold: T,
    max_value: T,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync + PartialOrd + Zero,
{
    check_same_size(src, dst)?;

    // run the thresholding operation in parallel
    parallel::par_iter_rows_val(src, dst, |src_pixel, dst_pixel| {
        *dst_pixel = if *src_pixel > threshold {
            max_value
        } else {
            T::zero()
        };
    });

    Ok(())
}

/// Apply an inverse binary threshold to an image.
///
/// Pixels greater than `threshold` become zero, all others become `max_value`.
///
/// # Examples
///
/// ```
/// use boxdetect_image::{Image, ImageSize};
/// use boxdetect_imgproc::threshold::threshold_binary_inverse;
///
/// let data = vec![100u8, 200, 50, 150, 200, 250];
/// let image = Image::<_, 1>::new(ImageSize { width: 2, height: 3 }, data).unwrap();
///
/// let mut thresholded = Image::<_, 1>::from_size_val(image.size(), 0).unwrap();
///
/// threshold_binary_inverse(&image, &mut thresholded, 100, 255).unwrap();
/// assert_eq!(thresholded.as_slice(), &[255, 0, 255, 0, 0, 0]);
/// ```
pub fn threshold_binary_inverse<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    threshold: T,
    max_value: T,
) -> Result<(), ImageError>
where
    T: Copy + Send + Sync + PartialOrd + Zero,
{
    check_same_size(src, dst)?;

    parallel::par_iter_rows_val(src, dst, |src_pixel, dst_pixel| {
        *dst_pixel = if *src_pixel > threshold {
            T::zero()
        } else {
            max_value
        };
    });

    Ok(())
}

fn apply_threshold(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    level: u8,
    thres_type: ThresholdType,
    max_value: u8,
) -> Result<(), ImageError> {
    match thres_type {
        ThresholdType::Binary => threshold_binary(src, dst, level, max_value),
        ThresholdType::BinaryInv => threshold_binary_inverse(src, dst, level, max_value),
    }
}

/// Compute Otsu's threshold level.
///
/// The level maximizes the between-class variance of the two classes `<= level`
/// and `> level`, which is the same as minimizing the intra-class variance.
///
/// # Errors
///
/// Returns [`ImageError::EmptyImage`] if the image has no pixels.
pub fn otsu_level(src: &Image<u8, 1>) -> Result<u8, ImageError> {
    if src.is_empty() {
        return Err(ImageError::EmptyImage);
    }

    let mut histogram = [0usize; 256];
    compute_histogram(src, &mut histogram, 256)?;

    let total_pixels = src.as_slice().len() as f64;
    let sum_total: f64 = histogram
        .iter()
        .enumerate()
        .map(|(i, &count)| i as f64 * count as f64)
        .sum();

    let mut best_variance = 0.0;
    let mut best_threshold = 0u8;

    let mut weight_back = 0.0;
    let mut sum_back = 0.0;

    for (level, &count) in (0u8..=255).zip(histogram.iter()) {
        weight_back += count as f64;
        sum_back += level as f64 * count as f64;

        // skip empty classes
        if weight_back == 0.0 || weight_back == total_pixels {
            continue;
        }

        let weight_fore = total_pixels - weight_back;
        let mean_back = sum_back / weight_back;
        let mean_fore = (sum_total - sum_back) / weight_fore;

        let variance = weight_back * weight_fore * (mean_back - mean_fore).powi(2);
        if variance > best_variance {
            best_variance = variance;
            best_threshold = level;
        }
    }

    Ok(best_threshold)
}

/// Apply Otsu's thresholding to an image.
///
/// # Arguments
///
/// * `src` - The input grayscale image.
/// * `dst` - The output image.
/// * `thres_type` - The type of thresholding to apply.
/// * `max_value` - The value assigned to the selected class.
///
/// # Returns
///
/// The threshold level that was applied.
///
/// # Examples
///
/// ```
/// use boxdetect_image::{Image, ImageSize};
/// use boxdetect_imgproc::threshold::{otsu_threshold, ThresholdType};
///
/// let data = vec![100u8, 200, 50, 150, 200, 250];
/// let image = Image::<_, 1>::new(ImageSize { width: 2, height: 3 }, data).unwrap();
///
/// let mut thresholded = Image::<_, 1>::from_size_val(image.size(), 0).unwrap();
///
/// let level = otsu_threshold(&image, &mut thresholded, ThresholdType::Binary, 255).unwrap();
///
/// assert_eq!(level, 100);
/// assert_eq!(thresholded.as_slice(), [0, 255, 0, 255, 255, 255]);
/// ```
pub fn otsu_threshold(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    thres_type: ThresholdType,
    max_value: u8,
) -> Result<u8, ImageError> {
    check_same_size(src, dst)?;
    let level = otsu_level(src)?;
    apply_threshold(src, dst, level, thres_type, max_value)?;
    Ok(level)
}

/// Compute the arithmetic mean intensity of an image.
///
/// # Errors
///
/// Returns [`ImageError::EmptyImage`] if the image has no pixels.
pub fn mean_intensity<const C: usize>(src: &Image<u8, C>) -> Result<f64, ImageError> {
    if src.is_empty() {
        return Err(ImageError::EmptyImage);
    }
    let sum: u64 = src.as_slice().iter().map(|&v| v as u64).sum();
    Ok(sum as f64 / src.as_slice().len() as f64)
}

/// Threshold an image at its mean intensity.
///
/// The fractional part of the mean is dropped, so with [`ThresholdType::BinaryInv`]
/// the selected pixels are those with `value <= floor(mean)`, i.e. the pixels
/// strictly darker than the mean.
///
/// # Returns
///
/// The threshold level that was applied.
pub fn mean_threshold(
    src: &Image<u8, 1>,
    dst: &mut Image<u8, 1>,
    thres_type: ThresholdType,
    max_value: u8,
) -> Result<u8, ImageError> {
    check_same_size(src, dst)?;
    let level = mean_intensity(src)?.floor() as u8;
    apply_threshold(src, dst, level, thres_type, max_value)?;
    Ok(level)
}

/// Binarize a grayscale image by combining Otsu's and the mean threshold.
///
/// Both thresholds are applied with inverted polarity, so dark pixels become
/// foreground. A pixel is 255 in the output when either threshold selects it,
/// 0 otherwise; the output never holds any other value.
///
/// # Arguments
///
/// * `src` - The input grayscale image.
/// * `dst` - The output binary mask.
///
/// # Errors
///
/// Returns an error if the sizes differ or the image is empty.
///
/// # Examples
///
/// ```
/// use boxdetect_image::{Image, ImageSize};
/// use boxdetect_imgproc::threshold::adaptive_threshold;
///
/// let data = vec![100u8, 200, 50, 150, 200, 250];
/// let image = Image::<_, 1>::new(ImageSize { width: 2, height: 3 }, data).unwrap();
/// let mut mask = Image::<_, 1>::from_size_val(image.size(), 0).unwrap();
///
/// adaptive_threshold(&image, &mut mask).unwrap();
/// assert_eq!(mask.as_slice(), &[255, 0, 255, 255, 0, 0]);
/// ```
pub fn adaptive_threshold(src: &Image<u8, 1>, dst: &mut Image<u8, 1>) -> Result<(), ImageError> {
    check_same_size(src, dst)?;

    let mut otsu = Image::<u8, 1>::from_size_val(src.size(), 0)?;
    let otsu_level = otsu_threshold(src, &mut otsu, ThresholdType::BinaryInv, 255)?;

    let mut below_mean = Image::<u8, 1>::from_size_val(src.size(), 0)?;
    let mean_level = mean_threshold(src, &mut below_mean, ThresholdType::BinaryInv, 255)?;

    log::debug!("adaptive threshold: otsu level {otsu_level}, mean level {mean_level}");

    // both masks may select the same pixel, so saturate the union to 255
    parallel::par_iter_rows_val_two(&otsu, &below_mean, dst, |a, b, out| {
        *out = if *a > 0 || *b > 0 { 255 } else { 0 };
    });

    Ok(())
}

/// [`adaptive_threshold`] returning a new image.
pub fn adaptive_threshold_image(src: &Image<u8, 1>) -> Result<Image<u8, 1>, ImageError> {
    adaptive_threshold_with_debug(src, None)
}

/// [`adaptive_threshold_image`] with an optional debug hook receiving the mask.
pub fn adaptive_threshold_with_debug(
    src: &Image<u8, 1>,
    hook: Option<DebugHook<'_>>,
) -> Result<Image<u8, 1>, ImageError> {
    let mut dst = Image::<u8, 1>::from_size_val(src.size(), 0)?;
    adaptive_threshold(src, &mut dst)?;
    debug::emit(hook, "thresholded image", &dst);
    Ok(dst)
}
