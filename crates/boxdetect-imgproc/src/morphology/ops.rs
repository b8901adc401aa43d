use boxdetect_image::{Image, ImageError, ImageSize};
use num_traits::Bounded;
use rayon::prelude::*;

use super::error::MorphologyError;
use super::kernels::{Kernel, Orientation};
use crate::padding::{constant_padding, Padding2D};

/// The morphological operations that can be applied with a [`Kernel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MorphOp {
    /// Erosion: every pixel becomes the minimum of its neighborhood.
    Erode,
    /// Dilation: every pixel becomes the maximum of its neighborhood.
    Dilate,
    /// Opening: erosion followed by dilation.
    #[default]
    Open,
    /// Closing: dilation followed by erosion.
    Close,
}

/// The two elementary operations every [`MorphOp`] is built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    /// Minimum filter over the kernel.
    Erode,
    /// Maximum filter over the reflected kernel.
    Dilate,
}

impl MorphOp {
    /// The primitives applied, in order, to compute this operation.
    ///
    /// # Example
    ///
    /// ```rust
    /// use boxdetect_imgproc::morphology::{MorphOp, Primitive};
    ///
    /// assert_eq!(MorphOp::Open.primitives(), &[Primitive::Erode, Primitive::Dilate]);
    /// assert_eq!(MorphOp::Close.primitives(), &[Primitive::Dilate, Primitive::Erode]);
    /// ```
    pub fn primitives(self) -> &'static [Primitive] {
        match self {
            MorphOp::Erode => &[Primitive::Erode],
            MorphOp::Dilate => &[Primitive::Dilate],
            MorphOp::Open => &[Primitive::Erode, Primitive::Dilate],
            MorphOp::Close => &[Primitive::Dilate, Primitive::Erode],
        }
    }
}

impl Primitive {
    /// Apply the primitive from `src` into `dst`.
    pub fn apply<T, const C: usize>(
        self,
        src: &Image<T, C>,
        dst: &mut Image<T, C>,
        kernel: &Kernel,
    ) -> Result<(), MorphologyError>
    where
        T: Copy + Ord + Bounded + Send + Sync,
    {
        match self {
            Primitive::Erode => erode(src, dst, kernel),
            Primitive::Dilate => dilate(src, dst, kernel),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Rank {
    Min,
    Max,
}

impl Rank {
    fn identity<T: Bounded>(self) -> T {
        match self {
            Rank::Min => T::max_value(),
            Rank::Max => T::min_value(),
        }
    }

    #[inline]
    fn combine<T: Ord>(self, a: T, b: T) -> T {
        match self {
            Rank::Min => a.min(b),
            Rank::Max => a.max(b),
        }
    }
}

/// Check that `kernel` fits inside an image of the given size.
///
/// # Errors
///
/// Returns [`MorphologyError::DimensionMismatch`] if the kernel is taller or wider
/// than the image.
pub fn check_kernel_fits(kernel: &Kernel, size: ImageSize) -> Result<(), MorphologyError> {
    if kernel.height() > size.height || kernel.width() > size.width {
        return Err(MorphologyError::DimensionMismatch {
            kernel_height: kernel.height(),
            kernel_width: kernel.width(),
            image_size: size,
        });
    }
    Ok(())
}

fn check_same_size<T, const C: usize>(
    src: &Image<T, C>,
    dst: &Image<T, C>,
) -> Result<(), MorphologyError> {
    if src.size() != dst.size() {
        return Err(ImageError::InvalidImageSize(
            dst.width(),
            dst.height(),
            src.width(),
            src.height(),
        )
        .into());
    }
    Ok(())
}

/// Erode an image using a [`Kernel`].
///
/// Erosion shrinks bright regions in the image. Each pixel is replaced by the
/// minimum value in the neighborhood defined by the kernel placed at its anchor.
/// Neighbors outside the image are ignored.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image (will be overwritten).
/// * `kernel` - The morphological structuring element.
///
/// # Errors
///
/// Returns an error if the image sizes differ or the kernel does not fit in the image.
pub fn erode<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Bounded + Send + Sync,
{
    check_same_size(src, dst)?;
    check_kernel_fits(kernel, src.size())?;
    rank_filter(src, dst, kernel, kernel.anchor(), Rank::Min)
}

/// Dilate an image using a [`Kernel`].
///
/// Dilation expands bright regions in the image. Each pixel is replaced by the
/// maximum value in the neighborhood defined by the reflected kernel, which makes
/// [`open`] anti-extensive and [`close`] extensive. Neighbors outside the image are
/// ignored.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image (will be overwritten).
/// * `kernel` - The morphological structuring element.
///
/// # Errors
///
/// Returns an error if the image sizes differ or the kernel does not fit in the image.
pub fn dilate<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Bounded + Send + Sync,
{
    check_same_size(src, dst)?;
    check_kernel_fits(kernel, src.size())?;

    let (anchor_y, anchor_x) = kernel.anchor();
    let anchor = (kernel.height() - 1 - anchor_y, kernel.width() - 1 - anchor_x);
    rank_filter(src, dst, &kernel.reflect(), anchor, Rank::Max)
}

/// Opening: erosion followed by dilation.
///
/// Removes bright structures the kernel does not fit in.
pub fn open<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Bounded + Send + Sync,
{
    morphology_ex(src, dst, kernel, MorphOp::Open)
}

/// Closing: dilation followed by erosion.
///
/// Fills dark gaps the kernel does not fit in.
pub fn close<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Bounded + Send + Sync,
{
    morphology_ex(src, dst, kernel, MorphOp::Close)
}

/// Apply any [`MorphOp`] by chaining its primitives.
///
/// # Arguments
///
/// * `src` - The source image.
/// * `dst` - The destination image (will be overwritten).
/// * `kernel` - The morphological structuring element.
/// * `op` - The operation to apply.
///
/// # Example
///
/// ```rust
/// use boxdetect_image::{Image, ImageSize};
/// use boxdetect_imgproc::morphology::{morphology_ex, Kernel, KernelShape, MorphOp};
///
/// let size = ImageSize { width: 5, height: 1 };
/// let src = Image::<u8, 1>::new(size, vec![0, 255, 0, 255, 255]).unwrap();
/// let mut dst = Image::<u8, 1>::from_size_val(size, 0).unwrap();
///
/// let kernel = Kernel::new(KernelShape::Solid { width: 2, height: 1 }).unwrap();
/// morphology_ex(&src, &mut dst, &kernel, MorphOp::Open).unwrap();
///
/// assert_eq!(dst.as_slice(), &[0, 0, 0, 255, 255]);
/// ```
pub fn morphology_ex<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
    op: MorphOp,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Bounded + Send + Sync,
{
    check_same_size(src, dst)?;
    let result = morphology(src, kernel, op)?;
    dst.as_slice_mut().copy_from_slice(result.as_slice());
    Ok(())
}

/// Apply a [`MorphOp`] and return the result as a new image.
pub fn morphology<T, const C: usize>(
    src: &Image<T, C>,
    kernel: &Kernel,
    op: MorphOp,
) -> Result<Image<T, C>, MorphologyError>
where
    T: Copy + Ord + Bounded + Send + Sync,
{
    let mut current: Option<Image<T, C>> = None;
    for primitive in op.primitives() {
        let input = current.as_ref().unwrap_or(src);
        let mut output = input.clone();
        primitive.apply(input, &mut output, kernel)?;
        current = Some(output);
    }

    // every operation has at least one primitive
    Ok(current.unwrap_or_else(|| src.clone()))
}

/// Sliding window min/max (van Herk / Gil-Werman).
///
/// `out[i]` receives the combination of `input[i..i + len]`; positions where the
/// window does not fit receive `identity`.
fn sliding_window<T: Copy + Ord>(input: &[T], len: usize, out: &mut [T], rank: Rank, identity: T) {
    let n = input.len();
    if n == 0 {
        return;
    }
    if len <= 1 {
        out.copy_from_slice(input);
        return;
    }

    let mut prefix = input.to_vec();
    let mut suffix = input.to_vec();
    for i in 1..n {
        if i % len != 0 {
            prefix[i] = rank.combine(prefix[i - 1], input[i]);
        }
    }
    for i in (0..n - 1).rev() {
        if (i + 1) % len != 0 {
            suffix[i] = rank.combine(suffix[i + 1], input[i]);
        }
    }

    for (i, o) in out.iter_mut().enumerate() {
        *o = if i + len <= n {
            rank.combine(suffix[i], prefix[i + len - 1])
        } else {
            identity
        };
    }
}

/// Per-position min/max along lines of `len` elements of the padded image.
fn line_table<T, const C: usize>(
    padded: &Image<T, C>,
    orientation: Orientation,
    len: usize,
    rank: Rank,
) -> Vec<T>
where
    T: Copy + Ord + Bounded + Send + Sync,
{
    let identity = rank.identity::<T>();
    let (width, height) = (padded.width(), padded.height());
    let src = padded.as_slice();
    let mut out = vec![identity; src.len()];

    match orientation {
        Orientation::Horizontal => {
            out.par_chunks_exact_mut(width * C)
                .zip(src.par_chunks_exact(width * C))
                .for_each(|(out_row, src_row)| {
                    let mut line = Vec::with_capacity(width);
                    let mut res = vec![identity; width];
                    for c in 0..C {
                        line.clear();
                        line.extend(src_row.iter().skip(c).step_by(C).copied());
                        sliding_window(&line, len, &mut res, rank, identity);
                        for (x, v) in res.iter().enumerate() {
                            out_row[x * C + c] = *v;
                        }
                    }
                });
        }
        Orientation::Vertical => {
            let columns: Vec<Vec<T>> = (0..width * C)
                .into_par_iter()
                .map(|col| {
                    let line: Vec<T> = (0..height).map(|y| src[y * width * C + col]).collect();
                    let mut res = vec![identity; height];
                    sliding_window(&line, len, &mut res, rank, identity);
                    res
                })
                .collect();

            for (col, column) in columns.iter().enumerate() {
                for (y, v) in column.iter().enumerate() {
                    out[y * width * C + col] = *v;
                }
            }
        }
    }

    out
}

/// Min/max filter over the active elements of `kernel` placed at `anchor`.
fn rank_filter<T, const C: usize>(
    src: &Image<T, C>,
    dst: &mut Image<T, C>,
    kernel: &Kernel,
    anchor: (usize, usize),
    rank: Rank,
) -> Result<(), MorphologyError>
where
    T: Copy + Ord + Bounded + Send + Sync,
{
    let identity = rank.identity::<T>();
    let (anchor_y, anchor_x) = anchor;

    // out-of-image neighbors never win the min/max
    let padding = Padding2D {
        top: anchor_y,
        bottom: kernel.height() - 1 - anchor_y,
        left: anchor_x,
        right: kernel.width() - 1 - anchor_x,
    };
    let mut padded = Image::<T, C>::from_size_val(padding.padded_size(src.size()), identity)?;
    constant_padding(src, &mut padded, padding, [identity; C])?;

    let mut tables: Vec<(Orientation, usize, Vec<T>)> = Vec::new();
    let mut lookups = Vec::new();
    for segment in kernel.segments() {
        let pos = tables
            .iter()
            .position(|(o, l, _)| *o == segment.orientation && *l == segment.len);
        let table_idx = match pos {
            Some(idx) => idx,
            None => {
                let table = line_table(&padded, segment.orientation, segment.len, rank);
                tables.push((segment.orientation, segment.len, table));
                tables.len() - 1
            }
        };
        lookups.push((table_idx, segment.row, segment.col));
    }

    let width = src.width();
    let padded_width = padded.width();

    dst.as_slice_mut()
        .par_chunks_exact_mut(width * C)
        .enumerate()
        .for_each(|(y, dst_row)| {
            for x in 0..width {
                for c in 0..C {
                    let mut acc = identity;
                    for &(table_idx, row, col) in &lookups {
                        let idx = ((y + row) * padded_width + x + col) * C + c;
                        acc = rank.combine(acc, tables[table_idx].2[idx]);
                    }
                    dst_row[x * C + c] = acc;
                }
            }
        });

    Ok(())
}
