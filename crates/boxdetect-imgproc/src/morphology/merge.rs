use std::ops::Add;

use boxdetect_image::Image;
use num_traits::Zero;

use super::bank::KernelBank;
use super::error::MorphologyError;
use super::kernels::Kernel;
use super::ops::{check_kernel_fits, morphology, MorphOp};
use crate::debug::{self, DebugHook};
use crate::parallel::{self, ExecutionStrategy};

/// Options shared by [`merge_transformations`] and [`enhance_image`].
#[derive(Clone, Copy, Default)]
pub struct MergeOptions<'a> {
    /// How the kernels of the bank are distributed over threads.
    pub strategy: ExecutionStrategy,
    /// Optional hook receiving the final mask.
    pub debug: Option<DebugHook<'a>>,
}

impl std::fmt::Debug for MergeOptions<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergeOptions")
            .field("strategy", &self.strategy)
            .field("debug", &self.debug.is_some())
            .finish()
    }
}

/// Order of the two compound filters applied per kernel by [`enhance_image_with_order`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EnhanceOrder {
    /// Closing, then opening: fill small gaps first, then strip thin protrusions.
    #[default]
    CloseOpen,
    /// Opening, then closing.
    OpenClose,
}

impl EnhanceOrder {
    /// The operations applied per kernel, in order.
    pub fn ops(self) -> [MorphOp; 2] {
        match self {
            EnhanceOrder::CloseOpen => [MorphOp::Close, MorphOp::Open],
            EnhanceOrder::OpenClose => [MorphOp::Open, MorphOp::Close],
        }
    }
}

/// Integer type used to sum the per-kernel responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccumulatorWidth {
    /// 16 bit accumulator, enough for up to 257 kernels.
    U16,
    /// 32 bit accumulator.
    U32,
    /// 64 bit accumulator.
    U64,
}

impl AccumulatorWidth {
    /// The narrowest accumulator that holds `num_kernels * 255` without wrapping.
    ///
    /// # Errors
    ///
    /// Returns [`MorphologyError::OverflowRisk`] if no supported width is large enough.
    pub fn for_bank_len(num_kernels: usize) -> Result<Self, MorphologyError> {
        let max_sum = num_kernels as u128 * u8::MAX as u128;
        if max_sum <= u16::MAX as u128 {
            Ok(AccumulatorWidth::U16)
        } else if max_sum <= u32::MAX as u128 {
            Ok(AccumulatorWidth::U32)
        } else if max_sum <= u64::MAX as u128 {
            Ok(AccumulatorWidth::U64)
        } else {
            Err(MorphologyError::OverflowRisk(num_kernels))
        }
    }
}

/// Apply `op` with every kernel of the bank and merge the responses into one mask.
///
/// Each kernel is applied to the original `src`. The responses are summed in an
/// accumulator wide enough for the whole bank, and every pixel with a non-zero sum
/// becomes 255. The result is the union, over the bank, of the pixels where a
/// kernel's response is non-zero.
///
/// # Arguments
///
/// * `src` - The input image, usually a binary mask.
/// * `bank` - The kernels to apply.
/// * `op` - The morphological operation, typically [`MorphOp::Open`].
/// * `options` - Execution strategy and debug hook.
///
/// # Errors
///
/// Returns [`MorphologyError::DimensionMismatch`] before any processing if a kernel
/// does not fit in the image.
///
/// # Example
///
/// ```rust
/// use boxdetect_image::{Image, ImageSize};
/// use boxdetect_imgproc::morphology::{
///     generate_line_bank, merge_transformations, MergeOptions, MorphOp,
/// };
///
/// let src = Image::<u8, 1>::from_size_val(ImageSize { width: 8, height: 8 }, 0).unwrap();
/// let bank = generate_line_bank(4).unwrap();
///
/// let options = MergeOptions::default();
/// let merged = merge_transformations(&src, &bank, MorphOp::Open, &options).unwrap();
/// assert!(merged.as_slice().iter().all(|&v| v == 0));
/// ```
pub fn merge_transformations(
    src: &Image<u8, 1>,
    bank: &KernelBank,
    op: MorphOp,
    options: &MergeOptions<'_>,
) -> Result<Image<u8, 1>, MorphologyError> {
    let merged = merge_with_ops(src, bank, &[op], options.strategy)?;
    debug::emit(options.debug, "rectangular shape enhanced image", &merged);
    Ok(merged)
}

/// Close then open with every kernel of the bank and merge the responses.
///
/// Same accumulation as [`merge_transformations`], with a compound filter per kernel
/// that first fills small gaps and then strips thin protrusions.
pub fn enhance_image(
    src: &Image<u8, 1>,
    bank: &KernelBank,
    options: &MergeOptions<'_>,
) -> Result<Image<u8, 1>, MorphologyError> {
    enhance_image_with_order(src, bank, EnhanceOrder::default(), options)
}

/// [`enhance_image`] with a configurable filter order.
pub fn enhance_image_with_order(
    src: &Image<u8, 1>,
    bank: &KernelBank,
    order: EnhanceOrder,
    options: &MergeOptions<'_>,
) -> Result<Image<u8, 1>, MorphologyError> {
    let enhanced = merge_with_ops(src, bank, &order.ops(), options.strategy)?;
    debug::emit(options.debug, "enhanced image", &enhanced);
    Ok(enhanced)
}

fn merge_with_ops(
    src: &Image<u8, 1>,
    bank: &KernelBank,
    ops: &[MorphOp],
    strategy: ExecutionStrategy,
) -> Result<Image<u8, 1>, MorphologyError> {
    bank.iter()
        .try_for_each(|kernel| check_kernel_fits(kernel, src.size()))?;

    let width = AccumulatorWidth::for_bank_len(bank.len())?;
    log::debug!(
        "merging {} kernels with {:?} on a {} image using a {:?} accumulator",
        bank.len(),
        ops,
        src.size(),
        width
    );

    match width {
        AccumulatorWidth::U16 => accumulate_union::<u16>(src, bank, ops, strategy),
        AccumulatorWidth::U32 => accumulate_union::<u32>(src, bank, ops, strategy),
        AccumulatorWidth::U64 => accumulate_union::<u64>(src, bank, ops, strategy),
    }
}

fn apply_ops(
    src: &Image<u8, 1>,
    kernel: &Kernel,
    ops: &[MorphOp],
) -> Result<Image<u8, 1>, MorphologyError> {
    let mut current = src.clone();
    for &op in ops {
        current = morphology(&current, kernel, op)?;
    }
    Ok(current)
}

fn accumulate_union<A>(
    src: &Image<u8, 1>,
    bank: &KernelBank,
    ops: &[MorphOp],
    strategy: ExecutionStrategy,
) -> Result<Image<u8, 1>, MorphologyError>
where
    A: Copy + Zero + Add<Output = A> + From<u8> + PartialOrd + Send + Sync,
{
    let size = src.size();

    let sums = parallel::try_fold_reduce(
        strategy,
        bank.as_slice(),
        || vec![A::zero(); size.area()],
        |mut acc, kernel| {
            let response = apply_ops(src, kernel, ops)?;
            acc.iter_mut()
                .zip(response.as_slice())
                .for_each(|(a, &r)| *a = *a + A::from(r));
            Ok::<_, MorphologyError>(acc)
        },
        |mut a, b| {
            a.iter_mut().zip(b).for_each(|(x, y)| *x = *x + y);
            a
        },
    )?;

    let accumulator = Image::<A, 1>::new(size, sums)?;
    let mut dst = Image::<u8, 1>::from_size_val(size, 0)?;
    parallel::par_iter_rows_val(&accumulator, &mut dst, |sum, out| {
        *out = if *sum > A::zero() { 255 } else { 0 };
    });

    Ok(dst)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morphology::bank::{generate_line_bank, generate_rect_bank, RectBankConfig};
    use crate::morphology::kernels::{frame_kernel, solid_kernel};
    use boxdetect_image::ImageSize;
    use std::cell::RefCell;

    fn square_scene(size: usize, x0: usize, y0: usize, side: usize) -> Image<u8, 1> {
        let mut data = vec![0u8; size * size];
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                data[y * size + x] = 255;
            }
        }
        Image::new(
            ImageSize {
                width: size,
                height: size,
            },
            data,
        )
        .unwrap()
    }

    fn binarize(image: &Image<u8, 1>) -> Vec<u8> {
        image
            .as_slice()
            .iter()
            .map(|&v| if v > 0 { 255 } else { 0 })
            .collect()
    }

    #[test]
    fn test_accumulator_width() {
        assert_eq!(AccumulatorWidth::for_bank_len(0), Ok(AccumulatorWidth::U16));
        assert_eq!(AccumulatorWidth::for_bank_len(257), Ok(AccumulatorWidth::U16));
        assert_eq!(AccumulatorWidth::for_bank_len(258), Ok(AccumulatorWidth::U32));
        assert_eq!(
            AccumulatorWidth::for_bank_len(16_843_009),
            Ok(AccumulatorWidth::U32)
        );
        assert_eq!(
            AccumulatorWidth::for_bank_len(16_843_010),
            Ok(AccumulatorWidth::U64)
        );
    }

    #[test]
    fn test_empty_bank_gives_zero_mask() -> Result<(), MorphologyError> {
        let src = square_scene(32, 4, 4, 20);
        let bank = KernelBank::default();

        let merged = merge_transformations(&src, &bank, MorphOp::Open, &MergeOptions::default())?;
        assert_eq!(merged.size(), src.size());
        assert!(merged.as_slice().iter().all(|&v| v == 0));

        let enhanced = enhance_image(&src, &bank, &MergeOptions::default())?;
        assert!(enhanced.as_slice().iter().all(|&v| v == 0));
        Ok(())
    }

    #[test]
    fn test_single_kernel_equals_binarized_transform() -> Result<(), MorphologyError> {
        let mut src = square_scene(30, 3, 5, 12);
        src.set_pixel(25, 25, 0, 90)?;
        src.set_pixel(26, 25, 0, 90)?;

        for op in [MorphOp::Erode, MorphOp::Dilate, MorphOp::Open, MorphOp::Close] {
            let kernel = frame_kernel(4, 6, 1)?;
            let expected = binarize(&morphology(&src, &kernel, op)?);
            let bank = KernelBank::new(vec![kernel]);
            let merged = merge_transformations(&src, &bank, op, &MergeOptions::default())?;
            assert_eq!(merged.as_slice(), expected.as_slice());
        }
        Ok(())
    }

    #[test]
    fn test_merge_is_union_of_kernel_responses() -> Result<(), MorphologyError> {
        let src = square_scene(40, 5, 5, 9);
        let bank = KernelBank::new(vec![
            solid_kernel(9, 2)?,
            solid_kernel(2, 9)?,
            solid_kernel(10, 1)?,
        ]);

        let merged = merge_transformations(&src, &bank, MorphOp::Open, &MergeOptions::default())?;

        let mut union = vec![0u8; src.as_slice().len()];
        for kernel in &bank {
            let response = morphology(&src, kernel, MorphOp::Open)?;
            for (u, &r) in union.iter_mut().zip(response.as_slice()) {
                if r > 0 {
                    *u = 255;
                }
            }
        }
        assert_eq!(merged.as_slice(), union.as_slice());
        Ok(())
    }

    #[test]
    fn test_output_is_strictly_binary() -> Result<(), MorphologyError> {
        let data = (0..48 * 48).map(|i| ((i * 37) % 251) as u8).collect();
        let src = Image::<u8, 1>::new(
            ImageSize {
                width: 48,
                height: 48,
            },
            data,
        )?;
        let bank = generate_line_bank(5)?;

        let merged = merge_transformations(&src, &bank, MorphOp::Open, &MergeOptions::default())?;
        assert!(merged.as_slice().iter().all(|&v| v == 0 || v == 255));

        let enhanced = enhance_image(&src, &bank, &MergeOptions::default())?;
        assert!(enhanced.as_slice().iter().all(|&v| v == 0 || v == 255));
        Ok(())
    }

    #[test]
    fn test_strategies_are_bit_identical() -> Result<(), MorphologyError> {
        let src = square_scene(64, 10, 12, 30);
        let config = RectBankConfig {
            ratio_range: (0.7, 1.3),
            min_width: 24,
            max_width: 30,
            min_height: 24,
            max_height: 30,
            border: 1,
        };
        let bank = generate_rect_bank(&config)?;

        let run = |strategy| {
            let options = MergeOptions {
                strategy,
                debug: None,
            };
            enhance_image(&src, &bank, &options)
        };

        let serial = run(ExecutionStrategy::Serial)?;
        assert_eq!(run(ExecutionStrategy::Parallel)?, serial);
        assert_eq!(run(ExecutionStrategy::Fixed(3))?, serial);
        Ok(())
    }

    #[test]
    fn test_enhance_equals_close_then_open_union() -> Result<(), MorphologyError> {
        let mut src = square_scene(40, 8, 8, 20);
        // a pinhole the closing fills, and a spur the opening strips
        src.set_pixel(18, 18, 0, 0)?;
        for x in 28..36 {
            src.set_pixel(x, 10, 0, 255)?;
        }
        let bank = KernelBank::new(vec![solid_kernel(3, 3)?, solid_kernel(5, 5)?]);

        let enhanced = enhance_image(&src, &bank, &MergeOptions::default())?;

        let mut expected = vec![0u8; src.as_slice().len()];
        for kernel in &bank {
            let closed = morphology(&src, kernel, MorphOp::Close)?;
            let opened = morphology(&closed, kernel, MorphOp::Open)?;
            for (e, &v) in expected.iter_mut().zip(opened.as_slice()) {
                if v > 0 {
                    *e = 255;
                }
            }
        }
        assert_eq!(enhanced.as_slice(), expected.as_slice());
        assert_eq!(enhanced.get([18, 18, 0]), Some(&255));
        assert_eq!(enhanced.get([10, 33, 0]), Some(&0));

        let other_order = enhance_image_with_order(
            &src,
            &bank,
            EnhanceOrder::OpenClose,
            &MergeOptions::default(),
        )?;
        assert_eq!(other_order.get([10, 33, 0]), Some(&0));
        Ok(())
    }

    #[test]
    fn test_kernel_too_large_fails_fast() -> Result<(), MorphologyError> {
        let src = square_scene(20, 2, 2, 10);
        let bank = KernelBank::new(vec![solid_kernel(3, 3)?, frame_kernel(20, 4, 1)?]);
        let res = merge_transformations(&src, &bank, MorphOp::Open, &MergeOptions::default());
        assert!(matches!(
            res,
            Err(MorphologyError::DimensionMismatch {
                kernel_height: 6,
                kernel_width: 22,
                ..
            })
        ));
        Ok(())
    }

    #[test]
    fn test_debug_hook_sees_final_mask() -> Result<(), MorphologyError> {
        let src = square_scene(24, 4, 4, 10);
        let bank = generate_line_bank(3)?;
        let seen: RefCell<Vec<(String, Image<u8, 1>)>> = RefCell::new(Vec::new());
        let hook = |label: &str, image: &Image<u8, 1>| {
            seen.borrow_mut().push((label.to_string(), image.clone()));
        };

        let with_hook = MergeOptions {
            strategy: ExecutionStrategy::Parallel,
            debug: Some(&hook),
        };
        let merged = merge_transformations(&src, &bank, MorphOp::Open, &with_hook)?;
        let without_hook =
            merge_transformations(&src, &bank, MorphOp::Open, &MergeOptions::default())?;
        assert_eq!(merged, without_hook);

        let enhanced = enhance_image(&src, &bank, &with_hook)?;

        let seen = seen.into_inner();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0].0, "rectangular shape enhanced image");
        assert_eq!(seen[0].1, merged);
        assert_eq!(seen[1].0, "enhanced image");
        assert_eq!(seen[1].1, enhanced);
        Ok(())
    }
}
