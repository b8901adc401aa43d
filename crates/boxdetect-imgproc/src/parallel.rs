use rayon::prelude::*;
use thiserror::Error;

use boxdetect_image::Image;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}

/// Controls how work items (e.g. the kernels of a bank) are distributed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExecutionStrategy {
    /// Process the work items one after another on the calling thread.
    ///
    /// Useful for small images, debugging, or when the overhead of parallelization
    /// outweighs the benefits.
    Serial,

    /// Use the global Rayon thread pool to process the work items in parallel.
    #[default]
    Parallel,

    /// Run on a local thread pool with `n` threads.
    ///
    /// # Warning
    /// Creates a new thread pool on every call, which has significant overhead.
    /// Use this primarily for benchmarking or specific isolation needs.
    Fixed(usize),
}

/// Fold every item into a partial result and reduce the partials into one.
///
/// The reduction must be associative and commutative: parallel strategies split the
/// items into an unspecified number of groups, each folded from `identity()`.
///
/// # Arguments
///
/// * `strategy` - The execution strategy.
/// * `items` - The work items.
/// * `identity` - Produces the neutral partial result.
/// * `fold` - Folds one item into a partial result.
/// * `reduce` - Merges two partial results.
///
/// # Errors
///
/// Returns the first error produced by `fold`, or a [`ParallelError`] if the
/// requested thread pool cannot be built.
pub fn try_fold_reduce<I, R, E, Z, F, G>(
    strategy: ExecutionStrategy,
    items: &[I],
    identity: Z,
    fold: F,
    reduce: G,
) -> Result<R, E>
where
    I: Sync,
    R: Send,
    E: Send + From<ParallelError>,
    Z: Fn() -> R + Sync + Send,
    F: Fn(R, &I) -> Result<R, E> + Sync + Send,
    G: Fn(R, R) -> R + Sync + Send,
{
    let run_parallel = || {
        items
            .par_iter()
            .try_fold(&identity, |acc, item| fold(acc, item))
            .try_reduce(&identity, |a, b| Ok(reduce(a, b)))
    };

    match strategy {
        ExecutionStrategy::Serial => items
            .iter()
            .try_fold(identity(), |acc, item| fold(acc, item)),
        ExecutionStrategy::Parallel => run_parallel(),
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n).into());
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;

            pool.install(run_parallel)
        }
    }
}

/// Apply a function to each pixel in the image in parallel with a value.
pub fn par_iter_rows_val<T1, const C1: usize, T2, const C2: usize>(
    src: &Image<T1, C1>,
    dst: &mut Image<T2, C2>,
    f: impl Fn(&T1, &mut T2) + Send + Sync,
) where
    T1: Send + Sync,
    T2: Send + Sync,
{
    let cols = src.cols();
    if cols == 0 {
        return;
    }

    src.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C2 * cols))
        .for_each(|(src_chunk, dst_chunk)| {
            src_chunk
                .iter()
                .zip(dst_chunk.iter_mut())
                .for_each(|(src_pixel, dst_pixel)| {
                    f(src_pixel, dst_pixel);
                });
        });
}

/// Apply a function to each pixel in the image in parallel with two values.
pub fn par_iter_rows_val_two<T1, const C1: usize, T2, const C2: usize, T3, const C3: usize>(
    src1: &Image<T1, C1>,
    src2: &Image<T2, C2>,
    dst: &mut Image<T3, C3>,
    f: impl Fn(&T1, &T2, &mut T3) + Send + Sync,
) where
    T1: Send + Sync,
    T2: Send + Sync,
    T3: Send + Sync,
{
    let cols = src1.cols();
    if cols == 0 {
        return;
    }

    src1.as_slice()
        .par_chunks_exact(C1 * cols)
        .zip(src2.as_slice().par_chunks_exact(C2 * cols))
        .zip(dst.as_slice_mut().par_chunks_exact_mut(C3 * cols))
        .for_each(|((src1_chunk, src2_chunk), dst_chunk)| {
            src1_chunk
                .iter()
                .zip(src2_chunk.iter())
                .zip(dst_chunk.iter_mut())
                .for_each(|((src1_pixel, src2_pixel), dst_pixel)| {
                    f(src1_pixel, src2_pixel, dst_pixel);
                });
        });
}

#[cfg(test)]
mod tests {
    use super::*;
    use boxdetect_image::{ImageError, ImageSize};

    fn sum_squares(strategy: ExecutionStrategy) -> Result<u64, ParallelError> {
        let items: Vec<u64> = (1..=100).collect();
        try_fold_reduce(
            strategy,
            &items,
            || 0u64,
            |acc, x| Ok(acc + x * x),
            |a, b| a + b,
        )
    }

    #[test]
    fn test_fold_reduce_serial() {
        assert_eq!(sum_squares(ExecutionStrategy::Serial), Ok(338_350));
    }

    #[test]
    fn test_fold_reduce_parallel() {
        assert_eq!(sum_squares(ExecutionStrategy::Parallel), Ok(338_350));
    }

    #[test]
    fn test_fold_reduce_fixed_success() {
        assert_eq!(sum_squares(ExecutionStrategy::Fixed(3)), Ok(338_350));
    }

    #[test]
    fn test_fold_reduce_fixed_error() {
        assert_eq!(
            sum_squares(ExecutionStrategy::Fixed(0)),
            Err(ParallelError::InvalidThreadCount(0))
        );
    }

    #[test]
    fn test_fold_reduce_propagates_item_error() {
        let items = [1u32, 2, 3];
        let res: Result<u32, ParallelError> = try_fold_reduce(
            ExecutionStrategy::Parallel,
            &items,
            || 0,
            |acc, &x| {
                if x == 2 {
                    Err(ParallelError::BuildError("boom".to_string()))
                } else {
                    Ok(acc + x)
                }
            },
            |a, b| a + b,
        );
        assert!(matches!(res, Err(ParallelError::BuildError(_))));
    }

    #[test]
    fn test_par_iter_rows_val_two() -> Result<(), ImageError> {
        let size = ImageSize {
            width: 2,
            height: 2,
        };
        let a = Image::<u8, 1>::new(size, vec![1, 2, 3, 4])?;
        let b = Image::<u8, 1>::new(size, vec![10, 20, 30, 40])?;
        let mut out = Image::<u16, 1>::from_size_val(size, 0)?;

        par_iter_rows_val_two(&a, &b, &mut out, |x, y, o| *o = *x as u16 + *y as u16);
        assert_eq!(out.as_slice(), &[11, 22, 33, 44]);

        Ok(())
    }
}
