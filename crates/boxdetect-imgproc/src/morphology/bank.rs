use super::error::MorphologyError;
use super::kernels::{Kernel, KernelShape};

/// Configuration of a bank of rectangular frame kernels.
///
/// Widths and heights are half-open ranges `[min, max)` over the size of the zero
/// interior; the border is added around it.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RectBankConfig {
    /// Inclusive `(min, max)` bounds on `width / height`.
    pub ratio_range: (f64, f64),
    /// Smallest interior width.
    pub min_width: usize,
    /// Exclusive upper bound on the interior width.
    pub max_width: usize,
    /// Smallest interior height.
    pub min_height: usize,
    /// Exclusive upper bound on the interior height.
    pub max_height: usize,
    /// Thickness of the border of ones around each interior.
    pub border: usize,
}

impl Default for RectBankConfig {
    fn default() -> Self {
        Self {
            ratio_range: (0.5, 1.1),
            min_width: 40,
            max_width: 60,
            min_height: 40,
            max_height: 65,
            border: 1,
        }
    }
}

impl RectBankConfig {
    /// Check the configuration without generating any kernel.
    ///
    /// Empty ranges (`min >= max`) are valid and produce an empty bank.
    pub fn validate(&self) -> Result<(), MorphologyError> {
        let (lo, hi) = self.ratio_range;
        if !lo.is_finite() || !hi.is_finite() {
            return Err(MorphologyError::InvalidConfiguration(format!(
                "ratio range bounds must be finite, got ({lo}, {hi})"
            )));
        }
        if lo > hi {
            return Err(MorphologyError::InvalidConfiguration(format!(
                "ratio range is inverted: ({lo}, {hi})"
            )));
        }
        if self.min_width == 0 || self.min_height == 0 {
            return Err(MorphologyError::InvalidConfiguration(format!(
                "minimum kernel size must be positive, got {}x{}",
                self.min_height, self.min_width
            )));
        }
        if self.border == 0 {
            return Err(MorphologyError::InvalidConfiguration(
                "kernel border must be positive".to_string(),
            ));
        }
        Ok(())
    }

    fn accepts(&self, width: usize, height: usize) -> bool {
        let (lo, hi) = self.ratio_range;
        let ratio = width as f64 / height as f64;
        lo <= ratio && ratio <= hi
    }
}

/// An ordered collection of kernels generated from one configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct KernelBank(Vec<Kernel>);

impl KernelBank {
    /// Create a bank from a list of kernels.
    pub fn new(kernels: Vec<Kernel>) -> Self {
        Self(kernels)
    }

    /// Number of kernels in the bank.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the bank has no kernels.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The kernels as a slice.
    pub fn as_slice(&self) -> &[Kernel] {
        &self.0
    }

    /// Iterate over the kernels.
    pub fn iter(&self) -> std::slice::Iter<'_, Kernel> {
        self.0.iter()
    }
}

impl From<Vec<Kernel>> for KernelBank {
    fn from(kernels: Vec<Kernel>) -> Self {
        Self(kernels)
    }
}

impl<'a> IntoIterator for &'a KernelBank {
    type Item = &'a Kernel;
    type IntoIter = std::slice::Iter<'a, Kernel>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Generate the frame kernels for every interior size allowed by `config`.
///
/// Widths form the outer loop and heights the inner loop. A pair is kept when
/// `ratio_range.0 <= width / height <= ratio_range.1`.
///
/// # Errors
///
/// Returns [`MorphologyError::InvalidConfiguration`] if the configuration is invalid.
/// Ranges that select nothing produce an empty bank.
///
/// # Example
///
/// ```rust
/// use boxdetect_imgproc::morphology::{generate_rect_bank, RectBankConfig};
///
/// let config = RectBankConfig {
///     ratio_range: (0.5, 1.1),
///     min_width: 40,
///     max_width: 41,
///     min_height: 40,
///     max_height: 41,
///     border: 1,
/// };
/// let bank = generate_rect_bank(&config).unwrap();
/// assert_eq!(bank.len(), 1);
/// assert_eq!(bank.as_slice()[0].width(), 42);
/// ```
pub fn generate_rect_bank(config: &RectBankConfig) -> Result<KernelBank, MorphologyError> {
    config.validate()?;

    let mut kernels = Vec::new();
    for width in config.min_width..config.max_width {
        for height in config.min_height..config.max_height {
            if !config.accepts(width, height) {
                continue;
            }
            kernels.push(Kernel::new(KernelShape::Frame {
                width,
                height,
                border: config.border,
            })?);
        }
    }

    log::debug!(
        "generated {} rect kernels for widths [{}, {}), heights [{}, {}), ratio {:?}",
        kernels.len(),
        config.min_width,
        config.max_width,
        config.min_height,
        config.max_height,
        config.ratio_range
    );

    Ok(KernelBank(kernels))
}

/// Generate a vertical `(length, 2)` and a horizontal `(2, length)` solid bar.
///
/// Shapes are given as `(rows, cols)`.
///
/// # Errors
///
/// Returns [`MorphologyError::InvalidConfiguration`] if `length` is zero.
pub fn generate_line_bank(length: usize) -> Result<KernelBank, MorphologyError> {
    if length == 0 {
        return Err(MorphologyError::InvalidConfiguration(
            "line length must be positive".to_string(),
        ));
    }

    let vertical = Kernel::new(KernelShape::Solid {
        width: 2,
        height: length,
    })?;
    let horizontal = Kernel::new(KernelShape::Solid {
        width: length,
        height: 2,
    })?;

    Ok(KernelBank(vec![vertical, horizontal]))
}
