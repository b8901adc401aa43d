use super::error::MorphologyError;

/// Shapes of morphological `Kernels`.
///
/// All kernels are anchored at their geometric center `(height / 2, width / 2)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelShape {
    /// A hollow rectangle: a zero interior surrounded by `border` layers of ones.
    ///
    /// Under opening it responds to rectangular outlines close to the interior size.
    /// The resulting kernel has shape `(height + 2 * border) x (width + 2 * border)`.
    Frame {
        /// Width of the zero interior.
        width: usize,
        /// Height of the zero interior.
        height: usize,
        /// Thickness of the surrounding border of ones.
        border: usize,
    },

    /// A solid bar where every element is active.
    Solid {
        /// Width of the bar.
        width: usize,
        /// Height of the bar.
        height: usize,
    },
}

/// A morphological structuring element.
///
/// The kernel stores a binary mask (row-major) where 1 marks the elements that
/// take part in the operation and 0 the excluded ones. A kernel always has
/// positive dimensions and at least one active element.
///
/// # Example
///
/// ```rust
/// use boxdetect_imgproc::morphology::{Kernel, KernelShape};
///
/// let kernel = Kernel::new(KernelShape::Frame { width: 2, height: 1, border: 1 }).unwrap();
/// assert_eq!(kernel.width(), 4);
/// assert_eq!(kernel.height(), 3);
/// assert_eq!(kernel.anchor(), (1, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Kernel {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

/// Orientation of a [`Segment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    /// The segment spans consecutive columns of one row.
    Horizontal,
    /// The segment spans consecutive rows of one column.
    Vertical,
}

/// A straight run of active kernel elements.
///
/// The union of the segments returned by [`Kernel::segments`] covers every active
/// element, so a rank filter (min or max) over the kernel equals the same rank
/// filter over the per-segment results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Segment {
    /// Kernel row of the first element.
    pub row: usize,
    /// Kernel column of the first element.
    pub col: usize,
    /// Number of elements in the run.
    pub len: usize,
    /// Direction of the run.
    pub orientation: Orientation,
}

impl Kernel {
    /// Create a morphological kernel from a shape.
    ///
    /// # Errors
    ///
    /// Returns [`MorphologyError::InvalidConfiguration`] if the shape has a zero
    /// dimension or a zero border.
    pub fn new(shape: KernelShape) -> Result<Self, MorphologyError> {
        match shape {
            KernelShape::Frame {
                width,
                height,
                border,
            } => frame_kernel(width, height, border),
            KernelShape::Solid { width, height } => solid_kernel(width, height),
        }
    }

    /// Create a kernel from a row-major binary mask.
    ///
    /// Any non-zero value is treated as an active element and stored as 1.
    ///
    /// # Errors
    ///
    /// Returns [`MorphologyError::InvalidConfiguration`] if the dimensions are zero,
    /// do not match the data length, or no element is active.
    pub fn from_data(data: Vec<u8>, width: usize, height: usize) -> Result<Self, MorphologyError> {
        if width == 0 || height == 0 {
            return Err(MorphologyError::InvalidConfiguration(format!(
                "kernel dimensions must be positive, got {height}x{width}"
            )));
        }
        if data.len() != width * height {
            return Err(MorphologyError::InvalidConfiguration(format!(
                "kernel data length {} does not match {height}x{width}",
                data.len()
            )));
        }
        if data.iter().all(|&v| v == 0) {
            return Err(MorphologyError::InvalidConfiguration(
                "kernel has no active elements".to_string(),
            ));
        }

        let data = data.into_iter().map(|v| u8::from(v != 0)).collect();
        Ok(Self {
            data,
            width,
            height,
        })
    }

    /// Get a reference to the kernel data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the width of the kernel.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Get the height of the kernel.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Get the kernel element at `(row, col)`, or `None` if out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<u8> {
        if row >= self.height || col >= self.width {
            return None;
        }
        Some(self.data[row * self.width + col])
    }

    /// Get the anchor of the kernel as `(row, col)`.
    pub fn anchor(&self) -> (usize, usize) {
        (self.height / 2, self.width / 2)
    }

    /// Number of active elements.
    pub fn num_active(&self) -> usize {
        self.data.iter().filter(|&&v| v == 1).count()
    }

    /// The kernel rotated by 180 degrees.
    pub fn reflect(&self) -> Self {
        let data = self.data.iter().rev().copied().collect();
        Self {
            data,
            width: self.width,
            height: self.height,
        }
    }

    /// Decompose the active elements into horizontal and vertical runs.
    ///
    /// Maximal runs are taken longest first and a run is kept only if it covers an
    /// element no previously kept run covers. A frame kernel with a one pixel border
    /// decomposes into its four sides.
    pub fn segments(&self) -> Vec<Segment> {
        let mut candidates = Vec::new();

        for row in 0..self.height {
            let mut col = 0;
            while col < self.width {
                if self.data[row * self.width + col] == 0 {
                    col += 1;
                    continue;
                }
                let start = col;
                while col < self.width && self.data[row * self.width + col] == 1 {
                    col += 1;
                }
                candidates.push(Segment {
                    row,
                    col: start,
                    len: col - start,
                    orientation: Orientation::Horizontal,
                });
            }
        }

        for col in 0..self.width {
            let mut row = 0;
            while row < self.height {
                if self.data[row * self.width + col] == 0 {
                    row += 1;
                    continue;
                }
                let start = row;
                while row < self.height && self.data[row * self.width + col] == 1 {
                    row += 1;
                }
                candidates.push(Segment {
                    row: start,
                    col,
                    len: row - start,
                    orientation: Orientation::Vertical,
                });
            }
        }

        // stable sort keeps horizontal runs ahead of vertical runs of equal length
        candidates.sort_by(|a, b| b.len.cmp(&a.len));

        let mut covered = vec![false; self.data.len()];
        let mut segments = Vec::new();
        for segment in candidates {
            let cells: Vec<usize> = (0..segment.len)
                .map(|i| match segment.orientation {
                    Orientation::Horizontal => segment.row * self.width + segment.col + i,
                    Orientation::Vertical => (segment.row + i) * self.width + segment.col,
                })
                .collect();

            if cells.iter().all(|&idx| covered[idx]) {
                continue;
            }
            cells.iter().for_each(|&idx| covered[idx] = true);
            segments.push(segment);
        }

        segments
    }
}

/// Create a frame structuring element.
///
/// # Arguments
///
/// * `width` - The width of the zero interior.
/// * `height` - The height of the zero interior.
/// * `border` - The thickness of the border of ones.
///
/// # Returns
///
/// A [`Kernel`] of shape `(height + 2 * border) x (width + 2 * border)`.
pub fn frame_kernel(width: usize, height: usize, border: usize) -> Result<Kernel, MorphologyError> {
    if width == 0 || height == 0 || border == 0 {
        return Err(MorphologyError::InvalidConfiguration(format!(
            "frame interior and border must be positive, got {height}x{width} with border {border}"
        )));
    }

    let outer_w = width + 2 * border;
    let outer_h = height + 2 * border;
    let mut data = vec![1u8; outer_w * outer_h];

    for row in border..border + height {
        data[row * outer_w + border..row * outer_w + border + width].fill(0);
    }

    Ok(Kernel {
        data,
        width: outer_w,
        height: outer_h,
    })
}

/// Create a solid structuring element.
///
/// # Returns
///
/// A [`Kernel`] filled with 1s.
pub fn solid_kernel(width: usize, height: usize) -> Result<Kernel, MorphologyError> {
    if width == 0 || height == 0 {
        return Err(MorphologyError::InvalidConfiguration(format!(
            "bar dimensions must be positive, got {height}x{width}"
        )));
    }

    Ok(Kernel {
        data: vec![1u8; width * height],
        width,
        height,
    })
}
