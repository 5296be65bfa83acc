use std::f64::consts::PI;

use crate::utils::TreeError;

/// Radial smoothing kernel in `s = r/h` units.
///
/// `w0` and `w1` include the dimension-dependent normalisation, so that
/// `∫ w0(|x|) dx = 1` over `D`-dimensional space. The caller scales by `h^-D`.
pub trait SphKernel: Send + Sync {
    /// Number of spatial dimensions the normalisation is valid for.
    fn dimension(&self) -> usize;

    /// Support radius in units of `h`.
    fn range(&self) -> f64;

    /// Kernel value at `s`.
    fn w0(&self, s: f64) -> f64;

    /// Derivative `dw0/ds`.
    fn w1(&self, s: f64) -> f64;

    /// `-(D w0 + s w1)`, the kernel's contribution to `h ∂ρ/∂h`.
    fn womega(&self, s: f64) -> f64 {
        -(self.dimension() as f64 * self.w0(s) + s * self.w1(s))
    }
}

fn check_dimension(dimension: usize) -> Result<(), TreeError> {
    if !(1..=3).contains(&dimension) {
        return Err(TreeError::InvalidDimension(dimension));
    }
    Ok(())
}

/// Cubic B-spline (M4) kernel with support `2h`.
///
/// # Examples
///
/// ```
/// use rs_sph_tree::density::{M4Kernel, SphKernel};
///
/// let kernel = M4Kernel::new(1).unwrap();
/// assert_eq!(kernel.range(), 2.0);
/// assert_eq!(kernel.w0(2.5), 0.0);
/// assert!((kernel.w0(0.0) - 2.0 / 3.0).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct M4Kernel {
    dimension: usize,
    norm: f64,
}

impl M4Kernel {
    pub fn new(dimension: usize) -> Result<Self, TreeError> {
        check_dimension(dimension)?;
        let norm = match dimension {
            1 => 2.0 / 3.0,
            2 => 10.0 / (7.0 * PI),
            _ => 1.0 / PI,
        };
        Ok(Self { dimension, norm })
    }
}

impl SphKernel for M4Kernel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn range(&self) -> f64 {
        2.0
    }

    fn w0(&self, s: f64) -> f64 {
        if s < 1.0 {
            self.norm * (1.0 - 1.5 * s * s + 0.75 * s * s * s)
        } else if s < 2.0 {
            self.norm * 0.25 * (2.0 - s).powi(3)
        } else {
            0.0
        }
    }

    fn w1(&self, s: f64) -> f64 {
        if s < 1.0 {
            self.norm * (-3.0 * s + 2.25 * s * s)
        } else if s < 2.0 {
            -self.norm * 0.75 * (2.0 - s).powi(2)
        } else {
            0.0
        }
    }
}

/// Quintic spline kernel with support `3h`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuinticKernel {
    dimension: usize,
    norm: f64,
}

impl QuinticKernel {
    pub fn new(dimension: usize) -> Result<Self, TreeError> {
        check_dimension(dimension)?;
        let norm = match dimension {
            1 => 1.0 / 120.0,
            2 => 7.0 / (478.0 * PI),
            _ => 1.0 / (120.0 * PI),
        };
        Ok(Self { dimension, norm })
    }
}

impl SphKernel for QuinticKernel {
    fn dimension(&self) -> usize {
        self.dimension
    }

    fn range(&self) -> f64 {
        3.0
    }

    fn w0(&self, s: f64) -> f64 {
        let mut w = 0.0;
        if s < 3.0 {
            w += (3.0 - s).powi(5);
        }
        if s < 2.0 {
            w -= 6.0 * (2.0 - s).powi(5);
        }
        if s < 1.0 {
            w += 15.0 * (1.0 - s).powi(5);
        }
        self.norm * w
    }

    fn w1(&self, s: f64) -> f64 {
        let mut w = 0.0;
        if s < 3.0 {
            w -= 5.0 * (3.0 - s).powi(4);
        }
        if s < 2.0 {
            w += 30.0 * (2.0 - s).powi(4);
        }
        if s < 1.0 {
            w -= 75.0 * (1.0 - s).powi(4);
        }
        self.norm * w
    }
}
