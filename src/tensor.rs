//! Backend-portable tensor primitives: 2D spectral transforms, frequency
//! shifts, elementwise complex arithmetic, and spectral derivatives.
//!
//! The [`SpectralBackend`] trait covers the three capabilities the propagator
//! needs from a compute target (transform, elementwise-op, reduce), with a
//! sequential CPU implementation and a data-parallel accelerator
//! implementation behind it. Both produce the same numerical result up to
//! floating-point summation order.

use ndarray::parallel::prelude::*;
use ndarray::{Array2, Axis, Zip};
use num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use crate::error::GpeError;
use crate::types::ComputeTarget;

/// Compute-target abstraction over a complex 2D field.
pub trait SpectralBackend: Send + Sync {
    /// Orthonormal forward 2D transform, in place.
    fn fft2(&self, field: &mut Array2<Complex<f64>>);

    /// Orthonormal inverse 2D transform, in place; exact inverse of
    /// [`SpectralBackend::fft2`] up to roundoff.
    fn ifft2(&self, field: &mut Array2<Complex<f64>>);

    /// Elementwise map, in place.
    fn map_inplace(
        &self,
        field: &mut Array2<Complex<f64>>,
        f: &(dyn Fn(Complex<f64>) -> Complex<f64> + Sync),
    );

    /// Elementwise combination with a second field of the same shape.
    fn zip_map_inplace(
        &self,
        field: &mut Array2<Complex<f64>>,
        other: &Array2<Complex<f64>>,
        f: &(dyn Fn(Complex<f64>, Complex<f64>) -> Complex<f64> + Sync),
    ) -> Result<(), GpeError>;

    /// Sum of all field values.
    fn sum(&self, field: &Array2<Complex<f64>>) -> Complex<f64>;
}

/// Construct the backend for the requested compute target and grid shape.
pub fn backend_for(target: ComputeTarget, shape: (usize, usize)) -> Box<dyn SpectralBackend> {
    match target {
        ComputeTarget::Cpu => Box::new(CpuBackend::new(shape)),
        ComputeTarget::Accelerator => Box::new(ParallelBackend::new(shape)),
    }
}

/// Planned transforms for one grid shape, shared by both backends.
struct Plans {
    shape: (usize, usize),
    fft_row: Arc<dyn Fft<f64>>,
    ifft_row: Arc<dyn Fft<f64>>,
    fft_col: Arc<dyn Fft<f64>>,
    ifft_col: Arc<dyn Fft<f64>>,
}

impl Plans {
    fn new(shape: (usize, usize)) -> Self {
        let mut planner = FftPlanner::new();
        Plans {
            shape,
            fft_row: planner.plan_fft_forward(shape.1),
            ifft_row: planner.plan_fft_inverse(shape.1),
            fft_col: planner.plan_fft_forward(shape.0),
            ifft_col: planner.plan_fft_inverse(shape.0),
        }
    }

    fn norm_factor(&self) -> f64 {
        1.0 / ((self.shape.0 * self.shape.1) as f64).sqrt()
    }
}

/// Sequential CPU backend.
pub struct CpuBackend {
    plans: Plans,
}

impl CpuBackend {
    pub fn new(shape: (usize, usize)) -> Self {
        CpuBackend {
            plans: Plans::new(shape),
        }
    }

    fn transform(&self, field: &mut Array2<Complex<f64>>, row: &Arc<dyn Fft<f64>>, col: &Arc<dyn Fft<f64>>) {
        assert_eq!(field.dim(), self.plans.shape);

        // Rows of a standard-layout array are contiguous.
        for mut lane in field.rows_mut() {
            row.process(lane.as_slice_mut().unwrap());
        }

        // Columns via a transposed standard-layout copy.
        let mut t = field.t().as_standard_layout().into_owned();
        for mut lane in t.rows_mut() {
            col.process(lane.as_slice_mut().unwrap());
        }
        field.assign(&t.t());

        let norm = self.plans.norm_factor();
        field.mapv_inplace(|v| v * norm);
    }
}

impl SpectralBackend for CpuBackend {
    fn fft2(&self, field: &mut Array2<Complex<f64>>) {
        self.transform(field, &self.plans.fft_row, &self.plans.fft_col);
    }

    fn ifft2(&self, field: &mut Array2<Complex<f64>>) {
        self.transform(field, &self.plans.ifft_row, &self.plans.ifft_col);
    }

    fn map_inplace(
        &self,
        field: &mut Array2<Complex<f64>>,
        f: &(dyn Fn(Complex<f64>) -> Complex<f64> + Sync),
    ) {
        field.mapv_inplace(f);
    }

    fn zip_map_inplace(
        &self,
        field: &mut Array2<Complex<f64>>,
        other: &Array2<Complex<f64>>,
        f: &(dyn Fn(Complex<f64>, Complex<f64>) -> Complex<f64> + Sync),
    ) -> Result<(), GpeError> {
        check_shapes(field.dim(), other.dim())?;
        field.zip_mut_with(other, |a, &b| *a = f(*a, b));
        Ok(())
    }

    fn sum(&self, field: &Array2<Complex<f64>>) -> Complex<f64> {
        field.sum()
    }
}

/// Data-parallel backend; transform lanes and elementwise operations run
/// across the rayon worker pool.
pub struct ParallelBackend {
    plans: Plans,
}

impl ParallelBackend {
    pub fn new(shape: (usize, usize)) -> Self {
        ParallelBackend {
            plans: Plans::new(shape),
        }
    }

    fn transform(&self, field: &mut Array2<Complex<f64>>, row: &Arc<dyn Fft<f64>>, col: &Arc<dyn Fft<f64>>) {
        assert_eq!(field.dim(), self.plans.shape);

        field.axis_iter_mut(Axis(0)).into_par_iter().for_each(|mut lane| {
            row.process(lane.as_slice_mut().unwrap());
        });

        let mut t = field.t().as_standard_layout().into_owned();
        t.axis_iter_mut(Axis(0)).into_par_iter().for_each(|mut lane| {
            col.process(lane.as_slice_mut().unwrap());
        });
        field.assign(&t.t());

        let norm = self.plans.norm_factor();
        field.par_mapv_inplace(|v| v * norm);
    }
}

impl SpectralBackend for ParallelBackend {
    fn fft2(&self, field: &mut Array2<Complex<f64>>) {
        self.transform(field, &self.plans.fft_row, &self.plans.fft_col);
    }

    fn ifft2(&self, field: &mut Array2<Complex<f64>>) {
        self.transform(field, &self.plans.ifft_row, &self.plans.ifft_col);
    }

    fn map_inplace(
        &self,
        field: &mut Array2<Complex<f64>>,
        f: &(dyn Fn(Complex<f64>) -> Complex<f64> + Sync),
    ) {
        field.par_mapv_inplace(|v| f(v));
    }

    fn zip_map_inplace(
        &self,
        field: &mut Array2<Complex<f64>>,
        other: &Array2<Complex<f64>>,
        f: &(dyn Fn(Complex<f64>, Complex<f64>) -> Complex<f64> + Sync),
    ) -> Result<(), GpeError> {
        check_shapes(field.dim(), other.dim())?;
        Zip::from(field)
            .and(other)
            .par_for_each(|a, &b| *a = f(*a, b));
        Ok(())
    }

    fn sum(&self, field: &Array2<Complex<f64>>) -> Complex<f64> {
        field
            .into_par_iter()
            .copied()
            .reduce(|| Complex::new(0.0, 0.0), |a, b| a + b)
    }
}

fn check_shapes(expected: (usize, usize), found: (usize, usize)) -> Result<(), GpeError> {
    if expected == found {
        Ok(())
    } else {
        Err(GpeError::ShapeMismatch { expected, found })
    }
}

/// Forward 2D transform of a copy of `field`.
pub fn fft_2d(
    backend: &dyn SpectralBackend,
    field: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut out = field.clone();
    backend.fft2(&mut out);
    out
}

/// Inverse 2D transform of a copy of `field`.
pub fn ifft_2d(
    backend: &dyn SpectralBackend,
    field: &Array2<Complex<f64>>,
) -> Array2<Complex<f64>> {
    let mut out = field.clone();
    backend.ifft2(&mut out);
    out
}

/// Shift the zero-frequency component to the center of the spectrum.
pub fn fftshift<T: Clone>(field: &Array2<T>) -> Array2<T> {
    roll(field, field.nrows() / 2, field.ncols() / 2)
}

/// Exact inverse of [`fftshift`].
pub fn ifftshift<T: Clone>(field: &Array2<T>) -> Array2<T> {
    roll(field, (field.nrows() + 1) / 2, (field.ncols() + 1) / 2)
}

fn roll<T: Clone>(field: &Array2<T>, by0: usize, by1: usize) -> Array2<T> {
    let (n0, n1) = field.dim();
    Array2::from_shape_fn((n0, n1), |(i, j)| {
        field[[(i + n0 - by0) % n0, (j + n1 - by1) % n1]].clone()
    })
}

/// Elementwise product of two same-shape complex fields.
pub fn t_mult(
    a: &Array2<Complex<f64>>,
    b: &Array2<Complex<f64>>,
) -> Result<Array2<Complex<f64>>, GpeError> {
    check_shapes(a.dim(), b.dim())?;
    Ok(a * b)
}

/// Complex conjugate of a field.
pub fn conj(field: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    field.mapv(|v| v.conj())
}

/// Squared magnitude of a field.
pub fn norm_sq(field: &Array2<Complex<f64>>) -> Array2<f64> {
    field.mapv(|v| v.norm_sqr())
}

/// Hyperbolic cosine of a complex field.
pub fn t_cosh(field: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    field.mapv(|v| v.cosh())
}

/// Hyperbolic sine of a complex field.
pub fn t_sinh(field: &Array2<Complex<f64>>) -> Array2<Complex<f64>> {
    field.mapv(|v| v.sinh())
}

/// Spectral first derivative along one axis: multiply the spectrum by `i·k`
/// and inverse-transform. `k_mesh` must hold the axis frequencies in
/// transform order.
pub fn grad(
    backend: &dyn SpectralBackend,
    field: &Array2<Complex<f64>>,
    k_mesh: &Array2<f64>,
) -> Result<Array2<Complex<f64>>, GpeError> {
    check_shapes(field.dim(), k_mesh.dim())?;
    let mut spec = field.clone();
    backend.fft2(&mut spec);
    spec.zip_mut_with(k_mesh, |s, &k| *s *= Complex::new(0.0, k));
    backend.ifft2(&mut spec);
    Ok(spec)
}

/// Spectral Laplacian: multiply the spectrum by `-k²` and inverse-transform.
/// `k_sq_mesh` must hold `kx² + ky²` in transform order.
pub fn grad_sq(
    backend: &dyn SpectralBackend,
    field: &Array2<Complex<f64>>,
    k_sq_mesh: &Array2<f64>,
) -> Result<Array2<Complex<f64>>, GpeError> {
    check_shapes(field.dim(), k_sq_mesh.dim())?;
    let mut spec = field.clone();
    backend.fft2(&mut spec);
    spec.zip_mut_with(k_sq_mesh, |s, &k_sq| *s *= -k_sq);
    backend.ifft2(&mut spec);
    Ok(spec)
}
