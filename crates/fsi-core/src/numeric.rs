use crate::CoreError;
use nalgebra::DVector;

/// Floating point type used throughout system
pub type Real = f64;

/// Return the first non-finite entry of `v` as an error.
pub fn ensure_all_finite(v: &DVector<Real>, what: &'static str) -> Result<(), CoreError> {
    match v.iter().position(|x| !x.is_finite()) {
        None => Ok(()),
        Some(index) => Err(CoreError::NonFinite {
            what,
            index,
            value: v[index],
        }),
    }
}

/// Euclidean norm of `a - b`.
pub fn diff_norm(a: &DVector<Real>, b: &DVector<Real>, what: &'static str) -> Result<Real, CoreError> {
    if a.len() != b.len() {
        return Err(CoreError::LengthMismatch {
            what,
            left: a.len(),
            right: b.len(),
        });
    }
    Ok((a - b).norm())
}

/// Linear interpolation between `a` (at `t = 0`) and `b` (at `t = 1`).
#[inline]
pub fn lerp(a: Real, b: Real, t: Real) -> Real {
    a + (b - a) * t
}
