//! Huber (smooth-L1) loss.
//!
//! Quadratic for small residuals, linear beyond `|r| = 1`. The linear tail
//! bounds the gradient magnitude at 1, which keeps rare large-magnitude
//! targets from destabilizing updates.

/// Huber loss for a single residual.
#[must_use]
pub fn huber(residual: f32) -> f32 {
    let abs = residual.abs();
    if abs < 1.0 {
        0.5 * residual * residual
    } else {
        abs - 0.5
    }
}

/// Derivative of [`huber`] with respect to the residual.
#[must_use]
pub fn huber_grad(residual: f32) -> f32 {
    if residual.abs() < 1.0 {
        residual
    } else {
        residual.signum()
    }
}
