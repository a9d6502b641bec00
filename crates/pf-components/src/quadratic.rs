//! Physically valid roots of `c0 + c1*g + c2*g^2 = 0`.

use crate::fault::Fault;

/// `|c2|` below this fraction of the other coefficients is treated as linear.
const LINEAR_GUARD: f64 = 1e-12;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RootSolution {
    pub flow: f64,
    pub fault: Option<Fault>,
}

impl RootSolution {
    pub fn ok(flow: f64) -> Self {
        Self { flow, fault: None }
    }

    pub fn failed(fault: Fault) -> Self {
        Self {
            flow: 0.0,
            fault: Some(fault),
        }
    }
}

/// Both real roots in ascending order, or `None` when the discriminant is not positive.
///
/// Uses the cancellation-free form `q = -(c1 + sign(c1) sqrt(disc)) / 2`.
pub fn real_roots(c0: f64, c1: f64, c2: f64) -> Option<[f64; 2]> {
    let disc = c1 * c1 - 4.0 * c0 * c2;
    if disc.is_nan() || disc <= 0.0 {
        return None;
    }
    let sign = if c1 < 0.0 { -1.0 } else { 1.0 };
    let q = -0.5 * (c1 + sign * disc.sqrt());
    let r1 = q / c2;
    let r2 = c0 / q;
    Some(if r1 <= r2 { [r1, r2] } else { [r2, r1] })
}

/// Larger non-negative root, or zero flow with a fault.
///
/// - discriminant `<= 0` gives [`Fault::NoRoot`]
/// - both roots negative gives [`Fault::NegativeRoot`]
/// - near-zero `c2` degrades to `c0 + c1*g = 0`
pub fn quadratic_root(c0: f64, c1: f64, c2: f64) -> RootSolution {
    if !(c0.is_finite() && c1.is_finite() && c2.is_finite()) {
        return RootSolution::failed(Fault::NoRoot);
    }

    let scale = c0.abs().max(c1.abs()).max(1.0);
    if c2.abs() <= LINEAR_GUARD * scale {
        return linear_root(c0, c1);
    }

    match real_roots(c0, c1, c2) {
        None => RootSolution::failed(Fault::NoRoot),
        Some([_, hi]) if hi < 0.0 => RootSolution::failed(Fault::NegativeRoot),
        Some([_, hi]) => RootSolution::ok(hi),
    }
}

fn linear_root(c0: f64, c1: f64) -> RootSolution {
    if c1 == 0.0 {
        return if c0 == 0.0 {
            RootSolution::ok(0.0)
        } else {
            RootSolution::failed(Fault::NoRoot)
        };
    }
    let g = -c0 / c1;
    if g < 0.0 {
        RootSolution::failed(Fault::NegativeRoot)
    } else {
        RootSolution::ok(g)
    }
}
