//! Flow -> pressure polynomials up to cubic order.

use core::ops::{Add, Neg, Sub};

use serde::{Deserialize, Serialize};

use crate::fault::Fault;
use crate::quadratic::{RootSolution, quadratic_root};

const NEWTON_MAX_ITER: usize = 50;

/// `c[0] + c[1]*g + c[2]*g^2 + c[3]*g^3`, ascending powers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    pub c: [f64; 4],
}

impl Polynomial {
    pub const ZERO: Self = Self { c: [0.0; 4] };

    pub fn quadratic(c0: f64, c1: f64, c2: f64) -> Self {
        Self {
            c: [c0, c1, c2, 0.0],
        }
    }

    pub fn cubic(c0: f64, c1: f64, c2: f64, c3: f64) -> Self {
        Self {
            c: [c0, c1, c2, c3],
        }
    }

    /// Pure quadratic loss `-k g^2` (valid for `g >= 0`).
    pub fn loss(k: f64) -> Self {
        Self::quadratic(0.0, 0.0, -k)
    }

    pub fn constant(c0: f64) -> Self {
        Self::quadratic(c0, 0.0, 0.0)
    }

    pub fn eval(&self, g: f64) -> f64 {
        let [c0, c1, c2, c3] = self.c;
        ((c3 * g + c2) * g + c1) * g + c0
    }

    pub fn derivative(&self, g: f64) -> f64 {
        let [_, c1, c2, c3] = self.c;
        (3.0 * c3 * g + 2.0 * c2) * g + c1
    }

    pub fn is_cubic(&self) -> bool {
        self.c[3] != 0.0
    }

    pub fn is_finite(&self) -> bool {
        self.c.iter().all(|v| v.is_finite())
    }

    /// Largest `g >= 0` with `self.eval(g) == target`.
    ///
    /// Cubics are refined with Newton from the root of their quadratic part.
    pub fn solve_for(&self, target: f64) -> RootSolution {
        let [c0, c1, c2, c3] = self.c;
        let seed = quadratic_root(c0 - target, c1, c2);
        if c3 == 0.0 {
            return seed;
        }

        let mut g = if seed.fault.is_none() { seed.flow } else { 1.0 };
        let scale = c0.abs().max(target.abs()).max(1.0);
        for _ in 0..NEWTON_MAX_ITER {
            let f = self.eval(g) - target;
            if f.abs() <= 1e-12 * scale {
                break;
            }
            let df = self.derivative(g);
            if df == 0.0 || !df.is_finite() {
                break;
            }
            g -= f / df;
        }

        let residual = self.eval(g) - target;
        if !g.is_finite() || residual.abs() > 1e-8 * scale {
            RootSolution::failed(Fault::NoRoot)
        } else if g < 0.0 {
            RootSolution::failed(Fault::NegativeRoot)
        } else {
            RootSolution::ok(g)
        }
    }
}

impl Add for Polynomial {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        let mut c = self.c;
        for (a, b) in c.iter_mut().zip(rhs.c) {
            *a += b;
        }
        Self { c }
    }
}

impl Sub for Polynomial {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        self + (-rhs)
    }
}

impl Neg for Polynomial {
    type Output = Self;

    fn neg(self) -> Self {
        Self {
            c: self.c.map(|v| -v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eval_horner() {
        let p = Polynomial::cubic(1.0, 2.0, 3.0, 4.0);
        assert_eq!(p.eval(2.0), 1.0 + 4.0 + 12.0 + 32.0);
        assert_eq!(p.derivative(2.0), 2.0 + 12.0 + 48.0);
    }

    #[test]
    fn add_and_sub() {
        let a = Polynomial::quadratic(1.0, 2.0, 3.0);
        let b = Polynomial::loss(1.0);
        assert_eq!((a + b).c, [1.0, 2.0, 2.0, 0.0]);
        assert_eq!((a - a).c, [0.0; 4]);
    }

    #[test]
    fn solve_quadratic_target() {
        let p = Polynomial::quadratic(233.0, 5.9578, -4.95);
        let r = p.solve_for(100.0);
        assert!(r.fault.is_none());
        assert!((p.eval(r.flow) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn solve_cubic_target() {
        let p = Polynomial::cubic(0.6467, 0.0082, -0.0004, -0.00001);
        let r = p.solve_for(0.3);
        assert!(r.fault.is_none());
        assert!((p.eval(r.flow) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn cubic_without_root_flags() {
        // strictly positive for g >= 0 and increasing
        let p = Polynomial::cubic(5.0, 1.0, 1.0, 1.0);
        let r = p.solve_for(0.0);
        assert!(r.fault.is_some());
        assert_eq!(r.flow, 0.0);
    }
}
