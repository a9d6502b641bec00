//! Bracketed bisection on a scalar residual.
//!
//! The search is an explicit state machine so that callers can drive it
//! step by step (`next_guess` / `report`) or in one call (`Bisection::run`).
//! Exhausting the iteration cap is not an error: the outcome carries the
//! best guess seen and `BisectionState::Exhausted`.

use crate::{PfError, PfResult, Real, ensure_finite};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BisectionState {
    /// Waiting for the caller to request the next guess.
    Guessing,
    /// A guess is out; waiting for its residual.
    Evaluating,
    Converged,
    Exhausted,
}

impl BisectionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Converged | Self::Exhausted)
    }
}

/// How the residual moves as the unknown grows.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Slope {
    Increasing,
    Decreasing,
}

#[derive(Clone, Copy, Debug)]
pub struct BisectionConfig {
    pub lower: Real,
    pub upper: Real,
    /// Converged when `|residual| < tolerance`.
    pub tolerance: Real,
    pub max_iterations: usize,
    pub slope: Slope,
}

impl Default for BisectionConfig {
    fn default() -> Self {
        Self {
            lower: 0.0,
            upper: 1.0,
            tolerance: 1e-3,
            max_iterations: 30,
            slope: Slope::Increasing,
        }
    }
}

impl BisectionConfig {
    pub fn new(lower: Real, upper: Real, tolerance: Real, slope: Slope) -> Self {
        Self {
            lower,
            upper,
            tolerance,
            slope,
            ..Self::default()
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn validate(&self) -> PfResult<()> {
        ensure_finite(self.lower, "bisection lower bound")?;
        ensure_finite(self.upper, "bisection upper bound")?;
        ensure_finite(self.tolerance, "bisection tolerance")?;
        if self.lower >= self.upper {
            return Err(PfError::InvalidArg {
                what: "bisection bracket must satisfy lower < upper",
            });
        }
        if self.tolerance <= 0.0 {
            return Err(PfError::InvalidArg {
                what: "bisection tolerance must be positive",
            });
        }
        if self.max_iterations == 0 {
            return Err(PfError::InvalidArg {
                what: "bisection needs at least one iteration",
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BisectionOutcome {
    pub x: Real,
    pub residual: Real,
    pub iterations: usize,
    pub state: BisectionState,
}

impl BisectionOutcome {
    pub fn converged(&self) -> bool {
        self.state == BisectionState::Converged
    }
}

#[derive(Clone, Debug)]
pub struct Bisection {
    cfg: BisectionConfig,
    low: Real,
    high: Real,
    state: BisectionState,
    iterations: usize,
    pending: Real,
    best: Option<(Real, Real)>,
}

impl Bisection {
    pub fn new(cfg: BisectionConfig) -> PfResult<Self> {
        cfg.validate()?;
        Ok(Self {
            low: cfg.lower,
            high: cfg.upper,
            cfg,
            state: BisectionState::Guessing,
            iterations: 0,
            pending: 0.5 * (cfg.lower + cfg.upper),
            best: None,
        })
    }

    /// Drive the search to completion with `f` as the residual function.
    pub fn run<F>(cfg: BisectionConfig, mut f: F) -> PfResult<BisectionOutcome>
    where
        F: FnMut(Real) -> Real,
    {
        let mut search = Self::new(cfg)?;
        while let Some(x) = search.next_guess() {
            search.report(f(x));
        }
        Ok(search.outcome())
    }

    pub fn state(&self) -> BisectionState {
        self.state
    }

    pub fn iterations(&self) -> usize {
        self.iterations
    }

    pub fn bracket(&self) -> (Real, Real) {
        (self.low, self.high)
    }

    /// Midpoint of the current bracket, or `None` once terminal.
    ///
    /// Asking again before reporting returns the same guess.
    pub fn next_guess(&mut self) -> Option<Real> {
        match self.state {
            BisectionState::Guessing => {
                self.pending = 0.5 * (self.low + self.high);
                self.state = BisectionState::Evaluating;
                Some(self.pending)
            }
            BisectionState::Evaluating => Some(self.pending),
            BisectionState::Converged | BisectionState::Exhausted => None,
        }
    }

    /// Feed the residual at the outstanding guess and narrow the bracket.
    ///
    /// A non-finite residual counts as "too high" and is never kept as best.
    pub fn report(&mut self, residual: Real) -> BisectionState {
        if self.state != BisectionState::Evaluating {
            return self.state;
        }
        let x = self.pending;
        self.iterations += 1;

        if residual.is_finite() {
            let better = match self.best {
                Some((_, r)) => residual.abs() < r.abs(),
                None => true,
            };
            if better {
                self.best = Some((x, residual));
            }
            if residual.abs() < self.cfg.tolerance {
                self.state = BisectionState::Converged;
                return self.state;
            }
        }

        let too_high = !residual.is_finite() || residual > 0.0;
        match (self.cfg.slope, too_high) {
            (Slope::Increasing, true) | (Slope::Decreasing, false) => self.high = x,
            (Slope::Increasing, false) | (Slope::Decreasing, true) => self.low = x,
        }

        self.state = if self.iterations >= self.cfg.max_iterations {
            BisectionState::Exhausted
        } else {
            BisectionState::Guessing
        };
        self.state
    }

    /// Best guess so far (smallest finite |residual|).
    pub fn outcome(&self) -> BisectionOutcome {
        let (x, residual) = self
            .best
            .unwrap_or((0.5 * (self.low + self.high), Real::NAN));
        BisectionOutcome {
            x,
            residual,
            iterations: self.iterations,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_sqrt_two() {
        let cfg = BisectionConfig::new(0.0, 2.0, 1e-9, Slope::Increasing).with_max_iterations(80);
        let out = Bisection::run(cfg, |x| x * x - 2.0).unwrap();
        assert!(out.converged());
        assert!((out.x - 2.0_f64.sqrt()).abs() < 1e-8);
    }

    #[test]
    fn decreasing_residual() {
        let cfg =
            BisectionConfig::new(-10.0, 10.0, 1e-9, Slope::Decreasing).with_max_iterations(80);
        let out = Bisection::run(cfg, |x| 3.0 - x).unwrap();
        assert!(out.converged());
        assert!((out.x - 3.0).abs() < 1e-8);
    }

    #[test]
    fn exhaustion_keeps_best_guess() {
        let cfg = BisectionConfig::new(0.0, 1.0, 1e-15, Slope::Increasing).with_max_iterations(5);
        let out = Bisection::run(cfg, |x| x - 0.3).unwrap();
        assert_eq!(out.state, BisectionState::Exhausted);
        assert_eq!(out.iterations, 5);
        assert!((out.x - 0.3).abs() < 0.05);
    }

    #[test]
    fn step_by_step_states() {
        let cfg = BisectionConfig::new(0.0, 4.0, 1e-6, Slope::Increasing);
        let mut b = Bisection::new(cfg).unwrap();
        assert_eq!(b.state(), BisectionState::Guessing);
        let x = b.next_guess().unwrap();
        assert_eq!(x, 2.0);
        assert_eq!(b.state(), BisectionState::Evaluating);
        // asking twice yields the same outstanding guess
        assert_eq!(b.next_guess(), Some(2.0));
        assert_eq!(b.report(1.0), BisectionState::Guessing);
        assert_eq!(b.bracket(), (0.0, 2.0));
        let x = b.next_guess().unwrap();
        assert_eq!(x, 1.0);
        assert_eq!(b.report(0.0), BisectionState::Converged);
        assert_eq!(b.next_guess(), None);
    }

    #[test]
    fn nan_residual_narrows_downward() {
        let cfg = BisectionConfig::new(0.0, 4.0, 1e-6, Slope::Increasing);
        let mut b = Bisection::new(cfg).unwrap();
        b.next_guess();
        b.report(Real::NAN);
        assert_eq!(b.bracket(), (0.0, 2.0));
        assert!(b.outcome().residual.is_nan());
    }

    #[test]
    fn rejects_bad_bracket() {
        let cfg = BisectionConfig::new(1.0, 1.0, 1e-6, Slope::Increasing);
        assert!(Bisection::new(cfg).is_err());
        let cfg = BisectionConfig::new(0.0, 1.0, 0.0, Slope::Increasing);
        assert!(Bisection::new(cfg).is_err());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn terminates_within_cap(root in -50.0f64..50.0, cap in 1usize..40) {
                let cfg = BisectionConfig::new(-100.0, 100.0, 1e-6, Slope::Increasing)
                    .with_max_iterations(cap);
                let out = Bisection::run(cfg, |x| x - root).unwrap();
                prop_assert!(out.iterations <= cap);
                prop_assert!(out.state.is_terminal());
                prop_assert!(out.x >= -100.0 && out.x <= 100.0);
            }
        }
    }
}
