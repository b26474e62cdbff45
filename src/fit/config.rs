//! Configuration options for the Levenberg-Marquardt fit.

/// Configuration options for the Levenberg-Marquardt fit loop.
#[derive(Debug, Clone)]
pub struct FitConfig {
    /// Initial value for the damping parameter. Default: 1e-3
    pub lambda_init: f64,

    /// Factor by which to increase lambda on a rejected step. Default: 10.0
    pub lambda_up: f64,

    /// Factor by which to decrease lambda on an accepted step. Default: 0.1
    pub lambda_down: f64,

    /// Chi-square must change by more than this to warrant further
    /// iteration. Default: 1.0
    pub tolerance: f64,

    /// Hard cap on the number of iterations. Default: 1000
    pub max_iterations: usize,

    /// Number of consecutive small-change iterations required before the
    /// fit is declared converged. Default: 4
    pub required_good_iterations: usize,

    /// Capacity of the per-observation diagnostic buffers; contributions
    /// beyond this are silently dropped. Default: 10000
    pub diagnostics_capacity: usize,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            lambda_init: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            tolerance: 1.0,
            max_iterations: 1000,
            required_good_iterations: 4,
            diagnostics_capacity: 10000,
        }
    }
}

impl FitConfig {
    /// Set the convergence tolerance on the chi-square change.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Set the maximum number of iterations.
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    /// Set the initial value of the damping parameter.
    pub fn with_lambda_init(mut self, lambda: f64) -> Self {
        self.lambda_init = lambda;
        self
    }

    /// Set the number of consecutive small-change iterations required for
    /// convergence.
    pub fn with_required_good_iterations(mut self, count: usize) -> Self {
        self.required_good_iterations = count;
        self
    }
}
