//! Linear test model for exercising the fitting engine without a detector.

use ndarray::{array, Array1};

use crate::error::{FitError, Result};
use crate::model::{FitModel, ModelEval};

/// A two-parameter linear model, `predicted = a + b * channel`.
///
/// The channel id doubles as the independent variable. Exactly solvable, so
/// the engine must recover (a, b) from noiseless data to near machine
/// precision; used by the integration tests and the benchmark.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearTimeModel;

impl FitModel for LinearTimeModel {
    fn parameter_count(&self) -> usize {
        2
    }

    fn evaluate(&self, params: &Array1<f64>, channel: u32) -> Result<ModelEval> {
        if params.len() != 2 {
            return Err(FitError::DimensionMismatch(format!(
                "Expected 2 parameters, got {}",
                params.len()
            )));
        }
        let x = channel as f64;
        Ok(ModelEval {
            predicted: params[0] + params[1] * x,
            gradient: array![1.0, x],
        })
    }
}
