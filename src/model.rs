//! Model trait used by the fitting engine.
//!
//! The Levenberg-Marquardt engine is agnostic about what is being predicted:
//! it only needs, for each observation, a predicted value and the gradient of
//! that prediction with respect to every parameter. The [`FitModel`] trait is
//! that seam. The physical forward model lives in
//! [`models::flight_time`](crate::models::flight_time); tests drive the
//! engine with a plain linear model instead.

use ndarray::Array1;

use crate::error::Result;

/// The prediction for one observation at one trial parameter vector.
#[derive(Debug, Clone)]
pub struct ModelEval {
    /// Predicted observable (an arrival time, for the physical model).
    pub predicted: f64,

    /// Gradient of the prediction with respect to every parameter, in
    /// parameter order. Length equals [`FitModel::parameter_count`].
    pub gradient: Array1<f64>,
}

/// A forward model mapping a candidate parameter vector and a channel id to
/// a predicted observable and its parameter gradient.
pub trait FitModel {
    /// Number of parameters the model is defined over.
    fn parameter_count(&self) -> usize;

    /// Evaluate the model for one channel at the given trial parameters.
    ///
    /// # Arguments
    ///
    /// * `params` - The trial parameter vector, length `parameter_count()`
    /// * `channel` - The channel id of the observation being predicted
    ///
    /// # Returns
    ///
    /// * The predicted value and gradient, or an error if the channel id is
    ///   not evaluable (callers should validate ids up front)
    fn evaluate(&self, params: &Array1<f64>, channel: u32) -> Result<ModelEval>;
}
