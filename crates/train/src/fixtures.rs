//! Small models and gradient providers shared by this crate's tests.

use std::convert::Infallible;

use thiserror::Error;
use trellis_core::{
    Example, GradientProvider, Gradients, Loss, Model, Parameterized, Projectable,
    ProjectionReport,
};

/// `y = slope * x + intercept`, optionally with a lower bound on the slope.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Line {
    slope: [f64; 1],
    intercept: [f64; 1],
    min_slope: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum LineParam {
    Slope,
    Intercept,
}

impl Line {
    pub(crate) fn new(slope: f64, intercept: f64) -> Self {
        Self {
            slope: [slope],
            intercept: [intercept],
            min_slope: None,
        }
    }

    pub(crate) fn with_min_slope(mut self, min: f64) -> Self {
        self.min_slope = Some(min);
        self
    }

    pub(crate) fn slope(&self) -> f64 {
        self.slope[0]
    }

    pub(crate) fn intercept(&self) -> f64 {
        self.intercept[0]
    }
}

impl Model for Line {
    type Input = [f64];
    type Output = Vec<f64>;
    type Error = Infallible;

    fn call(&self, input: &[f64]) -> Result<Vec<f64>, Infallible> {
        Ok(vec![self.slope() * input[0] + self.intercept()])
    }
}

impl Parameterized for Line {
    type Id = LineParam;

    fn param_ids(&self) -> Vec<LineParam> {
        vec![LineParam::Slope, LineParam::Intercept]
    }

    fn params(&self, id: LineParam) -> Option<&[f64]> {
        Some(match id {
            LineParam::Slope => &self.slope[..],
            LineParam::Intercept => &self.intercept[..],
        })
    }

    fn params_mut(&mut self, id: LineParam) -> Option<&mut [f64]> {
        Some(match id {
            LineParam::Slope => &mut self.slope[..],
            LineParam::Intercept => &mut self.intercept[..],
        })
    }
}

impl Projectable for Line {
    fn project(&mut self) -> ProjectionReport {
        if let Some(min) = self.min_slope {
            self.slope[0] = self.slope[0].max(min);
        }
        ProjectionReport::trivial()
    }
}

/// Exact gradients of the mean squared error for [`Line`].
///
/// Ignores the loss it is given.
pub(crate) struct Analytic;

impl GradientProvider<Line> for Analytic {
    type Error = Infallible;

    fn gradients<L: Loss + ?Sized>(
        &self,
        model: &Line,
        batch: &[Example],
        _loss: &L,
    ) -> Result<Gradients<LineParam>, Infallible> {
        let mut slope = 0.0;
        let mut intercept = 0.0;
        for example in batch {
            let x = example.features[0];
            let residual = model.slope() * x + model.intercept() - example.target[0];
            slope += 2.0 * residual * x;
            intercept += 2.0 * residual;
        }

        #[allow(clippy::cast_precision_loss)]
        let count = batch.len().max(1) as f64;

        let mut gradients = Gradients::new();
        gradients.insert(LineParam::Slope, vec![slope / count]);
        gradients.insert(LineParam::Intercept, vec![intercept / count]);
        Ok(gradients)
    }
}

#[derive(Debug, Error)]
#[error("gradient backend unavailable")]
pub(crate) struct Unavailable;

/// Always fails.
pub(crate) struct BrokenProvider;

impl GradientProvider<Line> for BrokenProvider {
    type Error = Unavailable;

    fn gradients<L: Loss + ?Sized>(
        &self,
        _model: &Line,
        _batch: &[Example],
        _loss: &L,
    ) -> Result<Gradients<LineParam>, Unavailable> {
        Err(Unavailable)
    }
}

/// Returns a two-entry gradient for the one-entry slope group.
pub(crate) struct MisshapenProvider;

impl GradientProvider<Line> for MisshapenProvider {
    type Error = Infallible;

    fn gradients<L: Loss + ?Sized>(
        &self,
        _model: &Line,
        _batch: &[Example],
        _loss: &L,
    ) -> Result<Gradients<LineParam>, Infallible> {
        let mut gradients = Gradients::new();
        gradients.insert(LineParam::Slope, vec![1.0, 1.0]);
        Ok(gradients)
    }
}
