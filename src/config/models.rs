//! Source-model declarations for the fitting engine.
//!
//! A model ties parameters together into a profile the engine rasterizes and
//! fits against a measurement group. Exponential and de Vaucouleurs profiles
//! are Sérsic profiles with the index pinned to 1 and 4.

use std::sync::Arc;

use thiserror::Error;

use crate::config::images::MeasurementGroup;
use crate::config::params::{ParamError, Parameter};

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("a fitting group needs at least one model")]
    NoModels,
}

/// Sérsic-family shape parameters shared by the extended profiles.
#[derive(Debug, Clone)]
pub struct SersicShape {
    pub effective_radius: Arc<Parameter>,
    pub aspect: Arc<Parameter>,
    pub angle: Arc<Parameter>,
}

#[derive(Debug, Clone)]
pub enum Model {
    PointSource {
        x: Arc<Parameter>,
        y: Arc<Parameter>,
        flux: Arc<Parameter>,
    },
    Sersic {
        x: Arc<Parameter>,
        y: Arc<Parameter>,
        flux: Arc<Parameter>,
        shape: SersicShape,
        index: Arc<Parameter>,
    },
}

impl Model {
    pub fn point_source(x: Arc<Parameter>, y: Arc<Parameter>, flux: Arc<Parameter>) -> Self {
        Model::PointSource { x, y, flux }
    }

    pub fn sersic(
        x: Arc<Parameter>,
        y: Arc<Parameter>,
        flux: Arc<Parameter>,
        shape: SersicShape,
        index: Arc<Parameter>,
    ) -> Self {
        Model::Sersic {
            x,
            y,
            flux,
            shape,
            index,
        }
    }

    /// Sérsic profile with index fixed at 1.
    pub fn exponential(
        x: Arc<Parameter>,
        y: Arc<Parameter>,
        flux: Arc<Parameter>,
        shape: SersicShape,
    ) -> Result<Self, ParamError> {
        Ok(Self::sersic(x, y, flux, shape, Parameter::constant(1.0)?))
    }

    /// Sérsic profile with index fixed at 4.
    pub fn de_vaucouleurs(
        x: Arc<Parameter>,
        y: Arc<Parameter>,
        flux: Arc<Parameter>,
        shape: SersicShape,
    ) -> Result<Self, ParamError> {
        Ok(Self::sersic(x, y, flux, shape, Parameter::constant(4.0)?))
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Model::PointSource { .. } => "point source",
            Model::Sersic { .. } => "Sersic",
        }
    }

    /// All parameters of this model, in a fixed field order.
    ///
    /// This is the enumeration the engine handoff walks when wiring model
    /// variables to the fitter.
    pub fn parameters(&self) -> Vec<Arc<Parameter>> {
        match self {
            Model::PointSource { x, y, flux } => {
                vec![Arc::clone(x), Arc::clone(y), Arc::clone(flux)]
            }
            Model::Sersic {
                x,
                y,
                flux,
                shape,
                index,
            } => vec![
                Arc::clone(x),
                Arc::clone(y),
                Arc::clone(flux),
                Arc::clone(&shape.effective_radius),
                Arc::clone(&shape.aspect),
                Arc::clone(&shape.angle),
                Arc::clone(index),
            ],
        }
    }
}

/// Ordered list of models attached to one measurement group.
#[derive(Debug, Default)]
pub struct ModelStack {
    models: Vec<Model>,
}

impl ModelStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&mut self, model: Model) {
        self.models.push(model);
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}

/// Measurement groups enrolled for model fitting, with the models fitted
/// against each. This is the model-fitting side of the engine handoff.
#[derive(Default)]
pub struct FittingGroups {
    entries: Vec<(MeasurementGroup, ModelStack)>,
}

impl FittingGroups {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enroll a group with its models; a group with nothing to fit is
    /// rejected.
    pub fn enroll(
        &mut self,
        group: MeasurementGroup,
        models: ModelStack,
    ) -> Result<(), ModelError> {
        if models.is_empty() {
            return Err(ModelError::NoModels);
        }
        self.entries.push((group, models));
        Ok(())
    }

    pub fn entries(&self) -> impl Iterator<Item = (&MeasurementGroup, &ModelStack)> {
        self.entries.iter().map(|(g, m)| (g, m))
    }

    /// Every fit variable across all enrolled groups, first-seen order,
    /// shared parameters listed once.
    pub fn parameters(&self) -> Vec<Arc<Parameter>> {
        let mut seen = Vec::new();
        let mut out: Vec<Arc<Parameter>> = Vec::new();
        for (_, stack) in &self.entries {
            for model in stack.models() {
                for param in model.parameters() {
                    if !seen.contains(&param.id()) {
                        seen.push(param.id());
                        out.push(param);
                    }
                }
            }
        }
        out
    }
}
