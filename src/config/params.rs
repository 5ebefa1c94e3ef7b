//! Model-fitting parameters.
//!
//! A `Parameter` is one variable the external fitting engine will solve for
//! (or hold fixed, or derive). Configuration scripts build them, wire them
//! into models, and optionally register them as output columns. Nothing in
//! this module fits anything; `value()` only exists so a script can
//! sanity-check a dependent parameter's arithmetic before a run.

use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use thiserror::Error;

use crate::config::next_id;
use crate::output::{ColumnParam, ParamKind};

#[derive(Debug, Error)]
pub enum ParamError {
    #[error("range [{min}, {max}] is not a valid {ty:?} range")]
    InvalidRange { min: f64, max: f64, ty: RangeType },
    #[error("initial value {initial} lies outside [{min}, {max}]")]
    InitialOutOfRange { initial: f64, min: f64, max: f64 },
    #[error("value {0} is not finite")]
    NonFinite(f64),
    #[error("dependent parameter needs at least one input")]
    NoInputs,
}

/// How the engine samples a free parameter's range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeType {
    Linear,
    Exponential,
}

/// Bounds for a free parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    min: f64,
    max: f64,
    ty: RangeType,
}

impl Range {
    pub fn linear(min: f64, max: f64) -> Result<Self, ParamError> {
        Self::new(min, max, RangeType::Linear)
    }

    /// Exponential ranges must be strictly positive.
    pub fn exponential(min: f64, max: f64) -> Result<Self, ParamError> {
        Self::new(min, max, RangeType::Exponential)
    }

    fn new(min: f64, max: f64, ty: RangeType) -> Result<Self, ParamError> {
        let ordered = min.is_finite() && max.is_finite() && min < max;
        let positive = ty == RangeType::Linear || min > 0.0;
        if !(ordered && positive) {
            return Err(ParamError::InvalidRange { min, max, ty });
        }
        Ok(Self { min, max, ty })
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn range_type(&self) -> RangeType {
        self.ty
    }

    pub fn contains(&self, v: f64) -> bool {
        v >= self.min && v <= self.max
    }
}

/// Which measured flux seeds a flux parameter's initial guess.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FluxType {
    Iso,
    Auto,
}

type DependFn = Box<dyn Fn(&[f64]) -> f64 + Send + Sync>;

enum Form {
    Constant(f64),
    Free {
        initial: f64,
        range: Range,
        seed: Option<FluxType>,
    },
    Dependent {
        inputs: Vec<Arc<Parameter>>,
        func: DependFn,
    },
}

/// One engine-facing fit variable with a process-unique id.
///
/// Handles are shared (`Arc`): a model field, an output column and a
/// dependent parameter's input list may all point at the same object, and
/// the engine resolves result columns by id against those same objects.
pub struct Parameter {
    id: u32,
    form: Form,
}

impl Parameter {
    /// A value the engine holds fixed.
    pub fn constant(value: f64) -> Result<Arc<Self>, ParamError> {
        if !value.is_finite() {
            return Err(ParamError::NonFinite(value));
        }
        Ok(Arc::new(Self {
            id: next_id(),
            form: Form::Constant(value),
        }))
    }

    /// A value the engine solves for, starting from `initial` within `range`.
    pub fn free(initial: f64, range: Range) -> Result<Arc<Self>, ParamError> {
        if !initial.is_finite() {
            return Err(ParamError::NonFinite(initial));
        }
        if !range.contains(initial) {
            return Err(ParamError::InitialOutOfRange {
                initial,
                min: range.min,
                max: range.max,
            });
        }
        Ok(Arc::new(Self {
            id: next_id(),
            form: Form::Free {
                initial,
                range,
                seed: None,
            },
        }))
    }

    /// A value derived from other parameters by `func`.
    ///
    /// `func` receives the current values of `inputs` in order.
    pub fn dependent(
        inputs: Vec<Arc<Parameter>>,
        func: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    ) -> Result<Arc<Self>, ParamError> {
        if inputs.is_empty() {
            return Err(ParamError::NoInputs);
        }
        Ok(Arc::new(Self {
            id: next_id(),
            form: Form::Dependent {
                inputs,
                func: Box::new(func),
            },
        }))
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn range(&self) -> Option<Range> {
        match &self.form {
            Form::Free { range, .. } => Some(*range),
            _ => None,
        }
    }

    /// Seed policy, set only by [`flux_parameter`].
    pub fn seed_policy(&self) -> Option<FluxType> {
        match &self.form {
            Form::Free { seed, .. } => *seed,
            _ => None,
        }
    }

    /// Current value: the constant, the free initial guess, or the derived
    /// value computed from the inputs' current values.
    pub fn value(&self) -> f64 {
        match &self.form {
            Form::Constant(v) => *v,
            Form::Free { initial, .. } => *initial,
            Form::Dependent { inputs, func } => {
                let vals: Vec<f64> = inputs.iter().map(|p| p.value()).collect();
                func(&vals)
            }
        }
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.form {
            Form::Constant(v) => write!(f, "Constant {{ id: {}, value: {v} }}", self.id),
            Form::Free { initial, range, seed } => write!(
                f,
                "Free {{ id: {}, initial: {initial}, range: {range:?}, seed: {seed:?} }}",
                self.id
            ),
            Form::Dependent { inputs, .. } => {
                let ids: Vec<u32> = inputs.iter().map(|p| p.id).collect();
                write!(f, "Dependent {{ id: {}, inputs: {ids:?} }}", self.id)
            }
        }
    }
}

impl ColumnParam for Parameter {
    fn kind(&self) -> Option<ParamKind> {
        Some(ParamKind::ModelFitting)
    }

    fn label(&self) -> String {
        match &self.form {
            Form::Constant(v) => format!("const#{}({v})", self.id),
            Form::Free { initial, .. } => format!("free#{}({initial})", self.id),
            Form::Dependent { inputs, .. } => {
                let ids: Vec<String> = inputs.iter().map(|p| format!("#{}", p.id)).collect();
                format!("dep#{}({})", self.id, ids.join(", "))
            }
        }
    }
}

/// Free x/y offsets from the detection centroid, bounded by `offset` pixels.
pub fn pos_parameters(offset: f64) -> Result<(Arc<Parameter>, Arc<Parameter>), ParamError> {
    let range = Range::linear(-offset, offset)?;
    let x = Parameter::free(0.0, range)?;
    let y = Parameter::free(0.0, range)?;
    Ok((x, y))
}

/// Free flux parameter seeded from the given measured flux.
///
/// The range spans three decades either side of `scale`, sampled
/// exponentially; the engine replaces `scale` with the per-source value
/// selected by `seed`.
pub fn flux_parameter(scale: f64, seed: FluxType) -> Result<Arc<Parameter>, ParamError> {
    if !scale.is_finite() {
        return Err(ParamError::NonFinite(scale));
    }
    let range = Range::exponential(scale * 1e-3, scale * 1e3)?;
    Ok(Arc::new(Parameter {
        id: next_id(),
        form: Form::Free {
            initial: scale,
            range,
            seed: Some(seed),
        },
    }))
}

/// Dump parameters to `sink`, one `label = value` line each, in order.
///
/// Handy in configuration scripts for checking dependent-parameter
/// arithmetic before a run.
pub fn describe_parameters(params: &[Arc<Parameter>], sink: &mut dyn Write) -> io::Result<()> {
    for param in params {
        writeln!(sink, "{} = {}", param.label(), param.value())?;
    }
    Ok(())
}

/// `describe_parameters` to standard error.
pub fn describe_parameters_stderr(params: &[Arc<Parameter>]) -> io::Result<()> {
    describe_parameters(params, &mut io::stderr().lock())
}
