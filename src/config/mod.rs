//! Measurement-run configuration surface.
//!
//! This module hosts everything a configuration script builds before the
//! engine takes over:
//!
//! - measurement images and grouping (`images`)
//! - model-fitting parameters (`params`)
//! - source models (`models`)
//! - aperture specifications (`apertures`)

use std::sync::atomic::{AtomicU32, Ordering};

pub mod apertures;
pub mod images;
pub mod models;
pub mod params;

pub use apertures::Aperture;
pub use images::{GroupBy, ImageGroup, MeasurementGroup, MeasurementImage, load_fits_images};
pub use models::{FittingGroups, Model, ModelStack, SersicShape};
pub use params::{
    FluxType, Parameter, Range, RangeType, describe_parameters, flux_parameter, pos_parameters,
};

static NEXT_ID: AtomicU32 = AtomicU32::new(0);

/// Process-unique id for parameters and images.
///
/// Ids are identity labels for the engine handoff, nothing more; the atomic
/// only guarantees uniqueness, not any particular numbering.
pub(crate) fn next_id() -> u32 {
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}
