//! Aperture-photometry specifications.

use std::sync::Arc;

use thiserror::Error;

use crate::output::{ColumnParam, ParamKind};

#[derive(Debug, Error)]
pub enum ApertureError {
    #[error("aperture needs at least one radius")]
    NoRadii,
    #[error("aperture radius {0} is not a positive finite number")]
    BadRadius(f64),
}

/// A set of circular flux-measurement regions, radii in pixels.
///
/// One `Aperture` yields one output column per radius; registering it as an
/// output column hands the whole radii list to the photometry stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Aperture {
    radii: Vec<f64>,
}

impl Aperture {
    pub fn new(radii: Vec<f64>) -> Result<Arc<Self>, ApertureError> {
        if radii.is_empty() {
            return Err(ApertureError::NoRadii);
        }
        for &r in &radii {
            if !(r.is_finite() && r > 0.0) {
                return Err(ApertureError::BadRadius(r));
            }
        }
        Ok(Arc::new(Self { radii }))
    }

    pub fn radii(&self) -> &[f64] {
        &self.radii
    }
}

impl ColumnParam for Aperture {
    fn kind(&self) -> Option<ParamKind> {
        Some(ParamKind::Aperture)
    }

    fn label(&self) -> String {
        let radii: Vec<String> = self.radii.iter().map(|r| r.to_string()).collect();
        format!("aper({})", radii.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_positive_radii_only() {
        assert!(Aperture::new(vec![3.0, 5.0, 10.0]).is_ok());
        assert!(matches!(Aperture::new(vec![]).unwrap_err(), ApertureError::NoRadii));
        assert!(matches!(
            Aperture::new(vec![3.0, 0.0]).unwrap_err(),
            ApertureError::BadRadius(_)
        ));
        assert!(Aperture::new(vec![f64::NAN]).is_err());
        assert!(Aperture::new(vec![-2.0]).is_err());
    }

    #[test]
    fn label_lists_radii_in_order() {
        let aper = Aperture::new(vec![3.0, 5.5]).unwrap();
        assert_eq!(aper.label(), "aper(3, 5.5)");
        assert_eq!(aper.kind(), Some(ParamKind::Aperture));
    }
}
