//! Measurement images and grouping.
//!
//! Images are registered here by path; the engine opens the actual FITS
//! files. Header values the grouping step needs (`GroupBy::Keyword`) arrive
//! as a key/value map supplied by whoever loads the image, which keeps this
//! module free of any FITS I/O.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use thiserror::Error;

use crate::config::next_id;

#[derive(Debug, Error)]
pub enum GroupError {
    #[error("image group is already split")]
    AlreadySplit,
    #[error("invalid grouping pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Subgroup name for images a split criterion cannot place.
pub const UNMATCHED_GROUP: &str = "unmatched";

/// One measurement frame: the science image plus optional PSF and weight
/// companions, and the header values grouping may key on.
#[derive(Debug, Clone)]
pub struct MeasurementImage {
    id: u32,
    path: PathBuf,
    psf: Option<PathBuf>,
    weight: Option<PathBuf>,
    metadata: HashMap<String, String>,
}

impl MeasurementImage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            id: next_id(),
            path: path.into(),
            psf: None,
            weight: None,
            metadata: HashMap::new(),
        }
    }

    pub fn with_psf(mut self, path: impl Into<PathBuf>) -> Self {
        self.psf = Some(path.into());
        self
    }

    pub fn with_weight(mut self, path: impl Into<PathBuf>) -> Self {
        self.weight = Some(path.into());
        self
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn psf(&self) -> Option<&Path> {
        self.psf.as_deref()
    }

    pub fn weight(&self) -> Option<&Path> {
        self.weight.as_deref()
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.metadata.get(key).map(String::as_str)
    }

    fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
    }
}

/// Criterion for splitting an [`ImageGroup`] into named subgroups.
#[derive(Debug, Clone)]
pub enum GroupBy {
    /// Group by the value of a header keyword (e.g. `FILTER`).
    Keyword(String),
    /// Group by the first capture of a regex applied to the file name.
    Pattern(Regex),
}

impl GroupBy {
    pub fn keyword(key: impl Into<String>) -> Self {
        GroupBy::Keyword(key.into())
    }

    pub fn pattern(pattern: &str) -> Result<Self, GroupError> {
        Ok(GroupBy::Pattern(Regex::new(pattern)?))
    }

    fn subgroup_for(&self, image: &MeasurementImage) -> String {
        match self {
            GroupBy::Keyword(key) => image
                .header(key)
                .unwrap_or(UNMATCHED_GROUP)
                .to_string(),
            GroupBy::Pattern(re) => re
                .captures(image.file_name())
                .and_then(|c| c.get(1))
                .map(|m| m.as_str().to_string())
                .unwrap_or_else(|| UNMATCHED_GROUP.to_string()),
        }
    }
}

/// An ordered collection of measurement images, splittable once.
pub struct ImageGroup {
    images: Vec<Arc<MeasurementImage>>,
    subgroups: Option<Vec<(String, Vec<Arc<MeasurementImage>>)>>,
}

impl ImageGroup {
    pub fn new(images: impl IntoIterator<Item = MeasurementImage>) -> Self {
        Self {
            images: images.into_iter().map(Arc::new).collect(),
            subgroups: None,
        }
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn images(&self) -> &[Arc<MeasurementImage>] {
        &self.images
    }

    /// Partition the group into named subgroups.
    ///
    /// Subgroups appear in first-seen order; images keep their order within
    /// each subgroup. A group can only be split once.
    pub fn split(&mut self, by: GroupBy) -> Result<(), GroupError> {
        if self.subgroups.is_some() {
            return Err(GroupError::AlreadySplit);
        }
        let mut subgroups: Vec<(String, Vec<Arc<MeasurementImage>>)> = Vec::new();
        for image in &self.images {
            let name = by.subgroup_for(image);
            match subgroups.iter_mut().find(|(n, _)| *n == name) {
                Some((_, bucket)) => bucket.push(Arc::clone(image)),
                None => subgroups.push((name, vec![Arc::clone(image)])),
            }
        }
        self.subgroups = Some(subgroups);
        Ok(())
    }

    pub fn is_split(&self) -> bool {
        self.subgroups.is_some()
    }
}

/// Register one image per FITS path, in the given order.
pub fn load_fits_images<P: Into<PathBuf>>(paths: impl IntoIterator<Item = P>) -> ImageGroup {
    ImageGroup::new(paths.into_iter().map(MeasurementImage::new))
}

/// The named image tree handed to the measurement engine.
pub enum MeasurementGroup {
    Leaf(Vec<Arc<MeasurementImage>>),
    Branch(Vec<(String, MeasurementGroup)>),
}

impl From<ImageGroup> for MeasurementGroup {
    fn from(group: ImageGroup) -> Self {
        match group.subgroups {
            None => MeasurementGroup::Leaf(group.images),
            Some(subgroups) => MeasurementGroup::Branch(
                subgroups
                    .into_iter()
                    .map(|(name, images)| (name, MeasurementGroup::Leaf(images)))
                    .collect(),
            ),
        }
    }
}

impl MeasurementGroup {
    /// All images with their slash-qualified subgroup path, in insertion
    /// order. Images directly under the root get an empty path.
    pub fn iter(&self) -> Vec<(String, &Arc<MeasurementImage>)> {
        let mut out = Vec::new();
        self.collect("", &mut out);
        out
    }

    fn collect<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a Arc<MeasurementImage>)>) {
        match self {
            MeasurementGroup::Leaf(images) => {
                for image in images {
                    out.push((prefix.to_string(), image));
                }
            }
            MeasurementGroup::Branch(subgroups) => {
                for (name, sub) in subgroups {
                    let path = if prefix.is_empty() {
                        name.clone()
                    } else {
                        format!("{prefix}/{name}")
                    };
                    sub.collect(&path, out);
                }
            }
        }
    }
}
