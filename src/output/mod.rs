//! The output-column registry.
//!
//! Configuration scripts name groups of column-producing parameters
//! (model-fitting parameters or apertures); the catalog writer later walks
//! the registry to materialize one catalog column set per group. The registry
//! only files and reports; it never evaluates anything.
//!
//! `OutputRegistry` is an owned context object. Build one per configuration
//! run and mutate it from a single thread during the configuration phase;
//! there is no interior mutability and the type is not meant to be shared
//! across threads while registration is still happening.

use std::collections::HashSet;
use std::fmt;
use std::io::{self, Write};
use std::sync::Arc;

use thiserror::Error;

/// Which bucket a registered group is filed under.
///
/// Declaration order here is the order `describe` reports buckets in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParamKind {
    ModelFitting,
    Aperture,
}

impl ParamKind {
    pub const ALL: [ParamKind; 2] = [ParamKind::ModelFitting, ParamKind::Aperture];

    /// Section header used by `describe`.
    pub fn display_name(self) -> &'static str {
        match self {
            ParamKind::ModelFitting => "Model fitting parameters",
            ParamKind::Aperture => "Apertures",
        }
    }

    fn index(self) -> usize {
        match self {
            ParamKind::ModelFitting => 0,
            ParamKind::Aperture => 1,
        }
    }
}

/// A parameter-like entity that can be filed as an output column source.
///
/// Configuration types implement this; `kind` says which bucket (if any)
/// the type's columns belong to. Types that are parameter-like but produce
/// no catalog columns return `None` and are rejected at registration.
pub trait ColumnParam: fmt::Debug {
    fn kind(&self) -> Option<ParamKind>;

    /// Short label used in `describe` output, e.g. `free#3` or `aper(3, 5)`.
    fn label(&self) -> String;
}

/// Shared handle to a registered parameter.
///
/// The registry stores handles, not copies: the engine resolves columns
/// against the same objects the configuration script built.
pub type ParamRef = Arc<dyn ColumnParam + Send + Sync>;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("output column name must not be empty")]
    EmptyOutputName,
    #[error("output column '{0}' has an empty parameter list")]
    EmptyParameterSet(String),
    #[error("output column '{0}' is already registered")]
    DuplicateOutputName(String),
    #[error("output column '{name}': parameter {position} ({label}) produces no catalog columns")]
    UnknownParameterType {
        name: String,
        position: usize,
        label: String,
    },
    #[error("output column '{name}': parameter {position} is {found:?}, group was opened as {expected:?}")]
    MixedParameterKinds {
        name: String,
        position: usize,
        expected: ParamKind,
        found: ParamKind,
    },
}

/// One registered group: the user-chosen name plus its parameter handles.
#[derive(Clone)]
struct ColumnSet {
    name: String,
    params: Vec<ParamRef>,
}

/// Registry of named output-column groups, bucketed by parameter kind.
#[derive(Default)]
pub struct OutputRegistry {
    used_names: HashSet<String>,
    buckets: [Vec<ColumnSet>; ParamKind::ALL.len()],
}

impl OutputRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a named group of parameters under the kind of its first element.
    ///
    /// The whole group must be of one kind; a group that mixes model-fitting
    /// parameters and apertures is rejected. Validation happens before any
    /// mutation, so a failed call leaves the registry exactly as it was.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = ParamRef>,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RegistryError::EmptyOutputName);
        }
        let params: Vec<ParamRef> = params.into_iter().collect();
        if params.is_empty() {
            return Err(RegistryError::EmptyParameterSet(name));
        }
        if self.used_names.contains(&name) {
            return Err(RegistryError::DuplicateOutputName(name));
        }

        let kind = match params[0].kind() {
            Some(kind) => kind,
            None => {
                return Err(RegistryError::UnknownParameterType {
                    name,
                    position: 0,
                    label: params[0].label(),
                });
            }
        };
        for (position, param) in params.iter().enumerate().skip(1) {
            match param.kind() {
                Some(found) if found == kind => {}
                Some(found) => {
                    return Err(RegistryError::MixedParameterKinds {
                        name,
                        position,
                        expected: kind,
                        found,
                    });
                }
                None => {
                    return Err(RegistryError::UnknownParameterType {
                        name,
                        position,
                        label: param.label(),
                    });
                }
            }
        }

        self.used_names.insert(name.clone());
        self.buckets[kind.index()].push(ColumnSet { name, params });
        Ok(())
    }

    /// Single-parameter convenience, the common case in configuration scripts.
    pub fn register_one(
        &mut self,
        name: impl Into<String>,
        param: ParamRef,
    ) -> Result<(), RegistryError> {
        self.register(name, [param])
    }

    pub fn is_empty(&self) -> bool {
        self.used_names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.used_names.contains(name)
    }

    /// Registered groups of a given kind, in registration order.
    pub fn groups(&self, kind: ParamKind) -> impl Iterator<Item = (&str, &[ParamRef])> {
        self.buckets[kind.index()]
            .iter()
            .map(|set| (set.name.as_str(), set.params.as_slice()))
    }

    /// Write a human-readable summary of the registry to `sink`.
    ///
    /// One section per non-empty bucket, buckets in declaration order,
    /// groups in registration order. Read-only and safe to call repeatedly.
    pub fn describe(&self, sink: &mut dyn Write) -> io::Result<()> {
        for kind in ParamKind::ALL {
            let bucket = &self.buckets[kind.index()];
            if bucket.is_empty() {
                continue;
            }
            writeln!(sink, "{}:", kind.display_name())?;
            for set in bucket {
                let labels: Vec<String> = set.params.iter().map(|p| p.label()).collect();
                writeln!(sink, "  {} : [{}]", set.name, labels.join(", "))?;
            }
        }
        Ok(())
    }

    /// `describe` to standard error, where configuration summaries go by default.
    pub fn describe_stderr(&self) -> io::Result<()> {
        self.describe(&mut io::stderr().lock())
    }
}
