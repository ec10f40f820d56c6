//! Hard and soft property setters.
//!
//! A hard setting is load-bearing: any failure aborts the caller. A soft
//! setting is an optional knob the host may not support; a rejection is
//! logged and skipped, but a lost connection still propagates. Settings that
//! move, resize or rename an object can never be soft.

use log::{info, warn};
use serde::Serialize;

use crate::session::{HostError, HostSession, ObjectKind, Property};

/// Whether a setting must succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Hard,
    Soft,
}

/// Result of a soft setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoftOutcome {
    Applied,
    /// The host rejected the setting; carries the host's reason.
    Skipped(String),
}

/// Apply `property`, propagating every failure.
pub fn set_hard<S: HostSession + ?Sized>(
    session: &mut S,
    property: &Property,
) -> Result<(), HostError> {
    session.set(property)
}

/// Apply `property`, downgrading a host rejection to [`SoftOutcome::Skipped`].
///
/// # Errors
/// - [`HostError::NotSoftSettable`] for geometry-affecting properties, before
///   any host call.
/// - Any host failure other than [`HostError::Rejected`].
pub fn set_soft<S: HostSession + ?Sized>(
    session: &mut S,
    property: &Property,
) -> Result<SoftOutcome, HostError> {
    if property.affects_geometry() {
        return Err(HostError::NotSoftSettable(property.key()));
    }
    match session.set(property) {
        Ok(()) => Ok(SoftOutcome::Applied),
        Err(HostError::Rejected { key, reason }) => {
            warn!("Skipping optional setting '{}' = {}: {}", key, property.script_value(), reason);
            Ok(SoftOutcome::Skipped(reason))
        }
        Err(e) => Err(e),
    }
}

/// A property together with how strictly it must be applied.
#[derive(Debug, Clone, PartialEq)]
pub struct Setting {
    pub property: Property,
    pub requirement: Requirement,
}

/// An object to create and the settings to apply to it, in order.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectSpec {
    pub kind: ObjectKind,
    pub settings: Vec<Setting>,
}

impl ObjectSpec {
    pub fn new(kind: ObjectKind) -> Self {
        Self { kind, settings: Vec::new() }
    }

    /// Append a hard setting.
    pub fn hard(mut self, property: Property) -> Self {
        self.settings.push(Setting { property, requirement: Requirement::Hard });
        self
    }

    /// Append a soft setting.
    pub fn soft(mut self, property: Property) -> Self {
        self.settings.push(Setting { property, requirement: Requirement::Soft });
        self
    }

    /// Name given by the first `Name` setting.
    pub fn name(&self) -> Option<&str> {
        self.settings.iter().find_map(|s| match &s.property {
            Property::Name(n) => Some(n.as_str()),
            _ => None,
        })
    }

    pub fn get(&self, key: &str) -> Option<&Setting> {
        self.settings.iter().find(|s| s.property.key() == key)
    }
}

/// A soft setting the host declined.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSetting {
    pub object: Option<String>,
    pub key: String,
    pub reason: String,
}

/// Outcome of applying one or more [`ObjectSpec`]s.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SetupReport {
    pub objects: usize,
    pub applied: usize,
    pub skipped: Vec<SkippedSetting>,
}

impl SetupReport {
    pub fn merge(&mut self, other: SetupReport) {
        self.objects += other.objects;
        self.applied += other.applied;
        self.skipped.extend(other.skipped);
    }
}

/// Create the object described by `spec` and apply its settings in order.
pub fn apply_object<S: HostSession + ?Sized>(
    session: &mut S,
    spec: &ObjectSpec,
) -> Result<SetupReport, HostError> {
    let label = spec.name().unwrap_or(spec.kind.command());
    info!("Adding {} ({} settings)", label, spec.settings.len());

    session.add_object(spec.kind)?;
    let mut report = SetupReport { objects: 1, ..Default::default() };

    for setting in &spec.settings {
        match setting.requirement {
            Requirement::Hard => {
                set_hard(session, &setting.property)?;
                report.applied += 1;
            }
            Requirement::Soft => match set_soft(session, &setting.property)? {
                SoftOutcome::Applied => report.applied += 1,
                SoftOutcome::Skipped(reason) => report.skipped.push(SkippedSetting {
                    object: spec.name().map(str::to_string),
                    key: setting.property.key(),
                    reason,
                }),
            },
        }
    }
    Ok(report)
}
