//! Host session abstraction.
//!
//! The [`HostSession`] trait isolates the splitter workflow from the
//! simulation tool that executes it. Objects are created one at a time; every
//! [`Property`] is applied to the current selection, which is the most
//! recently added object unless [`HostSession::select`] says otherwise.
//!
//! [`RecordingSession`] is the in-memory implementation used by tests and by
//! the command-line tool to emit a host script.

use std::collections::HashMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors originating from a host session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum HostError {
    #[error("Host not available: {0}")]
    Unavailable(String),

    #[error("Host rejected '{key}': {reason}")]
    Rejected { key: String, reason: String },

    #[error("Property '{0}' affects geometry and cannot be soft-set")]
    NotSoftSettable(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Kind of object the host can create.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ObjectKind {
    /// 2.5D variational FDTD region.
    VarFdtdRegion,
    /// 3D FDTD region.
    FdtdRegion,
    Rectangle,
    Polygon,
    ModeSource,
    PowerMonitor,
    MeshOverride,
}

impl ObjectKind {
    /// Script command that creates this object.
    pub fn command(&self) -> &'static str {
        match self {
            Self::VarFdtdRegion => "addvarfdtd",
            Self::FdtdRegion => "addfdtd",
            Self::Rectangle => "addrect",
            Self::Polygon => "addpoly",
            Self::ModeSource => "addmode",
            Self::PowerMonitor => "addpower",
            Self::MeshOverride => "addmesh",
        }
    }
}

/// Cartesian axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub fn label(&self) -> &'static str {
        match self {
            Self::X => "x",
            Self::Y => "y",
            Self::Z => "z",
        }
    }
}

/// Lower or upper face of a region along an axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BoundaryCondition {
    Pml,
    Metal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
}

/// Orientation of a planar power monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonitorType {
    XNormal2D,
    ZNormal2D,
}

/// A single setting applied to the selected host object.
///
/// Each variant maps to exactly one vendor key; lengths are in metres and
/// times in seconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Property {
    Name(String),
    Position(Axis, f64),
    Span(Axis, f64),
    MeshAccuracy(u8),
    SimulationTime(f64),
    Boundary(Axis, Side, BoundaryCondition),
    Index(f64),
    Alpha(f64),
    InjectionAxis(Axis),
    Direction(Direction),
    WavelengthStart(f64),
    WavelengthStop(f64),
    ModeSelection(String),
    MonitorType(MonitorType),
    MeshStep(Axis, f64),
    /// Polygon outline as `(x, y)` pairs.
    Vertices(Vec<[f64; 2]>),
}

impl Property {
    /// Vendor key for this setting, e.g. `"x span"` or `"y min bc"`.
    pub fn key(&self) -> String {
        match self {
            Self::Name(_) => "name".into(),
            Self::Position(axis, _) => axis.label().into(),
            Self::Span(axis, _) => format!("{} span", axis.label()),
            Self::MeshAccuracy(_) => "mesh accuracy".into(),
            Self::SimulationTime(_) => "simulation time".into(),
            Self::Boundary(axis, side, _) => {
                let side = match side {
                    Side::Min => "min",
                    Side::Max => "max",
                };
                format!("{} {} bc", axis.label(), side)
            }
            Self::Index(_) => "index".into(),
            Self::Alpha(_) => "alpha".into(),
            Self::InjectionAxis(_) => "injection axis".into(),
            Self::Direction(_) => "direction".into(),
            Self::WavelengthStart(_) => "wavelength start".into(),
            Self::WavelengthStop(_) => "wavelength stop".into(),
            Self::ModeSelection(_) => "mode selection".into(),
            Self::MonitorType(_) => "monitor type".into(),
            Self::MeshStep(axis, _) => format!("d{}", axis.label()),
            Self::Vertices(_) => "vertices".into(),
        }
    }

    /// Whether this setting changes where an object is, how large it is, or
    /// which object later calls refer to.
    pub fn affects_geometry(&self) -> bool {
        matches!(
            self,
            Self::Name(_) | Self::Position(..) | Self::Span(..) | Self::Vertices(_)
        )
    }

    /// The value as it appears in a host script.
    pub fn script_value(&self) -> String {
        match self {
            Self::Name(s) | Self::ModeSelection(s) => quote(s),
            Self::Position(_, v)
            | Self::Span(_, v)
            | Self::SimulationTime(v)
            | Self::Index(v)
            | Self::Alpha(v)
            | Self::WavelengthStart(v)
            | Self::WavelengthStop(v)
            | Self::MeshStep(_, v) => format_number(*v),
            Self::MeshAccuracy(n) => n.to_string(),
            Self::Boundary(_, _, bc) => quote(match bc {
                BoundaryCondition::Pml => "PML",
                BoundaryCondition::Metal => "Metal",
            }),
            Self::InjectionAxis(axis) => quote(&format!("{}-axis", axis.label())),
            Self::Direction(d) => quote(match d {
                Direction::Forward => "Forward",
                Direction::Backward => "Backward",
            }),
            Self::MonitorType(t) => quote(match t {
                MonitorType::XNormal2D => "2D X-normal",
                MonitorType::ZNormal2D => "2D Z-normal",
            }),
            Self::Vertices(vs) => {
                let rows: Vec<String> = vs
                    .iter()
                    .map(|[x, y]| format!("{},{}", format_number(*x), format_number(*y)))
                    .collect();
                format!("[{}]", rows.join(";"))
            }
        }
    }
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\\\""))
}

/// Shortest round-trip form; sub-millimetre magnitudes in exponent notation.
fn format_number(v: f64) -> String {
    if v == 0.0 {
        "0".into()
    } else if (1e-3..1e15).contains(&v.abs()) {
        format!("{}", v)
    } else {
        format!("{:e}", v)
    }
}

/// A live connection to the simulation host.
///
/// Implementations forward each call to the host and translate its failures
/// into [`HostError`]. A session is used by one caller at a time.
pub trait HostSession: Send {
    /// Create an object; it becomes the current selection.
    fn add_object(&mut self, kind: ObjectKind) -> Result<(), HostError>;

    /// Apply `property` to every selected object.
    fn set(&mut self, property: &Property) -> Result<(), HostError>;

    /// Select all objects called `name`. Returns whether any matched.
    fn select(&mut self, name: &str) -> Result<bool, HostError>;

    /// Delete every selected object and clear the selection.
    fn delete_selected(&mut self) -> Result<(), HostError>;
}

/// One call made against a [`RecordingSession`].
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Add(ObjectKind),
    Set(Property),
    Select(String),
    Delete,
}

impl Command {
    /// Render as one host script statement.
    pub fn to_script(&self) -> String {
        match self {
            Self::Add(kind) => format!("{};", kind.command()),
            Self::Set(p) => format!("set(\"{}\", {});", p.key(), p.script_value()),
            Self::Select(name) => format!("select({});", quote(name)),
            Self::Delete => "delete;".into(),
        }
    }
}

/// An object held by a [`RecordingSession`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedObject {
    pub kind: ObjectKind,
    /// Current settings, one per key, in first-set order.
    pub properties: Vec<Property>,
}

impl RecordedObject {
    fn new(kind: ObjectKind) -> Self {
        Self { kind, properties: Vec::new() }
    }

    pub fn name(&self) -> Option<&str> {
        self.properties.iter().find_map(|p| match p {
            Property::Name(n) => Some(n.as_str()),
            _ => None,
        })
    }

    /// Current value for `key`, if set.
    pub fn get(&self, key: &str) -> Option<&Property> {
        self.properties.iter().find(|p| p.key() == key)
    }

    fn apply(&mut self, property: &Property) {
        let key = property.key();
        match self.properties.iter_mut().find(|p| p.key() == key) {
            Some(slot) => *slot = property.clone(),
            None => self.properties.push(property.clone()),
        }
    }
}

/// In-memory host that records every call.
///
/// Keys registered with [`reject`](Self::reject) fail with
/// [`HostError::Rejected`]; after [`disconnect`](Self::disconnect) every call
/// fails with [`HostError::Unavailable`]. Failed calls are still counted.
#[derive(Debug, Default)]
pub struct RecordingSession {
    objects: Vec<RecordedObject>,
    selection: Vec<usize>,
    commands: Vec<Command>,
    rejections: HashMap<String, String>,
    disconnected: bool,
    calls: usize,
}

impl RecordingSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every `set` of `key` fail as a host rejection.
    pub fn reject(mut self, key: impl Into<String>, reason: impl Into<String>) -> Self {
        self.rejections.insert(key.into(), reason.into());
        self
    }

    /// Simulate losing the connection to the host.
    pub fn disconnect(&mut self) {
        self.disconnected = true;
    }

    /// Number of calls attempted, successful or not.
    pub fn calls(&self) -> usize {
        self.calls
    }

    pub fn objects(&self) -> &[RecordedObject] {
        &self.objects
    }

    /// Successful calls in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// First object called `name`.
    pub fn find(&self, name: &str) -> Option<&RecordedObject> {
        self.objects.iter().find(|o| o.name() == Some(name))
    }

    pub fn count_named(&self, name: &str) -> usize {
        self.objects.iter().filter(|o| o.name() == Some(name)).count()
    }

    /// The recorded session as a host script, one statement per line.
    pub fn to_script(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            let _ = writeln!(out, "{}", command.to_script());
        }
        out
    }

    fn begin_call(&mut self) -> Result<(), HostError> {
        self.calls += 1;
        if self.disconnected {
            return Err(HostError::Unavailable("session disconnected".into()));
        }
        Ok(())
    }
}

impl HostSession for RecordingSession {
    fn add_object(&mut self, kind: ObjectKind) -> Result<(), HostError> {
        self.begin_call()?;
        self.objects.push(RecordedObject::new(kind));
        self.selection = vec![self.objects.len() - 1];
        self.commands.push(Command::Add(kind));
        Ok(())
    }

    fn set(&mut self, property: &Property) -> Result<(), HostError> {
        self.begin_call()?;
        let key = property.key();
        if let Some(reason) = self.rejections.get(&key) {
            return Err(HostError::Rejected { key, reason: reason.clone() });
        }
        if self.selection.is_empty() {
            return Err(HostError::NotFound(format!("no object selected for '{}'", key)));
        }
        for &i in &self.selection {
            self.objects[i].apply(property);
        }
        self.commands.push(Command::Set(property.clone()));
        Ok(())
    }

    fn select(&mut self, name: &str) -> Result<bool, HostError> {
        self.begin_call()?;
        self.selection = self
            .objects
            .iter()
            .enumerate()
            .filter(|(_, o)| o.name() == Some(name))
            .map(|(i, _)| i)
            .collect();
        self.commands.push(Command::Select(name.to_string()));
        Ok(!self.selection.is_empty())
    }

    fn delete_selected(&mut self) -> Result<(), HostError> {
        self.begin_call()?;
        let mut doomed = std::mem::take(&mut self.selection);
        doomed.sort_unstable();
        for i in doomed.into_iter().rev() {
            self.objects.remove(i);
        }
        self.commands.push(Command::Delete);
        Ok(())
    }
}
