//! # ysplit Host
//!
//! Everything between the splitter geometry and the outside world:
//!
//! | Module | Role |
//! |--------|------|
//! | [`session`] | [`HostSession`] trait, typed properties, a recording host |
//! | [`setter`] | Hard and soft setters, object specs |
//! | [`setup`] | Base simulation layout for 2.5D and 3D solvers |
//! | [`adapter`] | Placing the splitter polygon as a named solid |
//! | [`optimization`] | Settings and problem manifest for the external optimizer |
//! | [`layout`] | GDSII export |

pub mod adapter;
pub mod layout;
pub mod optimization;
pub mod session;
pub mod setter;
pub mod setup;

pub use adapter::{place_splitter, AdapterError, SolidSpec};
pub use layout::{LayoutError, LayoutOptions};
pub use optimization::{OptimizationManifest, OptimizationSettings};
pub use session::{HostError, HostSession, Property, RecordingSession};
pub use setter::{set_hard, set_soft, SoftOutcome};
pub use setup::{setup_base_simulation, SolverKind, WavelengthRange};
