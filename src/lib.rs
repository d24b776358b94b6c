pub mod backend;
pub mod batch;
pub mod config;
pub mod detection;
pub mod error;
pub mod estimate;
pub mod fit;
pub mod math;
pub mod registry;
pub mod simulation;
pub mod space;
pub mod spline;
pub mod track;

pub use backend::{BodySpec, PhysicsBackend, PolygonSpec, Shape};
pub use batch::prepare;
pub use config::SimulationConfig;
pub use detection::{Detections, Detector, ImageMetadata, Observation};
pub use error::Error;
pub use estimate::{Confidence, MotionEstimate, TRUST_THRESHOLD};
pub use fit::{fit_quadratic, AxisFit};
pub use registry::{BodyPhase, DriftCheck, SimulatedBody};
pub use simulation::{BodyState, FrameLimiter, FrameSink, Simulation};
pub use space::Space;
pub use track::{row_data, RowData, Track};
