mod backend;
pub mod backends;
mod gateway;
pub mod labels;
mod registry;
mod result;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use gateway::ModelGateway;
pub use registry::{BackendLoader, BackendRegistry};
pub use result::{BoundingBox, Detection};
