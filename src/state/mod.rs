pub mod registry;
pub mod sample_store;

pub use registry::{StoreRegistry, TrackedInstrument};
pub use sample_store::SampleStore;
