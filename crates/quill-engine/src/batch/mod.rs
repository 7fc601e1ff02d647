//! Geometry batching: CPU scratch arrays split into batches that each fit the
//! fixed GPU vertex/index buffers, and the replay-side upload placement.

mod batcher;
mod config;
mod upload;
mod vertex;

pub use batcher::{BatchDescriptor, BatchError, GeometryBatcher, GeometryWriter, MAX_BATCH_VERTICES, Placement};
pub use config::BatchConfig;
pub use upload::{BatchInfo, Upload, UploadHint, UploadPlanner, padded_index_count};
pub use vertex::{Index, LineVertex3D, Vertex2D};
