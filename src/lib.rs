pub mod config;
pub mod ingest;
pub mod metrics;
pub mod normalize;
pub mod render;

pub use config::{CitySpec, PipelineConfig};
pub use ingest::RawTable;
pub use metrics::{city_center, marker_sizes, CityCenter, EmptyTableError};
pub use normalize::{normalize, CanonicalRecord, CanonicalTable, SchemaError};
