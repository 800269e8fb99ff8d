mod imprint;
mod input;
pub(crate) mod settings;
pub mod template;
pub mod trajectory;

pub use imprint::write_header;
pub use input::read_config;
pub use settings::{AugmentConfig, Configuration, CrawlConfig, H5Config, PathsConfig, UpperBound};
pub use template::{PathTemplate, TemplateError};
pub use trajectory::{read_frame_positions, read_topology, Topology, TrajectoryError};
