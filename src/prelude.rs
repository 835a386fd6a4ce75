pub use crate::config::{Config, ConfigBuilder};
pub use crate::error::{Error, Result};
pub use crate::executor::{Pool, Task};
pub use crate::telemetry::{Metrics, MetricsSnapshot};
