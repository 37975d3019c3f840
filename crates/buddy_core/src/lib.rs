pub mod consistency;
pub mod date_key;
pub mod error;
pub mod heatmap;
pub mod streak;

pub use crate::consistency::{aggregate, AggregationMode, DatedEvent, DayBuckets, EventTime};
pub use crate::date_key::{classify, day_identity, iso_day_key, DayClass};
pub use crate::error::{EngineError, EngineResult};
pub use crate::heatmap::{build_grid, HeatmapCell, HeatmapSpec};
pub use crate::streak::{compute_streak, toggle, CompletionSet};
