mod log;
mod status;

pub use log::{format_line, MessageLog, DEFAULT_MAX_LINES};
pub use status::{AggregatedView, IndicatorStyle, StatusAggregator, DEFAULT_SCOPE_ROLE};
