pub mod feed;
pub mod view;

pub use feed::client::Interface;
pub use view::{AggregatedView, IndicatorStyle, MessageLog, StatusAggregator};
