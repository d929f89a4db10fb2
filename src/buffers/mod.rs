//! Bounded, ordered buffers feeding the presentation layer.

mod alerts;
mod time_series;

pub use alerts::AlertBuffer;
pub use time_series::TimeSeriesBuffer;
