//! Common types shared across the seasonal precipitation pipeline crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod period;

pub use bbox::BoundingBox;
pub use crs::CrsCode;
pub use error::{CommonError, CommonResult};
pub use period::{LeadTime, Period, PeriodRange, LEAD_TIME_STEPS};
