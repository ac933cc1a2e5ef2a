//! Telemetry core: pure transformations from raw records to chartable data.
//!
//! Everything in this module is a synchronous function of its explicit
//! inputs. No submodule performs I/O or reads the system clock; "now" is
//! always a parameter, so every operation is deterministic under test.
//! Data-quality problems (missing device id, unparseable timestamp, empty
//! metric) are expressed as dropped records or `None` values, never as
//! errors. One bad feed record must not abort a dashboard render.

pub mod aggregate;
pub mod normalize;
pub mod status;
pub mod trend;
pub mod window;

pub use aggregate::{aggregate, Bucket, Granularity};
pub use normalize::{dedup_by_device, latest_per_device, normalize, normalize_all};
pub use status::{classify, format_time_ago, DeviceStatus, StatusLabel};
pub use trend::{compute_trend, reference_value};
pub use window::{select_window, Window, ALL_DEVICES};
