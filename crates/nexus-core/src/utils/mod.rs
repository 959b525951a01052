//! Utility functions for timestamps and display formatting.

pub mod format;
pub mod time;

pub use format::{format_currency, format_date, truncate_string};
pub use time::{parse_date, parse_timestamp};
