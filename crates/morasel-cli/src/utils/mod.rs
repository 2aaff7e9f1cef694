//! Utility functions for terminal output.

pub mod format;

// Re-export commonly used functions at module level
pub use format::{format_date, format_optional, format_points, progress_bar, truncate_string};
