//! Utility functions and helpers.
//!
//! - [`format`] - Number formatting for summaries
//! - [`progress`] - Spinner shown during provisioning waits
//! - [`time`] - Timestamp normalisation and formatting helpers
//!
//! # Examples
//!
//! ## Normalising service timestamps
//!
//! ```
//! use oci_key_rotation_audit::utils::time::parse_service_timestamp;
//!
//! // No offset: taken as UTC
//! let naive = parse_service_timestamp("2025-10-20T10:30:00").unwrap();
//! let utc = parse_service_timestamp("2025-10-20T10:30:00Z").unwrap();
//! assert_eq!(naive, utc);
//! ```

pub mod format;
pub mod progress;
pub mod time;
