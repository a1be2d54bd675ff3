//! Shared types and helpers used across all envsync crates.

pub mod error;
pub mod reference;
pub mod status;

pub use {
    error::{FromMessage, plural_suffix, quoted_list},
    reference::{OPTIONAL_MARKER, Reference},
    status::{
        NoopStatus, StatusCallback, StatusData, StatusEvent, StatusRecorder, SyncStep, TracingStatus,
    },
};
