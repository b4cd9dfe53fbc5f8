//! Live OS counter sampling
//!
//! This module reads host-level resource signals into an immutable
//! [`Sample`]. The CPU reading is averaged over a short window, so a call
//! deliberately takes that long; the window is an await point and can be
//! cancelled by dropping the future.

mod system;

pub use system::SystemSampler;

use crate::error::CollectionError;
use crate::models::Sample;

pub use async_trait::async_trait;

/// Trait for sample producers.
///
/// The daemon drives this seam; tests substitute scripted implementations.
#[async_trait]
pub trait Sampler: Send + Sync {
    /// Read all host signals into one sample.
    ///
    /// Fails with a [`CollectionError`] naming the signal that could not be
    /// read; a partial sample is never returned.
    async fn sample(&self) -> Result<Sample, CollectionError>;
}
