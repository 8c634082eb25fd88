//! Model store port: Trait for persisting trained ensembles.
//!
//! The store deals in serialized bundles; encoding the ensemble is the
//! application's job, integrity of the stored bytes is the store's.

/// Trait for bundle persistence.
pub trait ModelStore: Send + Sync {
    /// Error type for store operations.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Persist a serialized bundle, replacing any previous one.
    ///
    /// # Errors
    /// Returns error if the bundle cannot be written.
    fn save(&self, bundle: &[u8]) -> Result<(), Self::Error>;

    /// Load the stored bundle.
    ///
    /// # Returns
    /// `None` if nothing has been saved.
    ///
    /// # Errors
    /// Returns error if the bundle exists but is unreadable or fails its
    /// integrity check.
    fn load(&self) -> Result<Option<Vec<u8>>, Self::Error>;
}
