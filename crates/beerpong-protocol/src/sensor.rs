use std::sync::{Arc, PoisonError, RwLock};

/// The latest decoded sensor reading, shared between the decode loop and
/// whoever reports it.
///
/// Clones are handles to the same reading. A reading is replaced as a whole,
/// so readers see either the previous sequence or the new one, never a mix.
#[derive(Debug, Clone, Default)]
pub struct SensorState {
    current: Arc<RwLock<Option<Arc<[i64]>>>>,
}

impl SensorState {
    /// Create a state with no reading yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the current reading.
    pub fn set(&self, values: impl Into<Arc<[i64]>>) {
        let values = values.into();
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Some(values);
    }

    /// The current reading, or `None` before the first one arrives.
    pub fn get(&self) -> Option<Arc<[i64]>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Forget the current reading.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
