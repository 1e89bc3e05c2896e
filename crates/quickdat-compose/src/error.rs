use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("route needs both endpoints (origin present: {has_origin}, destination present: {has_destination})")]
    InsufficientData {
        has_origin: bool,
        has_destination: bool,
    },
}

impl DispatchError {
    /// Message shown to the user when an action cannot proceed.
    #[must_use]
    pub fn notice(&self) -> &'static str {
        match self {
            DispatchError::InsufficientData { .. } => {
                "Could not extract origin and destination from the load details."
            }
        }
    }
}
