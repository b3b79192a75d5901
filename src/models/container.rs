//! Container handles.

/// Evidence that a container gate verified or created the container during
/// the current call. Never cached across calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHandle {
    name: String,
    created: bool,
}

impl ContainerHandle {
    pub(crate) fn existing(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: false,
        }
    }

    pub(crate) fn created(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created: true,
        }
    }

    /// Container name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether the gate created the container on this call.
    pub fn was_created(&self) -> bool {
        self.created
    }
}
