//! Discriminator conventions.

use serde::{Deserialize, Serialize};

/// How a hierarchy records an instance's runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiscriminatorConvention {
    /// The discriminator element holds the single tag of the concrete class.
    Scalar,
    /// The discriminator element holds the array of tags from the hierarchy
    /// root down to the concrete class, so matching one tag matches a subtree.
    Hierarchical,
}

impl DiscriminatorConvention {
    /// Returns the convention's name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Scalar => "Scalar",
            Self::Hierarchical => "Hierarchical",
        }
    }
}
