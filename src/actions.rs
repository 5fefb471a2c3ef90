//! User-chosen interventions for a prediction request.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Category of factory the user chose to build.
///
/// Serialized with the product's capitalized names (`"None"`, `"Textile"`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum FactoryType {
    /// No factory.
    #[default]
    None,
    /// Textile mill.
    Textile,
    /// Chemical plant; the heaviest water impact.
    Chemical,
    /// Electronics assembly.
    Electronics,
    /// Car plant.
    Automobile,
}

impl FactoryType {
    /// All categories, in declaration order.
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::Textile,
        Self::Chemical,
        Self::Electronics,
        Self::Automobile,
    ];

    /// Returns true unless this is [`FactoryType::None`].
    #[must_use]
    pub const fn is_some(self) -> bool {
        !matches!(self, Self::None)
    }
}

impl fmt::Display for FactoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Textile => write!(f, "Textile"),
            Self::Chemical => write!(f, "Chemical"),
            Self::Electronics => write!(f, "Electronics"),
            Self::Automobile => write!(f, "Automobile"),
        }
    }
}

/// Flat set of intervention flags and values.
///
/// Every field defaults to "no action". Unknown JSON fields (such as the
/// retired `build_factory` and `increase_green_cover` flags) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UserActions {
    /// Factory to build, if any.
    pub factory_type: FactoryType,
    /// Install solar infrastructure.
    pub add_solar: bool,
    /// Trees planted this run.
    pub trees_planted: u32,
    /// Trees cut this run.
    pub trees_cut: u32,
    /// Upgrade waste handling.
    pub improve_waste_management: bool,
    /// Grow the public transport network.
    pub expand_public_transport: bool,
    /// Enforce green zoning policy.
    pub enforce_green_policy: bool,
}

impl UserActions {
    /// No interventions at all.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Builds `factory_type`.
    #[must_use]
    pub fn with_factory(mut self, factory_type: FactoryType) -> Self {
        self.factory_type = factory_type;
        self
    }

    /// Turns on solar.
    #[must_use]
    pub fn with_solar(mut self) -> Self {
        self.add_solar = true;
        self
    }

    /// Plants `count` trees.
    #[must_use]
    pub fn with_trees_planted(mut self, count: u32) -> Self {
        self.trees_planted = count;
        self
    }

    /// Cuts `count` trees.
    #[must_use]
    pub fn with_trees_cut(mut self, count: u32) -> Self {
        self.trees_cut = count;
        self
    }

    /// Turns on waste management.
    #[must_use]
    pub fn with_waste_management(mut self) -> Self {
        self.improve_waste_management = true;
        self
    }

    /// Turns on public transport expansion.
    #[must_use]
    pub fn with_public_transport(mut self) -> Self {
        self.expand_public_transport = true;
        self
    }

    /// Turns on the green policy.
    #[must_use]
    pub fn with_green_policy(mut self) -> Self {
        self.enforce_green_policy = true;
        self
    }
}
