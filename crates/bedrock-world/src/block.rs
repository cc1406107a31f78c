//! Query result type for block lookups.

use std::fmt;
use std::sync::Arc;

pub const AIR: &str = "minecraft:air";

/// A resolved block: namespaced identifier plus legacy aux (data) value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockInfo {
    pub name: Arc<str>,
    pub aux: u16,
}

impl BlockInfo {
    pub fn new(name: impl Into<Arc<str>>, aux: u16) -> Self {
        Self {
            name: name.into(),
            aux,
        }
    }

    /// The default for any position without data.
    pub fn air() -> Self {
        Self::new(AIR, 0)
    }

    pub fn is_air(&self) -> bool {
        &*self.name == AIR
    }
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self::air()
    }
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.aux == 0 {
            f.write_str(&self.name)
        } else {
            write!(f, "{}:{}", self.name, self.aux)
        }
    }
}
