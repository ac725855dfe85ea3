use std::fmt;

use serde::{Deserialize, Serialize};

use crate::ids::{Entity, Id};

/// Opaque optimistic concurrency token. Empty for documents that have never
/// been saved.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default, Hash)]
pub struct Version(String);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(bound = "T: Entity")]
pub struct DocMeta<T> {
    #[serde(rename = "_id")]
    pub id: Id<T>,
    #[serde(rename = "_version", default)]
    pub version: Version,
}

pub trait HasMeta: Entity + Sized {
    fn meta(&self) -> &DocMeta<Self>;
    fn meta_mut(&mut self) -> &mut DocMeta<Self>;
}

impl Version {
    pub fn is_new(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Version {
    fn from(version: String) -> Self {
        Version(version)
    }
}

impl std::str::FromStr for Version {
    type Err = std::convert::Infallible;
    fn from_str(val: &str) -> Result<Self, Self::Err> {
        Ok(Version(val.to_string()))
    }
}

impl fmt::Display for Version {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&self.0)
    }
}

impl<T> Default for DocMeta<T> {
    fn default() -> Self {
        DocMeta {
            id: Default::default(),
            version: Default::default(),
        }
    }
}

impl<T> DocMeta<T> {
    pub fn new_with_id(id: Id<T>) -> Self {
        DocMeta {
            id,
            ..Default::default()
        }
    }
}
