use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::time::SystemTime;

use rand::distributions::{Distribution, Standard};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

pub use crate::untyped_ids::IdParseError;
use crate::untyped_ids::UntypedId;

/// An identifier for a document of kind `T`.
///
/// Renders as `<prefix>-<base32>`, where the prefix comes from the
/// [`Entity`] implementation of `T`.
pub struct Id<T> {
    pub(crate) inner: UntypedId,
    pub(crate) phantom: PhantomData<T>,
}

pub trait Entity {
    const PREFIX: &'static str;
}

const DIVIDER: &str = "-";

#[derive(Debug, Default)]
pub struct IdGen {
    _priv: (),
}

impl<T> Id<T> {
    pub fn hashed<H: Hash + ?Sized>(entity: &H) -> Self {
        UntypedId::hashed(entity).typed()
    }

    pub fn untyped(&self) -> UntypedId {
        self.inner
    }
}

impl<T: Entity> Id<T> {
    /// Storage key pattern matching every identifier of this kind.
    pub fn prefix_pattern() -> String {
        format!("{}{}", T::PREFIX, DIVIDER)
    }
}

impl IdGen {
    pub fn new() -> Self {
        IdGen { _priv: () }
    }

    pub fn untyped(&self) -> UntypedId {
        UntypedId::from_parts(SystemTime::now(), rand::random())
    }

    pub fn generate<T>(&self) -> Id<T> {
        self.untyped().typed()
    }
}

impl<T> Distribution<Id<T>> for Standard {
    fn sample<R: ?Sized + rand::Rng>(&self, rng: &mut R) -> Id<T> {
        UntypedId::from_bytes(rng.gen()).typed()
    }
}

impl<T: Entity> fmt::Display for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "{}{}{}", T::PREFIX, DIVIDER, self.inner)
    }
}

impl<T> fmt::Debug for Id<T> {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("Id").field("val", &self.inner).finish()
    }
}

impl<T: Entity> std::str::FromStr for Id<T> {
    type Err = IdParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        if T::PREFIX.len() > src.len() || !src.is_char_boundary(T::PREFIX.len()) {
            return Err(IdParseError::InvalidPrefix);
        }
        let (start, remainder) = src.split_at(T::PREFIX.len());
        if start != T::PREFIX {
            return Err(IdParseError::InvalidPrefix);
        }
        if !remainder.starts_with(DIVIDER) {
            return Err(IdParseError::Unparseable);
        }
        let inner = remainder[DIVIDER.len()..].parse::<UntypedId>()?;
        Ok(inner.typed())
    }
}

impl<T> Default for Id<T> {
    fn default() -> Self {
        UntypedId::default().typed()
    }
}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.inner == other.inner
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.inner.cmp(&other.inner)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state)
    }
}

impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T: Entity> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de, T: Entity> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}
