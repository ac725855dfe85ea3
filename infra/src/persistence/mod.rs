//! Versioned JSON document storage.
//!
//! Documents are stored whole, keyed by their rendered [`Id`]. Every save
//! checks the version carried by the document against the stored one and
//! fails with [`ConcurrencyError`] when they disagree, so a stale writer can
//! never clobber a newer revision.

use anyhow::Result;
use err_derive::Error;
use serde::{de::DeserializeOwned, Serialize};

use crate::documents::HasMeta;
use crate::ids::{Entity, Id};

mod memory;
mod pg;

pub use self::memory::{MemoryConnectionManager, MemoryDocuments};
pub use self::pg::{DocumentConnectionManager, Documents};

#[derive(Debug, PartialEq, Eq, Error)]
#[error(display = "stale version")]
pub struct ConcurrencyError;

pub trait Storage {
    fn setup(&self) -> Result<()>;
    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>>;
    /// Every stored document of kind `D`, in identifier order.
    fn load_all<D: DeserializeOwned + Entity>(&self) -> Result<Vec<D>>;
    fn save<D: Serialize + HasMeta>(&self, document: &mut D) -> Result<()>;
    fn delete<D: HasMeta>(&self, document: &D) -> Result<()>;
}
