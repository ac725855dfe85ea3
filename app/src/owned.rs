use anyhow::Result;
use serde::de::DeserializeOwned;

use infra::ids::{Entity, Id};
use infra::persistence::Storage;

use crate::errors::NotFound;
use crate::users::User;

/// Documents that belong to a single operator.
pub trait Owned {
    fn owner(&self) -> Id<User>;
}

pub(crate) fn list<T, D>(docs: &D, owner: Id<User>) -> Result<Vec<T>>
where
    T: DeserializeOwned + Entity + Owned,
    D: Storage,
{
    Ok(docs
        .load_all::<T>()?
        .into_iter()
        .filter(|doc| doc.owner() == owner)
        .collect())
}

/// Loads a document, treating one owned by somebody else as missing.
pub(crate) fn fetch<T, D>(docs: &D, owner: Id<User>, id: &Id<T>) -> Result<T>
where
    T: DeserializeOwned + Entity + Owned,
    D: Storage,
{
    match docs.load::<T>(id)? {
        Some(doc) if doc.owner() == owner => Ok(doc),
        _ => Err(NotFound::of(id).into()),
    }
}
