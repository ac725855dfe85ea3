use anyhow::{Context, Result};
use log::*;
use r2d2::Pool;

use infra::documents::HasMeta;
use infra::ids::{Id, IdGen};
use infra::persistence::Storage;

use crate::owned;
use crate::services::{Commandable, Queryable, Request};
use crate::users::User;

mod models;

pub use self::models::{Ingredient, IngredientDraft, Unit};

/// The ingredient catalog of one operator.
#[derive(Debug)]
pub struct Pantry<M: r2d2::ManageConnection> {
    db: Pool<M>,
    owner: Id<User>,
    idgen: IdGen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListIngredients;

#[derive(Debug, Clone, PartialEq)]
pub struct AddIngredient(pub IngredientDraft);

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateIngredient {
    pub id: Id<Ingredient>,
    pub draft: IngredientDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveIngredient {
    pub id: Id<Ingredient>,
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Pantry<M> {
    pub fn new(db: Pool<M>, owner: Id<User>) -> Self {
        let idgen = IdGen::new();
        Pantry { db, owner, idgen }
    }
}

impl Request for ListIngredients {
    type Resp = Vec<Ingredient>;
}

impl Request for AddIngredient {
    type Resp = Ingredient;
}

impl Request for UpdateIngredient {
    type Resp = Ingredient;
}

impl Request for RemoveIngredient {
    type Resp = ();
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ListIngredients> for Pantry<M>
{
    fn query(&self, _: ListIngredients) -> Result<Vec<Ingredient>> {
        let docs = self.db.get()?;
        let mut list = owned::list::<Ingredient, _>(&*docs, self.owner)?;
        list.sort_by(|a, b| a.name.cmp(&b.name));
        trace!("Listed {} ingredients for {}", list.len(), self.owner);
        Ok(list)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<AddIngredient> for Pantry<M>
{
    fn execute(&self, req: AddIngredient) -> Result<Ingredient> {
        let AddIngredient(draft) = req;
        draft.validate()?;
        let mut ingredient = Ingredient::new(self.idgen.generate(), self.owner, draft);
        self.db
            .get()?
            .save(&mut ingredient)
            .context("save ingredient")?;
        info!("Added ingredient {}: {}", ingredient.meta().id, ingredient.name);
        Ok(ingredient)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<UpdateIngredient> for Pantry<M>
{
    fn execute(&self, req: UpdateIngredient) -> Result<Ingredient> {
        let UpdateIngredient { id, draft } = req;
        draft.validate()?;
        let docs = self.db.get()?;
        let mut ingredient = owned::fetch(&*docs, self.owner, &id)?;
        ingredient.apply(draft);
        docs.save(&mut ingredient).context("save ingredient")?;
        debug!("Updated ingredient {:?}", ingredient);
        Ok(ingredient)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<RemoveIngredient> for Pantry<M>
{
    fn execute(&self, req: RemoveIngredient) -> Result<()> {
        let docs = self.db.get()?;
        let ingredient: Ingredient = owned::fetch(&*docs, self.owner, &req.id)?;
        docs.delete(&ingredient).context("delete ingredient")?;
        info!("Removed ingredient {}", req.id);
        Ok(())
    }
}

impl<M: r2d2::ManageConnection> Clone for Pantry<M> {
    fn clone(&self) -> Self {
        Pantry {
            db: self.db.clone(),
            owner: self.owner,
            idgen: IdGen::new(),
        }
    }
}
