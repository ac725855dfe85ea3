use anyhow::{Context, Result};
use log::*;
use r2d2::Pool;

use infra::documents::HasMeta;
use infra::ids::{Id, IdGen};
use infra::persistence::Storage;

use crate::ingredients::Ingredient;
use crate::owned;
use crate::pricing::{self, SemiFinishedCosting};
use crate::services::{Commandable, Queryable, Request};
use crate::users::User;

mod models;

pub use self::models::{IngredientLine, SemiFinished, SemiFinishedDraft};

/// Semi-finished products of one operator.
#[derive(Debug)]
pub struct Prep<M: r2d2::ManageConnection> {
    db: Pool<M>,
    owner: Id<User>,
    idgen: IdGen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListSemiFinished;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CostSemiFinished {
    pub id: Id<SemiFinished>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddSemiFinished(pub SemiFinishedDraft);

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateSemiFinished {
    pub id: Id<SemiFinished>,
    pub draft: SemiFinishedDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveSemiFinished {
    pub id: Id<SemiFinished>,
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Prep<M> {
    pub fn new(db: Pool<M>, owner: Id<User>) -> Self {
        let idgen = IdGen::new();
        Prep { db, owner, idgen }
    }
}

impl Request for ListSemiFinished {
    type Resp = Vec<SemiFinished>;
}

impl Request for CostSemiFinished {
    type Resp = SemiFinishedCosting;
}

impl Request for AddSemiFinished {
    type Resp = SemiFinished;
}

impl Request for UpdateSemiFinished {
    type Resp = SemiFinished;
}

impl Request for RemoveSemiFinished {
    type Resp = ();
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ListSemiFinished> for Prep<M>
{
    fn query(&self, _: ListSemiFinished) -> Result<Vec<SemiFinished>> {
        let docs = self.db.get()?;
        let mut list = owned::list::<SemiFinished, _>(&*docs, self.owner)?;
        list.sort_by(|a, b| a.name.cmp(&b.name));
        trace!("Listed {} semi-finished products for {}", list.len(), self.owner);
        Ok(list)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<CostSemiFinished> for Prep<M>
{
    fn query(&self, req: CostSemiFinished) -> Result<SemiFinishedCosting> {
        let docs = self.db.get()?;
        let semi = owned::fetch(&*docs, self.owner, &req.id)?;
        let ingredients = pricing::index(owned::list::<Ingredient, _>(&*docs, self.owner)?);
        for line in semi
            .ingredients
            .iter()
            .filter(|line| !ingredients.contains_key(&line.ingredient_id))
        {
            warn!(
                "Semi-finished {} uses unknown ingredient {}",
                req.id, line.ingredient_id
            );
        }
        Ok(pricing::semifinished_costing(&semi, &ingredients))
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<AddSemiFinished> for Prep<M>
{
    fn execute(&self, req: AddSemiFinished) -> Result<SemiFinished> {
        let AddSemiFinished(draft) = req;
        draft.validate()?;
        let mut semi = SemiFinished::new(self.idgen.generate(), self.owner, draft);
        self.db
            .get()?
            .save(&mut semi)
            .context("save semi-finished product")?;
        info!("Added semi-finished product {}: {}", semi.meta().id, semi.name);
        Ok(semi)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<UpdateSemiFinished> for Prep<M>
{
    fn execute(&self, req: UpdateSemiFinished) -> Result<SemiFinished> {
        let UpdateSemiFinished { id, draft } = req;
        draft.validate()?;
        let docs = self.db.get()?;
        let mut semi = owned::fetch(&*docs, self.owner, &id)?;
        semi.apply(draft);
        docs.save(&mut semi).context("save semi-finished product")?;
        debug!("Updated semi-finished product {:?}", semi);
        Ok(semi)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<RemoveSemiFinished> for Prep<M>
{
    fn execute(&self, req: RemoveSemiFinished) -> Result<()> {
        let docs = self.db.get()?;
        let semi: SemiFinished = owned::fetch(&*docs, self.owner, &req.id)?;
        docs.delete(&semi).context("delete semi-finished product")?;
        info!("Removed semi-finished product {}", req.id);
        Ok(())
    }
}

impl<M: r2d2::ManageConnection> Clone for Prep<M> {
    fn clone(&self) -> Self {
        Prep {
            db: self.db.clone(),
            owner: self.owner,
            idgen: IdGen::new(),
        }
    }
}
