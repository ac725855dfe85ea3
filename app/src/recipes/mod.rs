use anyhow::{Context, Result};
use log::*;
use r2d2::Pool;
use serde::Serialize;

use infra::documents::HasMeta;
use infra::ids::{Id, IdGen};
use infra::persistence::Storage;

use crate::owned;
use crate::pricing::{Catalog, Costing, Unresolved};
use crate::services::{Commandable, Queryable, Request};
use crate::users::User;

mod models;

pub use self::models::{Recipe, RecipeComponent, RecipeDraft};

/// Recipes of one operator, and their prices.
#[derive(Debug)]
pub struct Cookbook<M: r2d2::ManageConnection> {
    db: Pool<M>,
    owner: Id<User>,
    idgen: IdGen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListRecipes;

/// Every recipe with its current price, loading the catalogs once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PriceRecipes;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalculateRecipe {
    pub id: Id<Recipe>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AddRecipe(pub RecipeDraft);

#[derive(Debug, Clone, PartialEq)]
pub struct UpdateRecipe {
    pub id: Id<Recipe>,
    pub draft: RecipeDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveRecipe {
    pub id: Id<Recipe>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecipeQuote {
    pub recipe_id: Id<Recipe>,
    pub name: String,
    #[serde(flatten)]
    pub costing: Costing,
    #[serde(skip)]
    pub unresolved: Vec<Unresolved>,
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Cookbook<M> {
    pub fn new(db: Pool<M>, owner: Id<User>) -> Self {
        let idgen = IdGen::new();
        Cookbook { db, owner, idgen }
    }

    fn quote(&self, catalog: &Catalog, recipe: &Recipe) -> RecipeQuote {
        let unresolved = catalog.unresolved(recipe);
        for missing in unresolved.iter() {
            warn!("Recipe {} ({}): {}", recipe.meta().id, recipe.name, missing);
        }
        RecipeQuote {
            recipe_id: recipe.meta().id,
            name: recipe.name.clone(),
            costing: catalog.cost(recipe),
            unresolved,
        }
    }
}

impl Request for ListRecipes {
    type Resp = Vec<Recipe>;
}

impl Request for PriceRecipes {
    type Resp = Vec<RecipeQuote>;
}

impl Request for CalculateRecipe {
    type Resp = RecipeQuote;
}

impl Request for AddRecipe {
    type Resp = Recipe;
}

impl Request for UpdateRecipe {
    type Resp = Recipe;
}

impl Request for RemoveRecipe {
    type Resp = ();
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ListRecipes> for Cookbook<M>
{
    fn query(&self, _: ListRecipes) -> Result<Vec<Recipe>> {
        let docs = self.db.get()?;
        let mut list = owned::list::<Recipe, _>(&*docs, self.owner)?;
        list.sort_by(|a, b| a.name.cmp(&b.name));
        trace!("Listed {} recipes for {}", list.len(), self.owner);
        Ok(list)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<PriceRecipes> for Cookbook<M>
{
    fn query(&self, _: PriceRecipes) -> Result<Vec<RecipeQuote>> {
        let docs = self.db.get()?;
        let catalog = Catalog::load(&*docs, self.owner)?;
        let mut recipes = catalog.recipes.values().collect::<Vec<_>>();
        recipes.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(recipes
            .into_iter()
            .map(|recipe| self.quote(&catalog, recipe))
            .collect())
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<CalculateRecipe> for Cookbook<M>
{
    fn query(&self, req: CalculateRecipe) -> Result<RecipeQuote> {
        let docs = self.db.get()?;
        let recipe = owned::fetch(&*docs, self.owner, &req.id)?;
        let catalog = Catalog::load(&*docs, self.owner)?;
        let quote = self.quote(&catalog, &recipe);
        debug!("Priced {}: {:?}", req.id, quote.costing);
        Ok(quote)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<AddRecipe> for Cookbook<M>
{
    fn execute(&self, req: AddRecipe) -> Result<Recipe> {
        let AddRecipe(draft) = req;
        draft.validate()?;
        let mut recipe = Recipe::new(self.idgen.generate(), self.owner, draft);
        self.db
            .get()?
            .save(&mut recipe)
            .context("save recipe")?;
        info!("Added recipe {}: {}", recipe.meta().id, recipe.name);
        Ok(recipe)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<UpdateRecipe> for Cookbook<M>
{
    fn execute(&self, req: UpdateRecipe) -> Result<Recipe> {
        let UpdateRecipe { id, draft } = req;
        draft.validate()?;
        let docs = self.db.get()?;
        let mut recipe = owned::fetch(&*docs, self.owner, &id)?;
        recipe.apply(draft);
        docs.save(&mut recipe).context("save recipe")?;
        debug!("Updated recipe {:?}", recipe);
        Ok(recipe)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<RemoveRecipe> for Cookbook<M>
{
    fn execute(&self, req: RemoveRecipe) -> Result<()> {
        let docs = self.db.get()?;
        let recipe: Recipe = owned::fetch(&*docs, self.owner, &req.id)?;
        docs.delete(&recipe).context("delete recipe")?;
        info!("Removed recipe {}", req.id);
        Ok(())
    }
}

impl<M: r2d2::ManageConnection> Clone for Cookbook<M> {
    fn clone(&self) -> Self {
        Cookbook {
            db: self.db.clone(),
            owner: self.owner,
            idgen: IdGen::new(),
        }
    }
}
