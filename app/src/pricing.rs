//! Recipe costing.
//!
//! A recipe is priced from its components: ingredients at their unit price,
//! and semi-finished products at the cost of their own ingredients plus
//! their labor. The recipe's labor is added once, flat, and the markup
//! percentage is applied on top of that.
//!
//! Everything here is a pure function of the documents passed in. References
//! that do not resolve cost nothing, and negative quantities count as zero,
//! so a half-edited recipe can always be priced. Callers that want to warn
//! about dangling references can ask for them with [`unresolved`].
//!
//! Sums are carried at full decimal precision; round with [`money`] only
//! when presenting a figure.

use std::collections::{HashMap, HashSet};
use std::fmt;

use anyhow::Result;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;

use infra::documents::HasMeta;
use infra::ids::Id;
use infra::persistence::Storage;

use crate::ingredients::Ingredient;
use crate::orders::OrderLine;
use crate::owned;
use crate::recipes::{Recipe, RecipeComponent};
use crate::semifinished::SemiFinished;
use crate::users::User;

pub type Index<T> = HashMap<Id<T>, T>;

/// Cost breakdown of a recipe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Costing {
    #[serde(rename = "recipeCost")]
    pub base_cost: Decimal,
    pub labor_cost: Decimal,
    pub total_cost: Decimal,
    #[serde(rename = "markup")]
    pub markup_percent: Decimal,
    pub final_price: Decimal,
}

/// Cost breakdown of a semi-finished product.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemiFinishedCosting {
    pub ingredients_cost: Decimal,
    pub labor_cost: Decimal,
    pub total_cost: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unresolved {
    Ingredient(Id<Ingredient>),
    SemiFinished(Id<SemiFinished>),
    Recipe(Id<Recipe>),
}

/// Snapshot of one operator's catalogs, indexed by id.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub ingredients: Index<Ingredient>,
    pub semifinished: Index<SemiFinished>,
    pub recipes: Index<Recipe>,
}

pub fn index<T: HasMeta>(docs: impl IntoIterator<Item = T>) -> Index<T> {
    docs.into_iter()
        .map(|doc| (doc.meta().id, doc))
        .collect()
}

/// Ingredient cost of a semi-finished product, without its labor.
pub fn semifinished_cost(semi: &SemiFinished, ingredients: &Index<Ingredient>) -> Decimal {
    sum(semi.ingredients.iter().map(|line| {
        ingredients
            .get(&line.ingredient_id)
            .map(|ingredient| times(ingredient.price_per_unit, line.quantity))
            .unwrap_or(Decimal::ZERO)
    }))
}

pub fn semifinished_costing(
    semi: &SemiFinished,
    ingredients: &Index<Ingredient>,
) -> SemiFinishedCosting {
    let ingredients_cost = semifinished_cost(semi, ingredients);
    SemiFinishedCosting {
        ingredients_cost,
        labor_cost: semi.labor_cost,
        total_cost: plus(ingredients_cost, semi.labor_cost),
    }
}

pub fn calculate(
    recipe: &Recipe,
    ingredients: &Index<Ingredient>,
    semifinished: &Index<SemiFinished>,
) -> Costing {
    let base_cost = sum(recipe
        .components
        .iter()
        .map(|component| component_cost(component, ingredients, semifinished)));
    let labor_cost = recipe.labor_cost;
    let total_cost = plus(base_cost, labor_cost);
    let markup_percent = recipe.markup_percent.max(Decimal::ZERO);
    let factor = plus(Decimal::ONE, markup_percent / Decimal::ONE_HUNDRED);
    Costing {
        base_cost,
        labor_cost,
        total_cost,
        markup_percent,
        final_price: times(total_cost, factor),
    }
}

fn component_cost(
    component: &RecipeComponent,
    ingredients: &Index<Ingredient>,
    semifinished: &Index<SemiFinished>,
) -> Decimal {
    match component {
        RecipeComponent::Ingredient { id, quantity } => ingredients
            .get(id)
            .map(|ingredient| times(ingredient.price_per_unit, *quantity))
            .unwrap_or(Decimal::ZERO),
        RecipeComponent::SemiFinished { id, quantity } => semifinished
            .get(id)
            .map(|semi| {
                let unit_cost = plus(semifinished_cost(semi, ingredients), semi.labor_cost);
                times(unit_cost, *quantity)
            })
            .unwrap_or(Decimal::ZERO),
    }
}

/// Suggested total for a set of order lines: each recipe's final price
/// times the ordered quantity.
pub fn order_total<F>(lines: &[OrderLine], recipes: &Index<Recipe>, mut cost: F) -> Decimal
where
    F: FnMut(&Recipe) -> Costing,
{
    sum(lines.iter().map(|line| {
        recipes
            .get(&line.recipe_id)
            .map(|recipe| times(cost(recipe).final_price, Decimal::from(line.quantity)))
            .unwrap_or(Decimal::ZERO)
    }))
}

/// Every reference in `recipe` (and in the semi-finished products it uses)
/// that is missing from the catalogs, in recipe order.
pub fn unresolved(
    recipe: &Recipe,
    ingredients: &Index<Ingredient>,
    semifinished: &Index<SemiFinished>,
) -> Vec<Unresolved> {
    let mut missing = Vec::new();
    for component in &recipe.components {
        match component {
            RecipeComponent::Ingredient { id, .. } => {
                if !ingredients.contains_key(id) {
                    missing.push(Unresolved::Ingredient(*id));
                }
            }
            RecipeComponent::SemiFinished { id, .. } => match semifinished.get(id) {
                Some(semi) => missing.extend(
                    semi.ingredients
                        .iter()
                        .filter(|line| !ingredients.contains_key(&line.ingredient_id))
                        .map(|line| Unresolved::Ingredient(line.ingredient_id)),
                ),
                None => missing.push(Unresolved::SemiFinished(*id)),
            },
        }
    }
    let mut seen = HashSet::new();
    missing.retain(|m| seen.insert(*m));
    missing
}

/// Rounds to whole cents, halves away from zero, always showing two places.
pub fn money(amount: Decimal) -> Decimal {
    let mut rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}

fn times(amount: Decimal, quantity: Decimal) -> Decimal {
    amount
        .checked_mul(quantity.max(Decimal::ZERO))
        .unwrap_or(Decimal::MAX)
}

fn plus(a: Decimal, b: Decimal) -> Decimal {
    a.checked_add(b).unwrap_or(Decimal::MAX)
}

fn sum(parts: impl Iterator<Item = Decimal>) -> Decimal {
    parts.fold(Decimal::ZERO, plus)
}

impl Catalog {
    pub fn new(
        ingredients: impl IntoIterator<Item = Ingredient>,
        semifinished: impl IntoIterator<Item = SemiFinished>,
        recipes: impl IntoIterator<Item = Recipe>,
    ) -> Self {
        Catalog {
            ingredients: index(ingredients),
            semifinished: index(semifinished),
            recipes: index(recipes),
        }
    }

    pub(crate) fn load<D: Storage>(docs: &D, owner: Id<User>) -> Result<Self> {
        Ok(Catalog::new(
            owned::list::<Ingredient, _>(docs, owner)?,
            owned::list::<SemiFinished, _>(docs, owner)?,
            owned::list::<Recipe, _>(docs, owner)?,
        ))
    }

    pub fn cost(&self, recipe: &Recipe) -> Costing {
        calculate(recipe, &self.ingredients, &self.semifinished)
    }

    pub fn semifinished_costing(&self, semi: &SemiFinished) -> SemiFinishedCosting {
        semifinished_costing(semi, &self.ingredients)
    }

    pub fn order_total(&self, lines: &[OrderLine]) -> Decimal {
        order_total(lines, &self.recipes, |recipe| self.cost(recipe))
    }

    pub fn unresolved(&self, recipe: &Recipe) -> Vec<Unresolved> {
        unresolved(recipe, &self.ingredients, &self.semifinished)
    }

    pub fn unresolved_lines(&self, lines: &[OrderLine]) -> Vec<Unresolved> {
        lines
            .iter()
            .filter(|line| !self.recipes.contains_key(&line.recipe_id))
            .map(|line| Unresolved::Recipe(line.recipe_id))
            .collect()
    }
}

impl Costing {
    /// The same breakdown rounded for display.
    pub fn rounded(&self) -> Costing {
        Costing {
            base_cost: money(self.base_cost),
            labor_cost: money(self.labor_cost),
            total_cost: money(self.total_cost),
            markup_percent: self.markup_percent,
            final_price: money(self.final_price),
        }
    }
}

impl fmt::Display for Unresolved {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Unresolved::Ingredient(id) => write!(fmt, "unknown ingredient {}", id),
            Unresolved::SemiFinished(id) => write!(fmt, "unknown semi-finished product {}", id),
            Unresolved::Recipe(id) => write!(fmt, "unknown recipe {}", id),
        }
    }
}
