use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

use crate::errors::{self, InvalidInput};
use crate::lenient;
use crate::owned::Owned;
use crate::users::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Unit {
    Kg,
    G,
    L,
    Ml,
    Piece,
}

/// A priced raw material. Quantities elsewhere are in this ingredient's unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ingredient {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<Ingredient>,
    pub owner: Id<User>,
    pub name: String,
    pub unit: Unit,
    #[serde(rename = "price", default, deserialize_with = "lenient::decimal")]
    pub price_per_unit: Decimal,
}

/// Editable fields of an ingredient.
#[derive(Debug, Clone, PartialEq)]
pub struct IngredientDraft {
    pub name: String,
    pub unit: Unit,
    pub price_per_unit: Decimal,
}

impl Ingredient {
    pub(crate) fn new(id: Id<Ingredient>, owner: Id<User>, draft: IngredientDraft) -> Self {
        let mut ingredient = Ingredient {
            meta: DocMeta::new_with_id(id),
            owner,
            name: String::new(),
            unit: draft.unit,
            price_per_unit: Decimal::ZERO,
        };
        ingredient.apply(draft);
        ingredient
    }

    pub(crate) fn apply(&mut self, draft: IngredientDraft) {
        self.name = draft.name.trim().to_string();
        self.unit = draft.unit;
        self.price_per_unit = draft.price_per_unit;
    }
}

impl IngredientDraft {
    pub fn new(name: &str, unit: Unit, price_per_unit: Decimal) -> Self {
        IngredientDraft {
            name: name.to_string(),
            unit,
            price_per_unit,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidInput> {
        errors::non_empty("ingredient name", &self.name)?;
        errors::non_negative("ingredient price", self.price_per_unit)?;
        Ok(())
    }
}

impl FromStr for Unit {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "kg" => Ok(Unit::Kg),
            "g" => Ok(Unit::G),
            "l" => Ok(Unit::L),
            "ml" => Ok(Unit::Ml),
            "piece" | "pcs" => Ok(Unit::Piece),
            other => Err(format!("unknown unit: {:?}", other)),
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Unit::Kg => "kg",
            Unit::G => "g",
            Unit::L => "l",
            Unit::Ml => "ml",
            Unit::Piece => "piece",
        };
        fmt.write_str(s)
    }
}

impl Entity for Ingredient {
    const PREFIX: &'static str = "ingredient";
}

impl HasMeta for Ingredient {
    fn meta(&self) -> &DocMeta<Ingredient> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Ingredient> {
        &mut self.meta
    }
}

impl Owned for Ingredient {
    fn owner(&self) -> Id<User> {
        self.owner
    }
}
