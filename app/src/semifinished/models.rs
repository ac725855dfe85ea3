use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

use crate::errors::{self, InvalidInput};
use crate::ingredients::{Ingredient, Unit};
use crate::lenient;
use crate::owned::Owned;
use crate::users::User;

/// An intermediate preparation (cream, sponge, glaze) made from ingredients
/// plus its own labor, usable as a recipe component.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemiFinished {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<SemiFinished>,
    pub owner: Id<User>,
    pub name: String,
    pub unit: Unit,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub labor_cost: Decimal,
    #[serde(default)]
    pub ingredients: Vec<IngredientLine>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngredientLine {
    pub ingredient_id: Id<Ingredient>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub quantity: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SemiFinishedDraft {
    pub name: String,
    pub unit: Unit,
    pub labor_cost: Decimal,
    pub ingredients: Vec<IngredientLine>,
}

impl SemiFinished {
    pub(crate) fn new(id: Id<SemiFinished>, owner: Id<User>, draft: SemiFinishedDraft) -> Self {
        let mut semi = SemiFinished {
            meta: DocMeta::new_with_id(id),
            owner,
            name: String::new(),
            unit: draft.unit,
            labor_cost: Decimal::ZERO,
            ingredients: Vec::new(),
        };
        semi.apply(draft);
        semi
    }

    pub(crate) fn apply(&mut self, draft: SemiFinishedDraft) {
        self.name = draft.name.trim().to_string();
        self.unit = draft.unit;
        self.labor_cost = draft.labor_cost;
        self.ingredients = draft.ingredients;
    }
}

impl IngredientLine {
    pub fn new(ingredient_id: Id<Ingredient>, quantity: Decimal) -> Self {
        IngredientLine {
            ingredient_id,
            quantity,
        }
    }
}

impl SemiFinishedDraft {
    pub fn new(name: &str, unit: Unit, labor_cost: Decimal) -> Self {
        SemiFinishedDraft {
            name: name.to_string(),
            unit,
            labor_cost,
            ingredients: Vec::new(),
        }
    }

    pub fn with_ingredient(mut self, ingredient_id: Id<Ingredient>, quantity: Decimal) -> Self {
        self.ingredients.push(IngredientLine::new(ingredient_id, quantity));
        self
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidInput> {
        errors::non_empty("semi-finished product name", &self.name)?;
        errors::non_negative("semi-finished labor cost", self.labor_cost)?;
        for line in &self.ingredients {
            errors::non_negative("ingredient quantity", line.quantity)?;
        }
        Ok(())
    }
}

impl Entity for SemiFinished {
    const PREFIX: &'static str = "semifinished";
}

impl HasMeta for SemiFinished {
    fn meta(&self) -> &DocMeta<SemiFinished> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<SemiFinished> {
        &mut self.meta
    }
}

impl Owned for SemiFinished {
    fn owner(&self) -> Id<User> {
        self.owner
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use rand::random;

    #[test]
    fn should_read_form_submissions() {
        let owner = random::<Id<User>>();
        let sugar = random::<Id<Ingredient>>();
        let json = serde_json::json!({
            "_id": random::<Id<SemiFinished>>().to_string(),
            "owner": owner.to_string(),
            "name": "Buttercream",
            "unit": "g",
            "laborCost": "12.5",
            "ingredients": [
                { "ingredientId": sugar.to_string(), "quantity": "0.3" },
                { "ingredientId": sugar.to_string(), "quantity": "" },
            ],
        });

        let semi: SemiFinished = serde_json::from_value(json).expect("parse");

        assert_eq!(semi.labor_cost, Decimal::new(125, 1));
        assert_eq!(
            semi.ingredients,
            vec![
                IngredientLine::new(sugar, Decimal::new(3, 1)),
                IngredientLine::new(sugar, Decimal::ZERO),
            ]
        );
        assert!(semi.meta().version.is_new());
    }
}
