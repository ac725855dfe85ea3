use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

use crate::errors::{self, InvalidInput};
use crate::ingredients::Ingredient;
use crate::lenient;
use crate::owned::Owned;
use crate::semifinished::SemiFinished;
use crate::users::User;

/// A sellable item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recipe {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<Recipe>,
    pub owner: Id<User>,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category_id: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "lenient::decimal")]
    pub labor_cost: Decimal,
    #[serde(rename = "markup", default, deserialize_with = "lenient::decimal")]
    pub markup_percent: Decimal,
    #[serde(default)]
    pub components: Vec<RecipeComponent>,
}

/// One line of a recipe: a direct ingredient or a semi-finished product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RecipeComponent {
    Ingredient {
        id: Id<Ingredient>,
        #[serde(default, deserialize_with = "lenient::decimal")]
        quantity: Decimal,
    },
    #[serde(rename = "semifinished")]
    SemiFinished {
        id: Id<SemiFinished>,
        #[serde(default, deserialize_with = "lenient::decimal")]
        quantity: Decimal,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecipeDraft {
    pub name: String,
    pub description: String,
    pub category_id: Option<String>,
    pub image_url: Option<String>,
    pub labor_cost: Decimal,
    pub markup_percent: Decimal,
    pub components: Vec<RecipeComponent>,
}

impl Recipe {
    pub(crate) fn new(id: Id<Recipe>, owner: Id<User>, draft: RecipeDraft) -> Self {
        let mut recipe = Recipe {
            meta: DocMeta::new_with_id(id),
            owner,
            name: String::new(),
            description: String::new(),
            category_id: None,
            image_url: None,
            labor_cost: Decimal::ZERO,
            markup_percent: Decimal::ZERO,
            components: Vec::new(),
        };
        recipe.apply(draft);
        recipe
    }

    pub(crate) fn apply(&mut self, draft: RecipeDraft) {
        self.name = draft.name.trim().to_string();
        self.description = draft.description;
        self.category_id = draft.category_id;
        self.image_url = draft.image_url;
        self.labor_cost = draft.labor_cost;
        self.markup_percent = draft.markup_percent;
        self.components = draft.components;
    }
}

impl RecipeComponent {
    pub fn quantity(&self) -> Decimal {
        match self {
            RecipeComponent::Ingredient { quantity, .. } => *quantity,
            RecipeComponent::SemiFinished { quantity, .. } => *quantity,
        }
    }
}

impl RecipeDraft {
    pub fn new(name: &str) -> Self {
        RecipeDraft {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn labor_cost(mut self, labor_cost: Decimal) -> Self {
        self.labor_cost = labor_cost;
        self
    }

    pub fn markup_percent(mut self, markup_percent: Decimal) -> Self {
        self.markup_percent = markup_percent;
        self
    }

    pub fn with_ingredient(mut self, id: Id<Ingredient>, quantity: Decimal) -> Self {
        self.components
            .push(RecipeComponent::Ingredient { id, quantity });
        self
    }

    pub fn with_semifinished(mut self, id: Id<SemiFinished>, quantity: Decimal) -> Self {
        self.components
            .push(RecipeComponent::SemiFinished { id, quantity });
        self
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidInput> {
        errors::non_empty("recipe name", &self.name)?;
        errors::non_negative("recipe labor cost", self.labor_cost)?;
        errors::non_negative("recipe markup", self.markup_percent)?;
        for component in &self.components {
            errors::non_negative("component quantity", component.quantity())?;
        }
        Ok(())
    }
}

impl Entity for Recipe {
    const PREFIX: &'static str = "recipe";
}

impl HasMeta for Recipe {
    fn meta(&self) -> &DocMeta<Recipe> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Recipe> {
        &mut self.meta
    }
}

impl Owned for Recipe {
    fn owner(&self) -> Id<User> {
        self.owner
    }
}
