use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

use crate::clients::{Client, ClientRef};
use crate::errors::{self, InvalidInput};
use crate::owned::Owned;
use crate::recipes::Recipe;
use crate::users::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    #[serde(rename = "In Progress")]
    InProgress,
    Ready,
    Delivered,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub recipe_id: Id<Recipe>,
    pub quantity: u32,
}

/// A customer order.
///
/// `total` is whatever was last written, either typed in by hand or taken
/// from the suggested total of `lines`; nothing keeps the two in step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<Order>,
    pub owner: Id<User>,
    pub client_id: Id<Client>,
    pub client: ClientRef,
    pub item: String,
    pub due_date: NaiveDate,
    #[serde(default)]
    pub lines: Vec<OrderLine>,
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

impl Order {
    pub(crate) fn new(
        id: Id<Order>,
        owner: Id<User>,
        client: &Client,
        item: &str,
        due_date: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Self {
        Order {
            meta: DocMeta::new_with_id(id),
            owner,
            client_id: client.meta().id,
            client: client.reference(),
            item: item.trim().to_string(),
            due_date,
            lines: Vec::new(),
            total: Decimal::ZERO,
            status: OrderStatus::New,
            notes: String::new(),
            created_at,
        }
    }

    pub(crate) fn set_client(&mut self, client: &Client) {
        self.client_id = client.meta().id;
        self.client = client.reference();
    }
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::New,
        OrderStatus::InProgress,
        OrderStatus::Ready,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    /// Still being worked on.
    pub fn is_active(self) -> bool {
        match self {
            OrderStatus::New | OrderStatus::InProgress => true,
            _ => false,
        }
    }

    /// Not yet handed over or called off.
    pub fn is_open(self) -> bool {
        match self {
            OrderStatus::Delivered | OrderStatus::Cancelled => false,
            _ => true,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            OrderStatus::New => "New",
            OrderStatus::InProgress => "In Progress",
            OrderStatus::Ready => "Ready",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }
}

impl Default for OrderStatus {
    fn default() -> Self {
        OrderStatus::New
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().replace(|c: char| c == '-' || c == '_', " ");
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(&wanted))
            .ok_or_else(|| format!("unknown order status: {:?}", s))
    }
}

impl OrderLine {
    pub fn new(recipe_id: Id<Recipe>, quantity: u32) -> Self {
        OrderLine {
            recipe_id,
            quantity,
        }
    }

    pub(crate) fn validate_all(lines: &[OrderLine]) -> Result<(), InvalidInput> {
        match lines.iter().find(|line| line.quantity < 1) {
            Some(line) => Err(InvalidInput::ZeroQuantity(line.recipe_id.to_string())),
            None => Ok(()),
        }
    }
}

impl FromStr for OrderLine {
    type Err = String;
    /// Parses `<recipe id>` or `<recipe id>:<quantity>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, ':');
        let recipe_id = parts
            .next()
            .unwrap_or_default()
            .parse::<Id<Recipe>>()
            .map_err(|e| format!("{}: {}", s, e))?;
        let quantity = match parts.next() {
            Some(q) => q
                .trim()
                .parse::<u32>()
                .map_err(|e| format!("{}: {}", s, e))?,
            None => 1,
        };
        Ok(OrderLine::new(recipe_id, quantity))
    }
}

pub(crate) fn validate_total(total: Decimal) -> Result<(), InvalidInput> {
    errors::non_negative("order total", total)
}

impl Entity for Order {
    const PREFIX: &'static str = "order";
}

impl HasMeta for Order {
    fn meta(&self) -> &DocMeta<Order> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Order> {
        &mut self.meta
    }
}

impl Owned for Order {
    fn owner(&self) -> Id<User> {
        self.owner
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clients::ClientDraft;
    use rand::random;

    #[test]
    fn status_uses_display_names_on_the_wire() {
        let json = serde_json::to_value(OrderStatus::InProgress).expect("to json");
        assert_eq!(json, "In Progress");
        let back: OrderStatus = serde_json::from_str("\"Cancelled\"").expect("parse");
        assert_eq!(back, OrderStatus::Cancelled);
    }

    #[test]
    fn status_parses_from_command_line_spellings() {
        assert_eq!("in-progress".parse::<OrderStatus>(), Ok(OrderStatus::InProgress));
        assert_eq!("DELIVERED".parse::<OrderStatus>(), Ok(OrderStatus::Delivered));
        assert!("lost".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn only_new_and_in_progress_are_active() {
        let active = OrderStatus::ALL
            .iter()
            .filter(|s| s.is_active())
            .count();
        assert_eq!(active, 2);
        assert!(OrderStatus::Ready.is_open());
        assert!(!OrderStatus::Cancelled.is_open());
    }

    #[test]
    fn order_lines_parse_with_default_quantity() {
        let recipe = random::<Id<Recipe>>();
        assert_eq!(
            format!("{}:3", recipe).parse::<OrderLine>(),
            Ok(OrderLine::new(recipe, 3))
        );
        assert_eq!(
            recipe.to_string().parse::<OrderLine>(),
            Ok(OrderLine::new(recipe, 1))
        );
        assert!(format!("{}:many", recipe).parse::<OrderLine>().is_err());
    }

    #[test]
    fn zero_quantity_lines_are_rejected() {
        let recipe = random::<Id<Recipe>>();
        let lines = vec![OrderLine::new(recipe, 2), OrderLine::new(recipe, 0)];
        assert_eq!(
            OrderLine::validate_all(&lines),
            Err(InvalidInput::ZeroQuantity(recipe.to_string()))
        );
    }

    #[test]
    fn capped_totals_reload_unchanged() {
        let client = Client::new(random(), random(), ClientDraft::new("Collector"), Utc::now());
        let due = NaiveDate::from_ymd_opt(2024, 12, 24).expect("date");
        let mut order = Order::new(random(), client.owner, &client, "Gilded cake", due, Utc::now());

        for total in vec![Decimal::MAX, "12345678.123456789".parse().expect("decimal")] {
            order.total = total;
            let json = serde_json::to_string(&order).expect("to json");
            let back: Order = serde_json::from_str(&json).expect("parse");
            assert_eq!(back, order);
            assert_eq!(back.total.to_string(), total.to_string());
        }
    }
}
