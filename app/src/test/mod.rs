//! Guarded with `#[cfg(test)]` from `lib.rs`

use anyhow::Result;
use chrono::NaiveDate;
use maplit::hashset;
use rust_decimal::Decimal;

use infra::documents::HasMeta;
use infra::ids::Id;
use infra::persistence::{ConcurrencyError, Storage};

use crate::clients::{AddClient, ClientDraft, RemoveClient, UpdateClient};
use crate::dashboard::{Period, ShowDashboard};
use crate::errors::{InvalidInput, NotFound};
use crate::ingredients::{
    AddIngredient, IngredientDraft, ListIngredients, RemoveIngredient, Unit, UpdateIngredient,
};
use crate::orders::{
    ListOrders, OrderLine, OrderStatus, PlaceOrder, RemoveOrder, SuggestTotal, UpdateOrder,
};
use crate::pricing::Unresolved;
use crate::recipes::{AddRecipe, CalculateRecipe, ListRecipes, PriceRecipes, RecipeDraft};
use crate::semifinished::{AddSemiFinished, CostSemiFinished, SemiFinishedDraft};
use crate::services::{Commandable, Queryable};
use crate::users::{
    Language, RegisterProfile, ShowProfile, Theme, UpdateProfile, User,
};
use crate::Confectionery;


fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal")
}

fn due(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, day).expect("date")
}

fn memory_app() -> Result<Confectionery<infra::persistence::MemoryConnectionManager>> {
    env_logger::try_init().unwrap_or_default();
    Ok(Confectionery::new(junk_drawer::memory_pool()?))
}

fn register<M, D>(app: &Confectionery<M>, email: &str) -> Result<Id<User>>
where
    M: r2d2::ManageConnection<Connection = D>,
    D: Storage + Send + 'static,
{
    let user = app.profiles().execute(RegisterProfile {
        name: "Baker".to_string(),
        email: email.to_string(),
    })?;
    Ok(user.meta().id)
}

fn is<E: std::error::Error + Send + Sync + 'static>(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<E>())
}

fn cake_shop_workflow<M, D>(app: &Confectionery<M>) -> Result<()>
where
    M: r2d2::ManageConnection<Connection = D>,
    D: Storage + Send + 'static,
{
    app.setup()?;
    let owner = register(app, "baker@example.com")?;

    let pantry = app.pantry(owner);
    let flour = pantry.execute(AddIngredient(IngredientDraft::new(
        "Flour",
        Unit::Kg,
        dec("10"),
    )))?;
    let cream = pantry.execute(AddIngredient(IngredientDraft::new(
        "Cream",
        Unit::L,
        dec("20"),
    )))?;

    let sponge = app.prep(owner).execute(AddSemiFinished(
        SemiFinishedDraft::new("Sponge", Unit::Piece, dec("5"))
            .with_ingredient(flour.meta().id, dec("1")),
    ))?;
    let sponge_cost = app
        .prep(owner)
        .query(CostSemiFinished { id: sponge.meta().id })?;
    assert_eq!(sponge_cost.total_cost, dec("15"));

    let cookbook = app.cookbook(owner);
    let layer_cake = cookbook.execute(AddRecipe(
        RecipeDraft::new("Layer cake")
            .with_semifinished(sponge.meta().id, dec("2"))
            .with_ingredient(cream.meta().id, dec("0.5"))
            .labor_cost(dec("20"))
            .markup_percent(dec("50")),
    ))?;

    let quote = cookbook.query(CalculateRecipe {
        id: layer_cake.meta().id,
    })?;
    assert_eq!(quote.costing.base_cost, dec("40"));
    assert_eq!(quote.costing.total_cost, dec("60"));
    assert_eq!(quote.costing.final_price, dec("90"));
    assert!(quote.unresolved.is_empty());

    let client = app
        .clients(owner)
        .execute(AddClient(ClientDraft::new("Oksana")))?;

    let orders = app.orders(owner);
    let lines = vec![OrderLine::new(layer_cake.meta().id, 2)];
    assert_eq!(
        orders.query(SuggestTotal {
            lines: lines.clone()
        })?,
        dec("180")
    );

    let order = orders.execute(PlaceOrder {
        client_id: client.meta().id,
        item: "Birthday cake".to_string(),
        due_date: due(20),
        lines,
        total: None,
        notes: "No nuts".to_string(),
    })?;
    assert_eq!(order.total, dec("180"));
    assert_eq!(order.client.name, "Oksana");

    let delivered = orders.execute(UpdateOrder::status(order.meta().id, OrderStatus::Delivered))?;
    assert_eq!(delivered.status, OrderStatus::Delivered);
    assert_eq!(delivered.total, dec("180"));

    let stats = app
        .dashboard(owner)
        .query(ShowDashboard {
            period: Period::Week,
        })?;
    assert_eq!(stats.total_revenue, dec("180"));
    assert_eq!(stats.total_clients, 1);
    assert_eq!(stats.new_clients, 1);
    assert_eq!(stats.active_orders, 0);
    assert_eq!(stats.recent_activities, 1);
    assert!(stats.upcoming_orders.is_empty());

    Ok(())
}

#[test]
fn cake_shop_workflow_in_memory() -> Result<()> {
    cake_shop_workflow(&memory_app()?)
}

#[test]
#[ignore]
fn cake_shop_workflow_on_postgres() -> Result<()> {
    env_logger::try_init().unwrap_or_default();
    let pool = junk_drawer::pg_pool("cake_shop_workflow_on_postgres")?;
    cake_shop_workflow(&Confectionery::new(pool))
}

#[test]
fn price_changes_flow_into_new_quotes() -> Result<()> {
    let app = memory_app()?;
    let owner = register(&app, "prices@example.com")?;
    let pantry = app.pantry(owner);
    let sugar = pantry.execute(AddIngredient(IngredientDraft::new(
        "Sugar",
        Unit::Kg,
        dec("2"),
    )))?;
    let fudge = app
        .cookbook(owner)
        .execute(AddRecipe(RecipeDraft::new("Fudge").with_ingredient(sugar.meta().id, dec("3"))))?;

    let before = app.cookbook(owner).query(CalculateRecipe {
        id: fudge.meta().id,
    })?;
    pantry.execute(UpdateIngredient {
        id: sugar.meta().id,
        draft: IngredientDraft::new("Sugar", Unit::Kg, dec("2.5")),
    })?;
    let after = app.cookbook(owner).query(CalculateRecipe {
        id: fudge.meta().id,
    })?;

    assert_eq!(before.costing.final_price, dec("6"));
    assert_eq!(after.costing.final_price, dec("7.5"));
    Ok(())
}

#[test]
fn removed_ingredients_are_reported_and_cost_nothing() -> Result<()> {
    let app = memory_app()?;
    let owner = register(&app, "removed@example.com")?;
    let pantry = app.pantry(owner);
    let butter = pantry.execute(AddIngredient(IngredientDraft::new(
        "Butter",
        Unit::Kg,
        dec("12"),
    )))?;
    let eggs = pantry.execute(AddIngredient(IngredientDraft::new(
        "Eggs",
        Unit::Piece,
        dec("0.2"),
    )))?;
    app.cookbook(owner).execute(AddRecipe(
        RecipeDraft::new("Shortbread")
            .with_ingredient(butter.meta().id, dec("0.25"))
            .with_ingredient(eggs.meta().id, dec("2")),
    ))?;

    pantry.execute(RemoveIngredient {
        id: butter.meta().id,
    })?;

    let quotes = app.cookbook(owner).query(PriceRecipes)?;
    assert_eq!(quotes.len(), 1);
    assert_eq!(quotes[0].costing.final_price, dec("0.4"));
    assert_eq!(
        quotes[0].unresolved,
        vec![Unresolved::Ingredient(butter.meta().id)]
    );
    Ok(())
}

#[test]
fn money_is_stored_without_loss() -> Result<()> {
    let app = memory_app()?;
    let owner = register(&app, "precise@example.com")?;
    let pantry = app.pantry(owner);
    pantry.execute(AddIngredient(IngredientDraft::new(
        "Saffron",
        Unit::G,
        dec("12345678.123456789"),
    )))?;
    let gold = pantry.execute(AddIngredient(IngredientDraft::new(
        "Gold leaf",
        Unit::Piece,
        Decimal::MAX,
    )))?;

    let prices = pantry
        .query(ListIngredients)?
        .into_iter()
        .map(|i| i.price_per_unit.to_string())
        .collect::<Vec<_>>();
    assert_eq!(
        prices,
        vec![Decimal::MAX.to_string(), "12345678.123456789".to_string()]
    );

    let showpiece = app.cookbook(owner).execute(AddRecipe(
        RecipeDraft::new("Showpiece").with_ingredient(gold.meta().id, dec("2")),
    ))?;
    let client = app
        .clients(owner)
        .execute(AddClient(ClientDraft::new("Collector")))?;
    let orders = app.orders(owner);
    let order = orders.execute(PlaceOrder {
        client_id: client.meta().id,
        item: "Gilded cake".to_string(),
        due_date: due(24),
        lines: vec![OrderLine::new(showpiece.meta().id, 3)],
        total: None,
        notes: String::new(),
    })?;
    assert_eq!(order.total, Decimal::MAX);

    orders.execute(UpdateOrder::status(order.meta().id, OrderStatus::Delivered))?;
    let listed = orders.query(ListOrders)?;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].total, Decimal::MAX);

    let stats = app.dashboard(owner).query(ShowDashboard::default())?;
    assert_eq!(stats.total_revenue, Decimal::MAX);
    Ok(())
}

#[test]
fn catalogs_are_private_to_their_owner() -> Result<()> {
    let app = memory_app()?;
    let alice = register(&app, "alice@example.com")?;
    let bob = register(&app, "bob@example.com")?;

    let vanilla = app.pantry(alice).execute(AddIngredient(IngredientDraft::new(
        "Vanilla",
        Unit::G,
        dec("1.2"),
    )))?;
    app.pantry(bob).execute(AddIngredient(IngredientDraft::new(
        "Cocoa",
        Unit::G,
        dec("0.3"),
    )))?;

    let names = app
        .pantry(alice)
        .query(ListIngredients)?
        .into_iter()
        .map(|i| i.name)
        .collect::<std::collections::HashSet<_>>();
    assert_eq!(names, hashset! {"Vanilla".to_string()});

    let err = app
        .pantry(bob)
        .execute(RemoveIngredient {
            id: vanilla.meta().id,
        })
        .expect_err("bob cannot remove alice's vanilla");
    assert!(is::<NotFound>(&err), "Error: {:?}", err);

    let err = app
        .cookbook(bob)
        .query(CalculateRecipe { id: Id::default() })
        .expect_err("no such recipe");
    assert!(is::<NotFound>(&err), "Error: {:?}", err);
    Ok(())
}

#[test]
fn orders_need_an_existing_client() -> Result<()> {
    let app = memory_app()?;
    let owner = register(&app, "orders@example.com")?;

    let err = app
        .orders(owner)
        .execute(PlaceOrder {
            client_id: Id::default(),
            item: "Eclairs".to_string(),
            due_date: due(1),
            lines: Vec::new(),
            total: Some(dec("30")),
            notes: String::new(),
        })
        .expect_err("unknown client");
    assert!(is::<NotFound>(&err), "Error: {:?}", err);
    Ok(())
}

#[test]
fn order_updates_touch_only_given_fields() -> Result<()> {
    let app = memory_app()?;
    let owner = register(&app, "updates@example.com")?;
    let clients = app.clients(owner);
    let first = clients.execute(AddClient(ClientDraft::new("First")))?;
    let second = clients.execute(AddClient(ClientDraft::new("Second")))?;

    let orders = app.orders(owner);
    let order = orders.execute(PlaceOrder {
        client_id: first.meta().id,
        item: "Macarons".to_string(),
        due_date: due(5),
        lines: Vec::new(),
        total: Some(dec("42.50")),
        notes: "Pink".to_string(),
    })?;

    let moved = orders.execute(UpdateOrder {
        client_id: Some(second.meta().id),
        due_date: Some(due(6)),
        ..UpdateOrder::new(order.meta().id)
    })?;
    assert_eq!(moved.client.name, "Second");
    assert_eq!(moved.due_date, due(6));
    assert_eq!(moved.total, dec("42.50"));
    assert_eq!(moved.notes, "Pink");
    assert_eq!(moved.status, OrderStatus::New);

    let renamed = clients.execute(UpdateClient {
        id: second.meta().id,
        draft: ClientDraft::new("Second Renamed"),
    })?;
    assert_eq!(renamed.name, "Second Renamed");
    let listed = orders.query(ListOrders)?;
    assert_eq!(listed[0].client.name, "Second");
    Ok(())
}

#[test]
fn orders_list_latest_due_date_first() -> Result<()> {
    let app = memory_app()?;
    let owner = register(&app, "list@example.com")?;
    let client = app
        .clients(owner)
        .execute(AddClient(ClientDraft::new("Regular")))?;
    let orders = app.orders(owner);
    for &day in &[3, 17, 9] {
        orders.execute(PlaceOrder {
            client_id: client.meta().id,
            item: format!("Order {}", day),
            due_date: due(day),
            lines: Vec::new(),
            total: Some(Decimal::ZERO),
            notes: String::new(),
        })?;
    }

    let due_dates = orders
        .query(ListOrders)?
        .into_iter()
        .map(|o| o.due_date)
        .collect::<Vec<_>>();
    assert_eq!(due_dates, vec![due(17), due(9), due(3)]);

    let last = orders.query(ListOrders)?.pop().expect("an order");
    orders.execute(RemoveOrder { id: last.meta().id })?;
    assert_eq!(orders.query(ListOrders)?.len(), 2);
    Ok(())
}

#[test]
fn invalid_input_is_rejected_before_saving() -> Result<()> {
    let app = memory_app()?;
    let owner = register(&app, "invalid@example.com")?;

    let err = app
        .pantry(owner)
        .execute(AddIngredient(IngredientDraft::new("Salt", Unit::G, dec("-1"))))
        .expect_err("negative price");
    assert!(is::<InvalidInput>(&err), "Error: {:?}", err);

    let err = app
        .cookbook(owner)
        .execute(AddRecipe(RecipeDraft::new("  ")))
        .expect_err("blank name");
    assert!(is::<InvalidInput>(&err), "Error: {:?}", err);

    let client = app
        .clients(owner)
        .execute(AddClient(ClientDraft::new("Someone")))?;
    let err = app
        .orders(owner)
        .execute(PlaceOrder {
            client_id: client.meta().id,
            item: "Nothing".to_string(),
            due_date: due(2),
            lines: vec![OrderLine::new(Id::default(), 0)],
            total: None,
            notes: String::new(),
        })
        .expect_err("zero quantity");
    assert!(is::<InvalidInput>(&err), "Error: {:?}", err);

    assert!(app.pantry(owner).query(ListIngredients)?.is_empty());
    assert!(app.cookbook(owner).query(ListRecipes)?.is_empty());
    assert!(app.orders(owner).query(ListOrders)?.is_empty());
    Ok(())
}

#[test]
fn clients_can_be_removed() -> Result<()> {
    let app = memory_app()?;
    let owner = register(&app, "clients@example.com")?;
    let clients = app.clients(owner);
    let gone = clients.execute(AddClient(ClientDraft::new("Gone")))?;
    clients.execute(RemoveClient { id: gone.meta().id })?;

    let err = clients
        .execute(RemoveClient { id: gone.meta().id })
        .expect_err("already removed");
    assert!(is::<NotFound>(&err), "Error: {:?}", err);
    Ok(())
}

#[test]
fn profile_registration_is_idempotent() -> Result<()> {
    let app = memory_app()?;
    let profiles = app.profiles();
    let first = profiles.execute(RegisterProfile {
        name: "Olena".to_string(),
        email: "Olena@Example.com".to_string(),
    })?;
    let again = profiles.execute(RegisterProfile {
        name: "Someone Else".to_string(),
        email: "olena@example.com".to_string(),
    })?;
    assert_eq!(first, again);

    let updated = profiles.execute(UpdateProfile {
        user: first.meta().id,
        theme: Some(Theme::Dark),
        language: Some(Language::En),
        ..UpdateProfile::default()
    })?;
    assert_eq!(updated.name, "Olena");
    assert_eq!(updated.theme, Theme::Dark);

    let shown = profiles.query(ShowProfile {
        user: first.meta().id,
    })?;
    assert_eq!(shown, updated);
    Ok(())
}

#[test]
fn stale_writers_lose() -> Result<()> {
    let app = memory_app()?;
    let owner = register(&app, "stale@example.com")?;
    let pantry = app.pantry(owner);
    let milk = pantry.execute(AddIngredient(IngredientDraft::new(
        "Milk",
        Unit::L,
        dec("1.1"),
    )))?;

    let pool = junk_drawer::memory_pool()?;
    let docs = pool.get()?;
    let mut stale = milk.clone();
    let mut fresh = milk;
    docs.save(&mut fresh).expect_err("new pool has no milk to update");

    let app_docs = app.db.get()?;
    app_docs.save(&mut fresh)?;
    let err = app_docs.save(&mut stale).expect_err("stale version");
    assert!(is::<ConcurrencyError>(&err), "Error: {:?}", err);
    Ok(())
}
