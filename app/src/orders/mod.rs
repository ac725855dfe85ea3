use anyhow::{Context, Result};
use chrono::{NaiveDate, Utc};
use log::*;
use r2d2::Pool;
use rust_decimal::Decimal;

use infra::documents::HasMeta;
use infra::ids::{Id, IdGen};
use infra::persistence::Storage;

use crate::clients::Client;
use crate::owned;
use crate::pricing::Catalog;
use crate::services::{Commandable, Queryable, Request};
use crate::users::User;

mod models;

pub use self::models::{Order, OrderLine, OrderStatus};

#[derive(Debug)]
pub struct Orders<M: r2d2::ManageConnection> {
    db: Pool<M>,
    owner: Id<User>,
    idgen: IdGen,
}

/// All orders, latest due date first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOrders;

/// What `lines` would cost at current recipe prices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestTotal {
    pub lines: Vec<OrderLine>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOrder {
    pub client_id: Id<Client>,
    pub item: String,
    pub due_date: NaiveDate,
    pub lines: Vec<OrderLine>,
    /// A manual total; the suggested one is used when absent.
    pub total: Option<Decimal>,
    pub notes: String,
}

/// Changes the fields that are present and leaves the rest alone.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UpdateOrder {
    pub id: Id<Order>,
    pub client_id: Option<Id<Client>>,
    pub item: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub lines: Option<Vec<OrderLine>>,
    pub total: Option<Decimal>,
    pub status: Option<OrderStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveOrder {
    pub id: Id<Order>,
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Orders<M> {
    pub fn new(db: Pool<M>, owner: Id<User>) -> Self {
        let idgen = IdGen::new();
        Orders { db, owner, idgen }
    }

    fn suggest(&self, docs: &D, lines: &[OrderLine]) -> Result<Decimal> {
        let catalog = Catalog::load(docs, self.owner)?;
        for missing in catalog.unresolved_lines(lines) {
            warn!("Order line skipped: {}", missing);
        }
        Ok(catalog.order_total(lines))
    }
}

impl UpdateOrder {
    pub fn new(id: Id<Order>) -> Self {
        UpdateOrder {
            id,
            ..Default::default()
        }
    }

    pub fn status(id: Id<Order>, status: OrderStatus) -> Self {
        UpdateOrder {
            status: Some(status),
            ..UpdateOrder::new(id)
        }
    }
}

impl Request for ListOrders {
    type Resp = Vec<Order>;
}

impl Request for SuggestTotal {
    type Resp = Decimal;
}

impl Request for PlaceOrder {
    type Resp = Order;
}

impl Request for UpdateOrder {
    type Resp = Order;
}

impl Request for RemoveOrder {
    type Resp = ();
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ListOrders> for Orders<M>
{
    fn query(&self, _: ListOrders) -> Result<Vec<Order>> {
        let docs = self.db.get()?;
        let mut list = owned::list::<Order, _>(&*docs, self.owner)?;
        list.sort_by(|a, b| b.due_date.cmp(&a.due_date));
        trace!("Listed {} orders for {}", list.len(), self.owner);
        Ok(list)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<SuggestTotal> for Orders<M>
{
    fn query(&self, req: SuggestTotal) -> Result<Decimal> {
        let docs = self.db.get()?;
        self.suggest(&*docs, &req.lines)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<PlaceOrder> for Orders<M>
{
    fn execute(&self, req: PlaceOrder) -> Result<Order> {
        OrderLine::validate_all(&req.lines)?;
        if let Some(total) = req.total {
            models::validate_total(total)?;
        }
        let docs = self.db.get()?;
        let client = owned::fetch(&*docs, self.owner, &req.client_id)?;

        let mut order = Order::new(
            self.idgen.generate(),
            self.owner,
            &client,
            &req.item,
            req.due_date,
            Utc::now(),
        );
        order.total = match req.total {
            Some(total) => total,
            None => self.suggest(&*docs, &req.lines)?,
        };
        order.lines = req.lines;
        order.notes = req.notes;

        docs.save(&mut order).context("save order")?;
        info!(
            "Placed order {} for {} due {}: {}",
            order.meta().id,
            order.client.name,
            order.due_date,
            order.total
        );
        Ok(order)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<UpdateOrder> for Orders<M>
{
    fn execute(&self, req: UpdateOrder) -> Result<Order> {
        if let Some(ref lines) = req.lines {
            OrderLine::validate_all(lines)?;
        }
        if let Some(total) = req.total {
            models::validate_total(total)?;
        }
        let docs = self.db.get()?;
        let mut order: Order = owned::fetch(&*docs, self.owner, &req.id)?;

        if let Some(client_id) = req.client_id {
            let client = owned::fetch(&*docs, self.owner, &client_id)?;
            order.set_client(&client);
        }
        if let Some(item) = req.item {
            order.item = item.trim().to_string();
        }
        if let Some(due_date) = req.due_date {
            order.due_date = due_date;
        }
        match (&req.lines, req.total) {
            (_, Some(total)) => order.total = total,
            (Some(lines), None) => order.total = self.suggest(&*docs, lines)?,
            (None, None) => {}
        }
        if let Some(lines) = req.lines {
            order.lines = lines;
        }
        if let Some(status) = req.status {
            debug!("Order {}: {} -> {}", req.id, order.status, status);
            order.status = status;
        }
        if let Some(notes) = req.notes {
            order.notes = notes;
        }

        docs.save(&mut order).context("save order")?;
        debug!("Updated order {:?}", order);
        Ok(order)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<RemoveOrder> for Orders<M>
{
    fn execute(&self, req: RemoveOrder) -> Result<()> {
        let docs = self.db.get()?;
        let order: Order = owned::fetch(&*docs, self.owner, &req.id)?;
        docs.delete(&order).context("delete order")?;
        info!("Removed order {}", req.id);
        Ok(())
    }
}

impl<M: r2d2::ManageConnection> Clone for Orders<M> {
    fn clone(&self) -> Self {
        Orders {
            db: self.db.clone(),
            owner: self.owner,
            idgen: IdGen::new(),
        }
    }
}
