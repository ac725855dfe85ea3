use std::fmt;
use std::str::FromStr;

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use log::*;
use r2d2::Pool;
use rust_decimal::Decimal;
use serde::Serialize;

use infra::ids::Id;
use infra::persistence::Storage;

use crate::clients::Client;
use crate::orders::{Order, OrderStatus};
use crate::owned;
use crate::services::{Queryable, Request};
use crate::users::User;

const NEW_CLIENT_DAYS: i64 = 30;
const RECENT_ACTIVITY_DAYS: i64 = 7;
const UPCOMING_LIMIT: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    Week,
    Month,
    Quarter,
    Year,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_revenue: Decimal,
    pub total_clients: usize,
    pub new_clients: usize,
    pub active_orders: usize,
    pub recent_activities: usize,
    pub upcoming_orders: Vec<Order>,
}

#[derive(Debug)]
pub struct Dashboard<M: r2d2::ManageConnection> {
    db: Pool<M>,
    owner: Id<User>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShowDashboard {
    pub period: Period,
}

impl Period {
    pub fn days(self) -> i64 {
        match self {
            Period::Week => 7,
            Period::Month => 30,
            Period::Quarter => 90,
            Period::Year => 365,
        }
    }
}

impl Default for Period {
    fn default() -> Self {
        Period::Month
    }
}

impl FromStr for Period {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "week" => Ok(Period::Week),
            "month" => Ok(Period::Month),
            "quarter" => Ok(Period::Quarter),
            "year" => Ok(Period::Year),
            other => Err(format!("unknown period: {:?}", other)),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Period::Week => "week",
            Period::Month => "month",
            Period::Quarter => "quarter",
            Period::Year => "year",
        };
        fmt.write_str(s)
    }
}

impl DashboardStats {
    /// Summarises `orders` and `clients` as seen at `now`.
    ///
    /// Revenue counts delivered orders created within `period`. New clients
    /// and recent activity use fixed windows of 30 and 7 days.
    pub fn compute(orders: &[Order], clients: &[Client], period: Period, now: DateTime<Utc>) -> Self {
        let period_start = now - Duration::days(period.days());
        let new_client_start = now - Duration::days(NEW_CLIENT_DAYS);
        let recent_start = now - Duration::days(RECENT_ACTIVITY_DAYS);

        let total_revenue = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Delivered && o.created_at >= period_start)
            .fold(Decimal::ZERO, |acc, o| {
                acc.checked_add(o.total).unwrap_or(Decimal::MAX)
            });

        let mut upcoming_orders = orders
            .iter()
            .filter(|o| o.status.is_open())
            .cloned()
            .collect::<Vec<_>>();
        upcoming_orders.sort_by(|a, b| a.due_date.cmp(&b.due_date));
        upcoming_orders.truncate(UPCOMING_LIMIT);

        DashboardStats {
            total_revenue,
            total_clients: clients.len(),
            new_clients: clients
                .iter()
                .filter(|c| c.created_at >= new_client_start)
                .count(),
            active_orders: orders.iter().filter(|o| o.status.is_active()).count(),
            recent_activities: orders.iter().filter(|o| o.created_at >= recent_start).count(),
            upcoming_orders,
        }
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Dashboard<M> {
    pub fn new(db: Pool<M>, owner: Id<User>) -> Self {
        Dashboard { db, owner }
    }
}

impl Request for ShowDashboard {
    type Resp = DashboardStats;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ShowDashboard> for Dashboard<M>
{
    fn query(&self, req: ShowDashboard) -> Result<DashboardStats> {
        let docs = self.db.get()?;
        let orders = owned::list::<Order, _>(&*docs, self.owner)?;
        let clients = owned::list::<Client, _>(&*docs, self.owner)?;
        let stats = DashboardStats::compute(&orders, &clients, req.period, Utc::now());
        debug!(
            "Dashboard for {} over {}: {} orders, {} clients",
            self.owner,
            req.period,
            orders.len(),
            clients.len()
        );
        Ok(stats)
    }
}

impl<M: r2d2::ManageConnection> Clone for Dashboard<M> {
    fn clone(&self) -> Self {
        Dashboard {
            db: self.db.clone(),
            owner: self.owner,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::clients::ClientDraft;
    use chrono::NaiveDate;
    use rand::random;

    fn client(created_at: DateTime<Utc>) -> Client {
        Client::new(random(), random(), ClientDraft::new("Client"), created_at)
    }

    fn order(
        client: &Client,
        status: OrderStatus,
        total: i64,
        due: NaiveDate,
        created_at: DateTime<Utc>,
    ) -> Order {
        let mut order = Order::new(random(), client.owner, client, "Cake", due, created_at);
        order.status = status;
        order.total = Decimal::from(total);
        order
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, d).expect("date")
    }

    #[test]
    fn periods_parse_and_default_to_month() {
        assert_eq!("Quarter".parse::<Period>(), Ok(Period::Quarter));
        assert!("fortnight".parse::<Period>().is_err());
        assert_eq!(Period::default().days(), 30);
        assert_eq!(ShowDashboard::default().period, Period::Month);
    }

    #[test]
    fn revenue_counts_delivered_orders_in_period() {
        let now = Utc::now();
        let c = client(now);
        let orders = vec![
            order(&c, OrderStatus::Delivered, 100, day(1), now - Duration::days(3)),
            order(&c, OrderStatus::Delivered, 40, day(2), now - Duration::days(20)),
            order(&c, OrderStatus::Ready, 1000, day(3), now - Duration::days(1)),
            order(&c, OrderStatus::Delivered, 7, day(4), now - Duration::days(200)),
        ];

        let week = DashboardStats::compute(&orders, &[c.clone()], Period::Week, now);
        let month = DashboardStats::compute(&orders, &[c.clone()], Period::Month, now);
        let year = DashboardStats::compute(&orders, &[c], Period::Year, now);

        assert_eq!(week.total_revenue, Decimal::from(100));
        assert_eq!(month.total_revenue, Decimal::from(140));
        assert_eq!(year.total_revenue, Decimal::from(147));
    }

    #[test]
    fn counts_clients_and_activity() {
        let now = Utc::now();
        let old = client(now - Duration::days(90));
        let fresh = client(now - Duration::days(2));
        let orders = vec![
            order(&old, OrderStatus::New, 1, day(5), now - Duration::days(1)),
            order(&old, OrderStatus::InProgress, 1, day(6), now - Duration::days(10)),
            order(&fresh, OrderStatus::Cancelled, 1, day(7), now - Duration::days(3)),
        ];

        let stats = DashboardStats::compute(&orders, &[old, fresh], Period::Month, now);

        assert_eq!(stats.total_clients, 2);
        assert_eq!(stats.new_clients, 1);
        assert_eq!(stats.active_orders, 2);
        assert_eq!(stats.recent_activities, 2);
    }

    #[test]
    fn upcoming_orders_are_open_soonest_first_and_limited() {
        let now = Utc::now();
        let c = client(now);
        let mut orders = (1..=7)
            .rev()
            .map(|d| order(&c, OrderStatus::New, 1, day(d), now))
            .collect::<Vec<_>>();
        orders.push(order(&c, OrderStatus::Delivered, 1, day(1), now));

        let stats = DashboardStats::compute(&orders, &[c], Period::Month, now);

        let due = stats
            .upcoming_orders
            .iter()
            .map(|o| o.due_date)
            .collect::<Vec<_>>();
        assert_eq!(due, vec![day(1), day(2), day(3), day(4), day(5)]);
        assert!(stats
            .upcoming_orders
            .iter()
            .all(|o| o.status == OrderStatus::New));
    }
}
