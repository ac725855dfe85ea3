use anyhow::{Context, Result};
use log::*;
use r2d2::Pool;

use infra::ids::Id;
use infra::persistence::{DocumentConnectionManager, Storage};

pub mod clients;
pub mod config;
pub mod dashboard;
pub mod errors;
pub mod ingredients;
mod lenient;
pub mod orders;
mod owned;
pub mod pricing;
pub mod recipes;
pub mod semifinished;
pub mod services;
pub mod users;

#[cfg(test)]
mod test;

/// Entry point handing out services over one storage pool.
#[derive(Debug)]
pub struct Confectionery<M: r2d2::ManageConnection> {
    db: Pool<M>,
}

impl Confectionery<DocumentConnectionManager> {
    pub fn connect(config: &config::Config) -> Result<Self> {
        let db = config.postgres.build()?;
        Ok(Confectionery::new(db))
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Confectionery<M> {
    pub fn new(db: Pool<M>) -> Self {
        Confectionery { db }
    }

    pub fn setup(&self) -> Result<()> {
        debug!("Init schema");
        self.db.get()?.setup().context("setup persistence")?;
        Ok(())
    }

    pub fn profiles(&self) -> users::Profiles<M> {
        users::Profiles::new(self.db.clone())
    }

    pub fn pantry(&self, owner: Id<users::User>) -> ingredients::Pantry<M> {
        ingredients::Pantry::new(self.db.clone(), owner)
    }

    pub fn prep(&self, owner: Id<users::User>) -> semifinished::Prep<M> {
        semifinished::Prep::new(self.db.clone(), owner)
    }

    pub fn cookbook(&self, owner: Id<users::User>) -> recipes::Cookbook<M> {
        recipes::Cookbook::new(self.db.clone(), owner)
    }

    pub fn clients(&self, owner: Id<users::User>) -> clients::Clients<M> {
        clients::Clients::new(self.db.clone(), owner)
    }

    pub fn orders(&self, owner: Id<users::User>) -> orders::Orders<M> {
        orders::Orders::new(self.db.clone(), owner)
    }

    pub fn dashboard(&self, owner: Id<users::User>) -> dashboard::Dashboard<M> {
        dashboard::Dashboard::new(self.db.clone(), owner)
    }
}

impl<M: r2d2::ManageConnection> Clone for Confectionery<M> {
    fn clone(&self) -> Self {
        Confectionery {
            db: self.db.clone(),
        }
    }
}
