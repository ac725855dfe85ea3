use anyhow::{Context, Result};
use chrono::Utc;
use log::*;
use r2d2::Pool;

use infra::documents::HasMeta;
use infra::ids::{Id, IdGen};
use infra::persistence::Storage;

use crate::owned;
use crate::services::{Commandable, Queryable, Request};
use crate::users::User;

mod models;

pub use self::models::{Client, ClientDraft, ClientRef};

#[derive(Debug)]
pub struct Clients<M: r2d2::ManageConnection> {
    db: Pool<M>,
    owner: Id<User>,
    idgen: IdGen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListClients;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddClient(pub ClientDraft);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateClient {
    pub id: Id<Client>,
    pub draft: ClientDraft,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RemoveClient {
    pub id: Id<Client>,
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Clients<M> {
    pub fn new(db: Pool<M>, owner: Id<User>) -> Self {
        let idgen = IdGen::new();
        Clients { db, owner, idgen }
    }
}

impl Request for ListClients {
    type Resp = Vec<Client>;
}

impl Request for AddClient {
    type Resp = Client;
}

impl Request for UpdateClient {
    type Resp = Client;
}

impl Request for RemoveClient {
    type Resp = ();
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ListClients> for Clients<M>
{
    fn query(&self, _: ListClients) -> Result<Vec<Client>> {
        let docs = self.db.get()?;
        let mut list = owned::list::<Client, _>(&*docs, self.owner)?;
        list.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(list)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<AddClient> for Clients<M>
{
    fn execute(&self, req: AddClient) -> Result<Client> {
        let AddClient(draft) = req;
        draft.validate()?;
        let mut client = Client::new(self.idgen.generate(), self.owner, draft, Utc::now());
        self.db
            .get()?
            .save(&mut client)
            .context("save client")?;
        info!("Added client {}: {}", client.meta().id, client.name);
        Ok(client)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<UpdateClient> for Clients<M>
{
    fn execute(&self, req: UpdateClient) -> Result<Client> {
        let UpdateClient { id, draft } = req;
        draft.validate()?;
        let docs = self.db.get()?;
        let mut client = owned::fetch(&*docs, self.owner, &id)?;
        client.apply(draft);
        docs.save(&mut client).context("save client")?;
        debug!("Updated client {:?}", client);
        Ok(client)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<RemoveClient> for Clients<M>
{
    fn execute(&self, req: RemoveClient) -> Result<()> {
        let docs = self.db.get()?;
        let client: Client = owned::fetch(&*docs, self.owner, &req.id)?;
        docs.delete(&client).context("delete client")?;
        info!("Removed client {}", req.id);
        Ok(())
    }
}

impl<M: r2d2::ManageConnection> Clone for Clients<M> {
    fn clone(&self) -> Self {
        Clients {
            db: self.db.clone(),
            owner: self.owner,
            idgen: IdGen::new(),
        }
    }
}
