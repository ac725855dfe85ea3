use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

use crate::errors::{self, InvalidInput};
use crate::owned::Owned;
use crate::users::User;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<Client>,
    pub owner: Id<User>,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// The part of a client copied onto each of their orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRef {
    pub id: Id<Client>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ClientDraft {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

impl Client {
    pub(crate) fn new(
        id: Id<Client>,
        owner: Id<User>,
        draft: ClientDraft,
        created_at: DateTime<Utc>,
    ) -> Self {
        let mut client = Client {
            meta: DocMeta::new_with_id(id),
            owner,
            name: String::new(),
            email: None,
            phone: None,
            created_at,
        };
        client.apply(draft);
        client
    }

    pub(crate) fn apply(&mut self, draft: ClientDraft) {
        self.name = draft.name.trim().to_string();
        self.email = blank_to_none(draft.email);
        self.phone = blank_to_none(draft.phone);
    }

    pub fn reference(&self) -> ClientRef {
        ClientRef {
            id: self.meta.id,
            name: self.name.clone(),
        }
    }
}

impl ClientDraft {
    pub fn new(name: &str) -> Self {
        ClientDraft {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<(), InvalidInput> {
        errors::non_empty("client name", &self.name)
    }
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Entity for Client {
    const PREFIX: &'static str = "client";
}

impl HasMeta for Client {
    fn meta(&self) -> &DocMeta<Client> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<Client> {
        &mut self.meta
    }
}

impl Owned for Client {
    fn owner(&self) -> Id<User> {
        self.owner
    }
}
