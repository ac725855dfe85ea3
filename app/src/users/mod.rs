use anyhow::{Context, Result};
use chrono::Utc;
use log::*;
use r2d2::Pool;

use infra::documents::HasMeta;
use infra::ids::Id;
use infra::persistence::Storage;

use crate::errors::{self, NotFound};
use crate::services::{Commandable, Queryable, Request};

mod models;

pub use self::models::{Language, Theme, User};

/// Operator profiles and their settings.
#[derive(Debug)]
pub struct Profiles<M: r2d2::ManageConnection> {
    db: Pool<M>,
}

/// Creates the profile for `email`, or returns the existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterProfile {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShowProfile {
    pub user: Id<User>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UpdateProfile {
    pub user: Id<User>,
    pub name: Option<String>,
    pub avatar: Option<String>,
    pub theme: Option<Theme>,
    pub language: Option<Language>,
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static> Profiles<M> {
    pub fn new(db: Pool<M>) -> Self {
        Profiles { db }
    }
}

impl Request for RegisterProfile {
    type Resp = User;
}

impl Request for ShowProfile {
    type Resp = User;
}

impl Request for UpdateProfile {
    type Resp = User;
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<RegisterProfile> for Profiles<M>
{
    fn execute(&self, req: RegisterProfile) -> Result<User> {
        errors::non_empty("name", &req.name)?;
        errors::non_empty("email", &req.email)?;
        let docs = self.db.get()?;
        if let Some(user) = docs.load::<User>(&User::id_for(&req.email))? {
            trace!("Profile {} already registered", user.meta().id);
            return Ok(user);
        }
        let mut user = User::new(&req.name, &req.email, Utc::now());
        docs.save(&mut user).context("save profile")?;
        info!("Registered profile {} for {}", user.meta().id, user.email);
        Ok(user)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Queryable<ShowProfile> for Profiles<M>
{
    fn query(&self, req: ShowProfile) -> Result<User> {
        let docs = self.db.get()?;
        let user = docs
            .load::<User>(&req.user)?
            .ok_or_else(|| NotFound::of(&req.user))?;
        Ok(user)
    }
}

impl<M: r2d2::ManageConnection<Connection = D>, D: Storage + Send + 'static>
    Commandable<UpdateProfile> for Profiles<M>
{
    fn execute(&self, req: UpdateProfile) -> Result<User> {
        let docs = self.db.get()?;
        let mut user = docs
            .load::<User>(&req.user)?
            .ok_or_else(|| NotFound::of(&req.user))?;
        if let Some(name) = req.name {
            errors::non_empty("name", &name)?;
            user.name = name.trim().to_string();
        }
        if let Some(avatar) = req.avatar {
            user.avatar = Some(avatar).filter(|a| !a.trim().is_empty());
        }
        if let Some(theme) = req.theme {
            user.theme = theme;
        }
        if let Some(language) = req.language {
            user.language = language;
        }
        docs.save(&mut user).context("save profile")?;
        debug!("Updated profile {:?}", user);
        Ok(user)
    }
}

impl<M: r2d2::ManageConnection> Clone for Profiles<M> {
    fn clone(&self) -> Self {
        Profiles {
            db: self.db.clone(),
        }
    }
}
