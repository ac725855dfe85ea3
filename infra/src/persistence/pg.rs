use std::fmt;

use anyhow::{anyhow, Result};
use log::*;
use postgres::Connection;
use r2d2::ManageConnection;
use r2d2_postgres::PostgresConnectionManager;
use serde::{de::DeserializeOwned, Serialize};

use super::{ConcurrencyError, Storage};
use crate::documents::{HasMeta, Version};
use crate::ids::{Entity, Id};

const SETUP_SQL: &str = include_str!("persistence.sql");
const LOAD_SQL: &str = "SELECT body FROM documents WHERE id = $1";
const LOAD_ALL_SQL: &str = "SELECT body FROM documents WHERE id LIKE $1 ORDER BY id";
const INSERT_SQL: &str = "WITH a as (
                            SELECT $1::jsonb as body
                            )
                            INSERT INTO documents (id, body)
                            SELECT a.body ->> '_id', jsonb_set(a.body, '{_version}', to_jsonb(to_hex(txid_current())))
                            FROM a
                            WHERE NOT EXISTS (
                                SELECT 1 FROM documents d where d.id = a.body ->> '_id'
                            )";
const UPDATE_SQL: &str = "WITH a as (
                            SELECT $1::jsonb as body
                            )
                            UPDATE documents AS d
                                SET body = jsonb_set(a.body, '{_version}', to_jsonb(to_hex(txid_current())))
                                FROM a
                                WHERE id = a.body ->> '_id'
                                AND d.body -> '_version' = a.body -> '_version'";
const DELETE_SQL: &str = "DELETE FROM documents WHERE id = $1 AND body ->> '_version' = $2";
const CURRENT_VERSION_SQL: &str = "SELECT to_hex(txid_current())";

/// Document storage over a single PostgreSQL `documents` table.
pub struct Documents {
    connection: Connection,
}

pub struct DocumentConnectionManager {
    inner: PostgresConnectionManager,
}

impl Documents {
    pub fn wrap(connection: Connection) -> Self {
        Documents { connection }
    }

    pub fn get_ref(&self) -> &Connection {
        &self.connection
    }

    fn decode<D: DeserializeOwned>(json: serde_json::Value) -> Result<D> {
        Ok(serde_json::from_value(json)?)
    }
}

impl Storage for Documents {
    fn setup(&self) -> Result<()> {
        self.connection.batch_execute(SETUP_SQL)?;
        Ok(())
    }

    fn load<D: DeserializeOwned + Entity>(&self, id: &Id<D>) -> Result<Option<D>> {
        let load = self.connection.prepare_cached(LOAD_SQL)?;
        let res = load.query(&[&id.to_string()])?;

        if let Some(row) = res.iter().next() {
            let json: serde_json::Value = row
                .get_opt(0)
                .ok_or_else(|| anyhow!("Missing column in row?"))??;
            Ok(Some(Self::decode(json)?))
        } else {
            Ok(None)
        }
    }

    fn load_all<D: DeserializeOwned + Entity>(&self) -> Result<Vec<D>> {
        let pattern = format!("{}%", Id::<D>::prefix_pattern());
        let load = self.connection.prepare_cached(LOAD_ALL_SQL)?;
        let res = load.query(&[&pattern])?;
        trace!("Loaded {} rows matching {:?}", res.len(), pattern);

        let mut docs = Vec::with_capacity(res.len());
        for row in res.iter() {
            let json: serde_json::Value = row
                .get_opt(0)
                .ok_or_else(|| anyhow!("Missing column in row?"))??;
            docs.push(Self::decode(json)?);
        }
        Ok(docs)
    }

    fn save<D: Serialize + HasMeta>(&self, document: &mut D) -> Result<()> {
        let json = serde_json::to_value(&*document)?;
        let t = self.connection.transaction()?;
        let sql = if document.meta().version.is_new() {
            INSERT_SQL
        } else {
            UPDATE_SQL
        };
        let nrows = t.prepare_cached(sql)?.execute(&[&json])?;
        debug!("Save of {} modified {} rows", document.meta().id, nrows);
        if nrows != 1 {
            warn!("Save impacted {} rows not 1", nrows);
            return Err(ConcurrencyError.into());
        }

        let res = t.prepare_cached(CURRENT_VERSION_SQL)?.query(&[])?;
        let version: String = res
            .iter()
            .next()
            .ok_or_else(|| anyhow!("Missing version row?"))?
            .get_opt(0)
            .ok_or_else(|| anyhow!("Missing version column?"))??;
        t.commit()?;

        document.meta_mut().version = Version::from(version);
        Ok(())
    }

    fn delete<D: HasMeta>(&self, document: &D) -> Result<()> {
        let meta = document.meta();
        let nrows = self
            .connection
            .prepare_cached(DELETE_SQL)?
            .execute(&[&meta.id.to_string(), &meta.version.as_str()])?;
        debug!("Delete of {} removed {} rows", meta.id, nrows);
        if nrows != 1 {
            warn!("Delete impacted {} rows not 1", nrows);
            return Err(ConcurrencyError.into());
        }
        Ok(())
    }
}

impl DocumentConnectionManager {
    pub fn new(inner: PostgresConnectionManager) -> Self {
        DocumentConnectionManager { inner }
    }
}

impl fmt::Debug for DocumentConnectionManager {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_struct("DocumentConnectionManager").finish()
    }
}

impl ManageConnection for DocumentConnectionManager {
    type Connection = Documents;
    type Error = postgres::Error;

    fn connect(&self) -> Result<Documents, postgres::Error> {
        self.inner.connect().map(Documents::wrap)
    }

    fn is_valid(&self, conn: &mut Documents) -> Result<(), postgres::Error> {
        self.inner.is_valid(&mut conn.connection)
    }

    fn has_broken(&self, conn: &mut Documents) -> bool {
        self.inner.has_broken(&mut conn.connection)
    }
}
