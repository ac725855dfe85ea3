use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use infra::documents::{DocMeta, HasMeta};
use infra::ids::{Entity, Id};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    Dark,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Uk,
    En,
}

/// The operator owning a set of catalogs and orders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(flatten)]
    pub(crate) meta: DocMeta<User>,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub theme: Theme,
    #[serde(default)]
    pub language: Language,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub(crate) fn new(name: &str, email: &str, created_at: DateTime<Utc>) -> Self {
        User {
            meta: DocMeta::new_with_id(Self::id_for(email)),
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            avatar: None,
            theme: Theme::default(),
            language: Language::default(),
            created_at,
        }
    }

    /// Users are keyed by e-mail address, case insensitively.
    pub fn id_for(email: &str) -> Id<User> {
        Id::hashed(email.trim().to_lowercase().as_str())
    }
}

impl Default for Theme {
    fn default() -> Self {
        Theme::System
    }
}

impl Default for Language {
    fn default() -> Self {
        Language::Uk
    }
}

impl FromStr for Theme {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "light" => Ok(Theme::Light),
            "dark" => Ok(Theme::Dark),
            "system" => Ok(Theme::System),
            other => Err(format!("unknown theme: {:?}", other)),
        }
    }
}

impl FromStr for Language {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uk" => Ok(Language::Uk),
            "en" => Ok(Language::En),
            other => Err(format!("unknown language: {:?}", other)),
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        let s = match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        };
        fmt.write_str(s)
    }
}

impl Entity for User {
    const PREFIX: &'static str = "user";
}

impl HasMeta for User {
    fn meta(&self) -> &DocMeta<User> {
        &self.meta
    }
    fn meta_mut(&mut self) -> &mut DocMeta<User> {
        &mut self.meta
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn id_ignores_case_and_whitespace() {
        assert_eq!(
            User::id_for(" Olena@Example.com"),
            User::id_for("olena@example.com")
        );
    }

    #[test]
    fn settings_default_when_absent() {
        let user = User::new("Olena", "olena@example.com", Utc::now());
        let mut json = serde_json::to_value(&user).expect("to json");
        let obj = json.as_object_mut().expect("object");
        obj.remove("theme");
        obj.remove("language");

        let back: User = serde_json::from_value(json).expect("from json");
        assert_eq!(back.theme, Theme::System);
        assert_eq!(back.language, Language::Uk);
    }
}
