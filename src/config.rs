//! Engine configuration and connection strings

use nom::bytes::complete::take_till1;
use nom::character::complete::char;
use nom::combinator::rest;
use nom::sequence::separated_pair;
use nom::IResult;

use crate::error::{Error, Result};
use crate::transaction::IsolationLevel;

/// Settings shared by every database of a [`crate::Registry`]
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// User allowed to create databases on first connect
    pub admin_user: String,
    pub admin_password: String,
    /// Isolation used by statements outside an explicit transaction
    pub default_isolation: IsolationLevel,
    /// Whether CHAR(n) values are stored padded with spaces
    pub pad_char: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            admin_user: "sa".to_string(),
            admin_password: String::new(),
            default_isolation: IsolationLevel::ReadCommitted,
            pad_char: true,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn admin(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.admin_user = user.into();
        self.admin_password = password.into();
        self
    }

    pub fn default_isolation(mut self, level: IsolationLevel) -> Self {
        self.default_isolation = level;
        self
    }

    pub fn pad_char(mut self, pad: bool) -> Self {
        self.pad_char = pad;
        self
    }
}

/// Parsed `Database=...;User ID=...;Password=...`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionString {
    pub database: String,
    pub user: String,
    pub password: String,
}

fn key_value(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(take_till1(|c| c == '='), char('='), rest)(input)
}

impl ConnectionString {
    /// Parse a connection string. Keys are case-insensitive; `Initial
    /// Catalog`, `UID` and `PWD` are accepted as aliases. Database and user
    /// are required.
    pub fn parse(input: &str) -> Result<Self> {
        let mut database = None;
        let mut user = None;
        let mut password = None;

        for segment in input.split(';').map(str::trim).filter(|s| !s.is_empty()) {
            let (_, (key, value)) = key_value(segment).map_err(|_| {
                Error::InvalidConnectionString(format!("expected key=value, got '{}'", segment))
            })?;
            let value = value.trim().to_string();
            match key.trim().to_ascii_lowercase().as_str() {
                "database" | "initial catalog" => database = Some(value),
                "user id" | "uid" | "user" => user = Some(value),
                "password" | "pwd" => password = Some(value),
                other => {
                    return Err(Error::InvalidConnectionString(format!(
                        "unknown key '{}'",
                        other
                    )))
                }
            }
        }

        let database = database
            .filter(|d| !d.is_empty())
            .ok_or_else(|| Error::InvalidConnectionString("missing Database".to_string()))?;
        let user = user
            .filter(|u| !u.is_empty())
            .ok_or_else(|| Error::InvalidConnectionString("missing User ID".to_string()))?;

        Ok(Self {
            database,
            user,
            password: password.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_with_aliases() {
        let cs = ConnectionString::parse("Initial Catalog=Shop; UID=sa;PWD=p=w;").unwrap();
        assert_eq!(cs.database, "Shop");
        assert_eq!(cs.user, "sa");
        assert_eq!(cs.password, "p=w");
    }

    #[test]
    fn test_missing_parts_rejected() {
        assert!(matches!(
            ConnectionString::parse("User ID=sa"),
            Err(Error::InvalidConnectionString(_))
        ));
        assert!(ConnectionString::parse("Database=x").is_err());
        assert!(ConnectionString::parse("Database=x;User ID=sa;Colour=blue").is_err());
        assert!(ConnectionString::parse("Database=x;=sa").is_err());
    }

    #[test]
    fn test_config_builder() {
        let config = EngineConfig::new()
            .admin("root", "secret")
            .pad_char(false)
            .default_isolation(IsolationLevel::Serializable);
        assert_eq!(config.admin_user, "root");
        assert!(!config.pad_char);
        assert_eq!(config.default_isolation, IsolationLevel::Serializable);
    }
}
