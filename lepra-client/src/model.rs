//! Typed page models produced by the response parser

use serde::{Deserialize, Deserializer, Serialize};

/// Outcome of a login attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginResult {
    /// Session cookies were issued and stored
    Success,
    /// The server refused the credentials
    Rejected {
        /// Human-readable reason taken from the returned page
        message: String,
    },
}

impl LoginResult {
    /// Whether the login succeeded
    pub fn is_success(&self) -> bool {
        matches!(self, LoginResult::Success)
    }

    /// Rejection message, if any
    pub fn error_message(&self) -> Option<&str> {
        match self {
            LoginResult::Success => None,
            LoginResult::Rejected { message } => Some(message),
        }
    }
}

/// Data needed to fill in the login form
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginPageModel {
    /// Absolute URL of the captcha image
    pub captcha_url: String,
    /// Hidden one-time code that must be sent back with the form
    pub login_code: String,
}

/// Front page of the site
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MainPageModel {
    /// Login of the signed-in user, when the page shows one
    pub username: Option<String>,
    /// Posts visible on the page
    pub posts: Vec<PostModel>,
}

/// Counters shown in the user panel
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LeproPanelModel {
    #[serde(deserialize_with = "number_or_string")]
    pub karma: i64,
    #[serde(deserialize_with = "number_or_string")]
    pub rating: i64,
    #[serde(rename = "voteweight", deserialize_with = "number_or_string")]
    pub vote_weight: i64,
    #[serde(rename = "inboxunreadposts", deserialize_with = "number_or_string")]
    pub inbox_unread_posts: i64,
    #[serde(rename = "inboxunreadcomms", deserialize_with = "number_or_string")]
    pub inbox_unread_comments: i64,
    #[serde(rename = "myunreadposts", deserialize_with = "number_or_string")]
    pub my_unread_posts: i64,
    #[serde(rename = "myunreadcomms", deserialize_with = "number_or_string")]
    pub my_unread_comments: i64,
}

/// One sub-site in the underground listing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubLepraModel {
    pub name: String,
    pub title: String,
    pub url: String,
    pub creator: Option<String>,
    pub logo_url: Option<String>,
}

/// Democracy page: current government
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DemocracyPageModel {
    pub president: Option<String>,
    pub ministers: Vec<String>,
}

/// A single post
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PostModel {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(alias = "login", alias = "user_login")]
    pub author: String,
    pub body: String,
    #[serde(deserialize_with = "number_or_string")]
    pub rating: i64,
    #[serde(alias = "comm_count", deserialize_with = "number_or_string")]
    pub comment_count: i64,
    #[serde(alias = "domain_url")]
    pub domain: Option<String>,
}

/// The service sends counters both as JSON numbers and as strings
fn number_or_string<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
        Null(()),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) if s.trim().is_empty() => Ok(0),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
        Raw::Null(()) => Ok(0),
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(i64),
        Text(String),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Number(n) => n.to_string(),
        Raw::Text(s) => s,
    })
}
