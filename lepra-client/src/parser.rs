//! HTML and JSON response parsing utilities

use crate::error::LepraError;
use crate::model::{
    DemocracyPageModel, LeproPanelModel, LoginPageModel, MainPageModel, PostModel, SubLepraModel,
};
use regex::Regex;
use reqwest::Url;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use std::sync::OnceLock;

/// Selectors for the pages this client understands
#[derive(Debug)]
struct Selectors {
    captcha: Selector,
    login_code: Selector,
    login_error: Selector,
    username: Selector,
    post: Selector,
    post_body: Selector,
    post_author: Selector,
    post_rating: Selector,
    post_comments: Selector,
    sub_row: Selector,
    sub_link: Selector,
    sub_title: Selector,
    sub_creator: Selector,
    sub_logo: Selector,
    president: Selector,
    ministers: Selector,
    government: Selector,
}

impl Selectors {
    fn compile() -> Self {
        let parse = |s: &str| Selector::parse(s).unwrap();
        Self {
            captcha: parse(r#"img.i-captcha, img[src*="captcha"]"#),
            login_code: parse(r#"input[name="logincode"]"#),
            login_error: parse(".error"),
            username: parse("#greetings a.c_user"),
            post: parse("div.post"),
            post_body: parse(".dt"),
            post_author: parse(".p a.c_user"),
            post_rating: parse(".rating em"),
            post_comments: parse(r#"a[href*="/comments/"]"#),
            sub_row: parse(".jj_row"),
            sub_link: parse("a.jj_link"),
            sub_title: parse(".jj_title"),
            sub_creator: parse("a.c_user"),
            sub_logo: parse("img"),
            president: parse("#president a.c_user"),
            ministers: parse("#ministers a.c_user"),
            government: parse("#president, #ministers"),
        }
    }
}

/// Parser for Leprosorium responses with cached selectors and patterns
#[derive(Debug, Default)]
pub(crate) struct ResponseParser {
    selectors: OnceLock<Selectors>,
    number_regex: OnceLock<Regex>,
    whitespace_regex: OnceLock<Regex>,
}

impl ResponseParser {
    /// Create a new parser with uninitialized caches
    pub fn new() -> Self {
        Self::default()
    }

    fn selectors(&self) -> &Selectors {
        self.selectors.get_or_init(Selectors::compile)
    }

    fn number_regex(&self) -> &Regex {
        self.number_regex
            .get_or_init(|| Regex::new(r"-?\d+").unwrap())
    }

    fn whitespace_regex(&self) -> &Regex {
        self.whitespace_regex
            .get_or_init(|| Regex::new(r"\s+").unwrap())
    }

    /// Text content of an element with runs of whitespace collapsed
    fn text_of(&self, element: ElementRef<'_>) -> String {
        let raw = element.text().collect::<String>();
        self.whitespace_regex()
            .replace_all(raw.trim(), " ")
            .into_owned()
    }

    fn first_number(&self, text: &str) -> Option<i64> {
        self.number_regex().find(text)?.as_str().parse().ok()
    }

    fn first_text(&self, scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
        scope
            .select(selector)
            .next()
            .map(|el| self.text_of(el))
            .filter(|text| !text.is_empty())
    }

    /// Captcha image and login code from the login page
    pub fn parse_login_page(&self, html: &str, base: &Url) -> Result<LoginPageModel, LepraError> {
        let document = Html::parse_document(html);
        let selectors = self.selectors();

        let login_code = document
            .select(&selectors.login_code)
            .next()
            .and_then(|el| el.value().attr("value"))
            .ok_or(LepraError::HtmlParse("logincode input"))?
            .to_string();

        let captcha_src = document
            .select(&selectors.captcha)
            .next()
            .and_then(|el| el.value().attr("src"))
            .ok_or(LepraError::HtmlParse("captcha image"))?;
        let captcha_url = base
            .join(captcha_src)
            .map_err(|_| LepraError::HtmlParse("captcha image"))?
            .to_string();

        Ok(LoginPageModel {
            captcha_url,
            login_code,
        })
    }

    /// Error text shown on a failed login page, if there is any
    pub fn extract_login_error(&self, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        document
            .select(&self.selectors().login_error)
            .map(|el| self.text_of(el))
            .find(|text| !text.is_empty())
    }

    /// Signed-in user and the posts listed on the front page
    pub fn parse_main_page(&self, html: &str) -> Result<MainPageModel, LepraError> {
        let document = Html::parse_document(html);
        let selectors = self.selectors();

        let username = self.first_text(document.root_element(), &selectors.username);
        let posts = document
            .select(&selectors.post)
            .map(|post| self.parse_post_element(post))
            .collect();

        Ok(MainPageModel { username, posts })
    }

    fn parse_post_element(&self, post: ElementRef<'_>) -> PostModel {
        let selectors = self.selectors();

        let id = post
            .value()
            .attr("id")
            .and_then(|id| self.number_regex().find(id))
            .map(|m| m.as_str().trim_start_matches('-').to_string())
            .unwrap_or_default();
        let rating = self
            .first_text(post, &selectors.post_rating)
            .and_then(|text| self.first_number(&text))
            .unwrap_or_default();
        let comment_count = self
            .first_text(post, &selectors.post_comments)
            .and_then(|text| self.first_number(&text))
            .unwrap_or_default();

        PostModel {
            id,
            author: self
                .first_text(post, &selectors.post_author)
                .unwrap_or_default(),
            body: self
                .first_text(post, &selectors.post_body)
                .unwrap_or_default(),
            rating,
            comment_count,
            domain: None,
        }
    }

    /// Rows of the underground listing; an empty page yields an empty list
    pub fn parse_underground(&self, html: &str) -> Result<Vec<SubLepraModel>, LepraError> {
        let document = Html::parse_document(html);
        let selectors = self.selectors();

        document
            .select(&selectors.sub_row)
            .map(|row| -> Result<SubLepraModel, LepraError> {
                let link = row
                    .select(&selectors.sub_link)
                    .next()
                    .ok_or(LepraError::HtmlParse("underground link"))?;
                let url = link.value().attr("href").unwrap_or_default().to_string();
                let name = self.text_of(link);
                let title = self
                    .first_text(row, &selectors.sub_title)
                    .unwrap_or_else(|| name.clone());

                Ok(SubLepraModel {
                    name,
                    title,
                    url,
                    creator: self.first_text(row, &selectors.sub_creator),
                    logo_url: row
                        .select(&selectors.sub_logo)
                        .next()
                        .and_then(|img| img.value().attr("src"))
                        .map(str::to_string),
                })
            })
            .collect()
    }

    /// President and ministers from the democracy page
    pub fn parse_democracy_page(&self, html: &str) -> Result<DemocracyPageModel, LepraError> {
        let document = Html::parse_document(html);
        let selectors = self.selectors();

        if document.select(&selectors.government).next().is_none() {
            return Err(LepraError::HtmlParse("government block"));
        }

        Ok(DemocracyPageModel {
            president: self.first_text(document.root_element(), &selectors.president),
            ministers: document
                .select(&selectors.ministers)
                .map(|el| self.text_of(el))
                .filter(|name| !name.is_empty())
                .collect(),
        })
    }

    /// Panel counters from the panel API
    pub fn parse_lepro_panel(&self, json: &str) -> Result<LeproPanelModel, LepraError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Posts from the posts API
    ///
    /// Accepts `{"posts": [...]}`, `{"posts": {"<id>": {...}}}` or a bare
    /// list. Keyed posts without their own id take the key.
    pub fn parse_posts(&self, json: &str) -> Result<Vec<PostModel>, LepraError> {
        let value: Value = serde_json::from_str(json)?;
        let posts = match value {
            Value::Object(mut map) => map.remove("posts").unwrap_or(Value::Null),
            list @ Value::Array(_) => list,
            _ => Value::Null,
        };

        match posts {
            Value::Null => Ok(Vec::new()),
            Value::Array(items) => Ok(items
                .into_iter()
                .map(serde_json::from_value)
                .collect::<Result<Vec<PostModel>, serde_json::Error>>()?),
            Value::Object(map) => Ok(map
                .into_iter()
                .map(|(key, item)| -> Result<PostModel, serde_json::Error> {
                    let mut post: PostModel = serde_json::from_value(item)?;
                    if post.id.is_empty() {
                        post.id = key;
                    }
                    Ok(post)
                })
                .collect::<Result<Vec<PostModel>, serde_json::Error>>()?),
            _ => Err(LepraError::JsonParse(serde::de::Error::custom(
                "posts must be a list or an object",
            ))),
        }
    }
}
