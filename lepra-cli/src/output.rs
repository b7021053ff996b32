//! Output formatting for fetched models

use crate::error::CliError;
use lepra_client::{
    DemocracyPageModel, LeproPanelModel, LoginPageModel, MainPageModel, PostModel, SubLepraModel,
};
use serde::Serialize;
use std::fmt::Write;

/// Plain-text rendering of a fetched model
pub trait Render {
    fn render(&self) -> String;
}

/// Output formatter for fetched models
pub struct OutputFormatter {
    json: bool,
    start_time: std::time::Instant,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(json: bool) -> Self {
        Self {
            json,
            start_time: std::time::Instant::now(),
        }
    }

    /// Print a model as JSON or as text
    pub fn print<T: Render + Serialize>(&self, value: &T) -> Result<(), CliError> {
        if self.json {
            println!("{}", serde_json::to_string_pretty(value)?);
        } else {
            print!("{}", value.render());
            println!("(fetched in {})", format_std_duration(self.start_time.elapsed()));
        }
        Ok(())
    }
}

impl Render for LoginPageModel {
    fn render(&self) -> String {
        format!(
            "Login code: {}\nCaptcha:    {}\n",
            self.login_code, self.captcha_url
        )
    }
}

impl Render for MainPageModel {
    fn render(&self) -> String {
        let mut out = String::new();
        if let Some(username) = &self.username {
            let _ = writeln!(out, "Signed in as {}", username);
        }
        out.push_str(&self.posts.render());
        out
    }
}

impl Render for LeproPanelModel {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Karma:       {}", self.karma);
        let _ = writeln!(out, "Rating:      {}", self.rating);
        let _ = writeln!(out, "Vote weight: {}", self.vote_weight);
        let _ = writeln!(
            out,
            "Inbox:       {} posts, {} comments unread",
            self.inbox_unread_posts, self.inbox_unread_comments
        );
        let _ = writeln!(
            out,
            "My things:   {} posts, {} comments unread",
            self.my_unread_posts, self.my_unread_comments
        );
        out
    }
}

impl Render for DemocracyPageModel {
    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "President: {}",
            self.president.as_deref().unwrap_or("(vacant)")
        );
        if self.ministers.is_empty() {
            out.push_str("Ministers: none\n");
        } else {
            let _ = writeln!(out, "Ministers: {}", self.ministers.join(", "));
        }
        out
    }
}

impl Render for Vec<SubLepraModel> {
    fn render(&self) -> String {
        if self.is_empty() {
            return "No sub-sites on this page.\n".to_string();
        }
        let mut out = String::new();
        for sub in self {
            let _ = write!(out, "{} - {} <{}>", sub.name, sub.title, sub.url);
            if let Some(creator) = &sub.creator {
                let _ = write!(out, " by {}", creator);
            }
            out.push('\n');
        }
        out
    }
}

impl Render for Vec<PostModel> {
    fn render(&self) -> String {
        if self.is_empty() {
            return "No posts.\n".to_string();
        }
        let mut out = String::new();
        for post in self {
            let _ = writeln!(
                out,
                "#{} by {} [{:+}] {} comments",
                post.id, post.author, post.rating, post.comment_count
            );
            if !post.body.is_empty() {
                let _ = writeln!(out, "    {}", truncate(&post.body, 120));
            }
        }
        out
    }
}

/// Shorten text to at most `max` characters, marking the cut with an ellipsis
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut short: String = text.chars().take(max.saturating_sub(1)).collect();
    short.push('…');
    short
}

/// Format a std::time::Duration for display (used for wall-clock time)
fn format_std_duration(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    if micros < 1000 {
        format!("{}µs", micros)
    } else if micros < 1_000_000 {
        format!("{:.2}ms", micros as f64 / 1000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::time::Duration;

    #[test]
    fn test_render_panel() {
        let panel = LeproPanelModel {
            karma: 12,
            rating: 340,
            ..Default::default()
        };
        let text = panel.render();
        assert!(text.contains("Karma:       12"));
        assert!(text.contains("Rating:      340"));
    }

    #[test]
    fn test_render_posts() {
        let posts = vec![PostModel {
            id: "15".to_string(),
            author: "alice".to_string(),
            body: "hello".to_string(),
            rating: 3,
            comment_count: 2,
            domain: None,
        }];
        assert_eq!(posts.render(), "#15 by alice [+3] 2 comments\n    hello\n");
        assert_eq!(Vec::<PostModel>::new().render(), "No posts.\n");
    }

    #[test]
    fn test_render_democracy_vacant() {
        let page = DemocracyPageModel {
            president: None,
            ministers: vec![],
        };
        assert_eq!(page.render(), "President: (vacant)\nMinisters: none\n");
    }

    #[test]
    fn test_format_std_duration() {
        assert_eq!(format_std_duration(Duration::from_micros(10)), "10µs");
        assert_eq!(format_std_duration(Duration::from_micros(2500)), "2.50ms");
        assert_eq!(format_std_duration(Duration::from_millis(1500)), "1.50s");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_truncate_respects_limit(text in "\\PC{0,200}", max in 1usize..150) {
            let short = truncate(&text, max);
            prop_assert!(short.chars().count() <= max);
            if text.chars().count() <= max {
                prop_assert_eq!(short, text);
            }
        }
    }
}
