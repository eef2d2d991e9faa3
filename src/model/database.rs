use pulldown_cmark::{CowStr, Event, Options, Parser, Tag};
use serde::{Deserialize, Serialize};
use time::{macros::format_description, Duration, OffsetDateTime};
use url::Url;

use crate::{
    identity,
    model::{network::PublishForm, ApiError},
    page::{Html, Page, ProfileLink},
};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct DbPage {
    pub id: String,
    pub name: String,
    pub title: String,
    pub author: String,
    pub content: String,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub github: Option<String>,
    pub instagram: Option<String>,
    pub html: String,
    #[serde(with = "time::serde::rfc3339")]
    pub inserted: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated: OffsetDateTime,
}

impl DbPage {
    pub fn create(form: PublishForm, now: OffsetDateTime) -> Result<Self, ApiError> {
        let name = identity::new_name(&form.title).ok_or(ApiError::Validation("Provide a title"))?;

        let mut page = DbPage {
            id: identity::new_id(identity::ID_LEN),
            name,
            title: String::new(),
            author: String::new(),
            content: String::new(),
            website: None,
            twitter: None,
            facebook: None,
            github: None,
            instagram: None,
            html: String::new(),
            inserted: now,
            updated: now,
        };
        page.fill(form);

        Ok(page)
    }

    // id, name and inserted never change
    pub fn apply(&mut self, form: PublishForm, now: OffsetDateTime) -> Result<(), ApiError> {
        if identity::slugify(&form.title).is_empty() {
            return Err(ApiError::Validation("Provide a title"));
        }

        self.fill(form);
        self.updated = now.max(self.updated + Duration::nanoseconds(1));
        Ok(())
    }

    fn fill(&mut self, form: PublishForm) {
        self.title = form.title;
        self.author = form.author;
        self.html = render_markdown(&form.content);
        self.content = form.content;
        self.website = non_empty(form.website);
        self.twitter = non_empty(form.twitter);
        self.facebook = non_empty(form.facebook);
        self.github = non_empty(form.github);
        self.instagram = non_empty(form.instagram);
    }

    pub fn saturate(&self, base_url: &Url) -> Page {
        let date = format_description!("[year]-[month]-[day]");
        let inserted = self.inserted.format(date).unwrap_or_default();
        let updated = self
            .updated
            .format(date)
            .ok()
            .filter(|updated| *updated != inserted);

        let mut links = Vec::new();
        if let Some(website) = self.website.as_deref().and_then(website_url) {
            links.push(ProfileLink::new("Website", website));
        }
        let handles = [
            ("Twitter", "https://twitter.com/", &self.twitter),
            ("Facebook", "https://www.facebook.com/", &self.facebook),
            ("GitHub", "https://github.com/", &self.github),
            ("Instagram", "https://www.instagram.com/", &self.instagram),
        ];
        for (label, site, handle) in handles {
            if let Some(url) = handle.as_deref().and_then(|handle| profile_url(site, handle)) {
                links.push(ProfileLink::new(label, url));
            }
        }

        Page {
            name: self.name.clone(),
            title: self.title.clone(),
            author: self.author.clone(),
            canonical_url: base_url.join(&self.name).ok().map(String::from),
            inserted,
            updated,
            links,
            content: Html(self.html.clone()),
        }
    }
}

/// Raw HTML in the source comes out escaped, and script links point nowhere.
pub fn render_markdown(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES
        | Options::ENABLE_FOOTNOTES
        | Options::ENABLE_STRIKETHROUGH
        | Options::ENABLE_TASKLISTS;

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),

        Event::Start(Tag::Link {
            link_type,
            dest_url,
            title,
            id,
        }) if is_script_url(&dest_url) => Event::Start(Tag::Link {
            link_type,
            dest_url: CowStr::Borrowed("#"),
            title,
            id,
        }),

        Event::Start(Tag::Image {
            link_type,
            dest_url,
            title,
            id,
        }) if is_script_url(&dest_url) => Event::Start(Tag::Image {
            link_type,
            dest_url: CowStr::Borrowed("#"),
            title,
            id,
        }),

        _ => event,
    });

    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}

fn is_script_url(url: &str) -> bool {
    let url = url.trim_start().to_ascii_lowercase();
    url.starts_with("javascript:") || url.starts_with("vbscript:") || url.starts_with("data:")
}

fn non_empty(field: Option<String>) -> Option<String> {
    field
        .map(|field| field.trim().to_string())
        .filter(|field| !field.is_empty())
}

fn website_url(website: &str) -> Option<Url> {
    let url = Url::parse(website)
        .or_else(|_| Url::parse(&format!("https://{}", website)))
        .ok()?;
    matches!(url.scheme(), "http" | "https").then_some(url)
}

fn profile_url(site: &str, handle: &str) -> Option<Url> {
    let handle = handle.trim_start_matches('@');
    if handle.is_empty() {
        return None;
    }

    let mut url = Url::parse(site).ok()?;
    url.path_segments_mut().ok()?.pop_if_empty().push(handle);
    Some(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(title: &str, content: &str) -> PublishForm {
        PublishForm {
            title: title.into(),
            author: "Andrew".into(),
            content: content.into(),
            ..Default::default()
        }
    }

    #[test]
    fn create_mints_identity() {
        let now = OffsetDateTime::now_utc();
        let page = DbPage::create(form("First Post", "My *story*."), now).unwrap();

        assert_eq!(page.id.len(), identity::ID_LEN);
        assert!(page.name.starts_with("first-post-"));
        assert_eq!(page.inserted, now);
        assert_eq!(page.updated, now);
        assert_eq!(page.html, "<p>My <em>story</em>.</p>\n");
    }

    #[test]
    fn create_rejects_blank_title() {
        let err = DbPage::create(form(" \t\n", ""), OffsetDateTime::now_utc()).unwrap_err();
        assert!(matches!(err, ApiError::Validation("Provide a title")));
    }

    #[test]
    fn apply_keeps_identity_and_bumps_updated() {
        let now = OffsetDateTime::now_utc();
        let mut page = DbPage::create(form("First Post", "one"), now).unwrap();
        let before = page.clone();

        page.apply(form("First Post Edited", "two"), now).unwrap();

        assert_eq!(page.id, before.id);
        assert_eq!(page.name, before.name);
        assert_eq!(page.inserted, before.inserted);
        assert!(page.updated > before.updated);
        assert_eq!(page.title, "First Post Edited");
        assert_eq!(page.html, "<p>two</p>\n");
    }

    #[test]
    fn apply_rejects_blank_title_without_touching_page() {
        let mut page = DbPage::create(form("Title", "one"), OffsetDateTime::now_utc()).unwrap();
        let before = page.clone();

        assert!(page.apply(form("  ", "two"), OffsetDateTime::now_utc()).is_err());
        assert_eq!(page, before);
    }

    #[test]
    fn raw_html_is_escaped() {
        let html = render_markdown("hi <script>alert(1)</script>");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn script_links_are_neutered() {
        let html = render_markdown("[click](javascript:alert(1))");
        assert_eq!(html, "<p><a href=\"#\">click</a></p>\n");
    }

    #[test]
    fn saturate_builds_profile_links() {
        let mut page = DbPage::create(form("Title", ""), OffsetDateTime::now_utc()).unwrap();
        page.website = Some("example.com".into());
        page.github = Some("@someone".into());
        page.twitter = Some("some one".into());

        let base = Url::parse("https://publish.example/").unwrap();
        let view = page.saturate(&base);

        let hrefs: Vec<_> = view.links.iter().map(|link| link.href.as_str()).collect();
        assert_eq!(
            hrefs,
            [
                "https://example.com/",
                "https://twitter.com/some%20one",
                "https://github.com/someone",
            ]
        );
        assert_eq!(
            view.canonical_url.as_deref(),
            Some(format!("https://publish.example/{}", page.name).as_str())
        );
        assert_eq!(view.updated, None);
    }
}
