use serde::Serialize;
use url::Url;

#[derive(Serialize, Clone, Debug)]
#[serde(transparent)]
pub struct Html(pub String);

// no id in here
#[derive(Serialize, Clone, Debug)]
pub struct Page {
    pub name: String,
    pub title: String,
    pub author: String,
    pub canonical_url: Option<String>,
    pub inserted: String,
    pub updated: Option<String>,
    pub links: Vec<ProfileLink>,
    pub content: Html,
}

#[derive(Serialize, Clone, Debug)]
pub struct ProfileLink {
    pub label: &'static str,
    pub href: String,
}

impl ProfileLink {
    pub fn new(label: &'static str, href: Url) -> Self {
        ProfileLink {
            label,
            href: href.into(),
        }
    }
}
