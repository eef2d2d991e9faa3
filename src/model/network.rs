use serde::{Deserialize, Serialize};

use crate::model::database::DbPage;

// missing fields decode as empty, so `{}` fails validation rather than decoding
#[derive(Deserialize, Default, Debug)]
#[serde(default)]
pub struct PublishForm {
    pub title: String,
    pub author: String,
    pub content: String,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub facebook: Option<String>,
    pub github: Option<String>,
    pub instagram: Option<String>,
}

#[derive(Deserialize, Default, Debug)]
pub struct UpdateForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub id: String,
    #[serde(flatten)]
    pub page: PublishForm,
}

#[derive(Deserialize, Debug)]
pub struct LookupQuery {
    pub id: String,
    pub name: Option<String>,
}

#[derive(Serialize, Debug, PartialEq, Eq)]
pub struct Credentials<'page> {
    pub id: &'page str,
    pub name: &'page str,
}

#[derive(Serialize, Debug)]
pub struct PublishResponse<'page> {
    pub ok: bool,
    pub msg: &'static str,
    pub id: &'page str,
    pub name: &'page str,
    pub payload: Credentials<'page>,
}

impl<'page> PublishResponse<'page> {
    pub fn saved(page: &'page DbPage) -> Self {
        PublishResponse {
            ok: true,
            msg: "Saved",
            id: &page.id,
            name: &page.name,
            payload: Credentials {
                id: &page.id,
                name: &page.name,
            },
        }
    }
}

#[derive(Serialize, Debug)]
pub struct PageResponse<'page> {
    pub ok: bool,
    pub msg: &'static str,
    pub payload: &'page DbPage,
}

impl<'page> PageResponse<'page> {
    pub fn loaded(page: &'page DbPage) -> Self {
        PageResponse {
            ok: true,
            msg: "Loaded",
            payload: page,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ErrorResponse {
    pub ok: bool,
    pub msg: String,
}

impl ErrorResponse {
    pub fn new(msg: impl Into<String>) -> Self {
        ErrorResponse {
            ok: false,
            msg: msg.into(),
        }
    }
}
