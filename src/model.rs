pub mod database;
pub mod network;

use crate::store::StoreError;

// the first four reach the client as `{"ok": false}`, the rest are a 500
#[derive(thiserror::Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    Validation(&'static str),

    #[error("Permission denied.")]
    Permission,

    #[error("This page name does not exist.")]
    NotFound,

    #[error("Invalid JSON")]
    InvalidJson(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    #[error(transparent)]
    Template(#[from] tera::Error),
}
