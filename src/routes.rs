use std::{path::Path, sync::Arc};

use axum::{
    extract::{self, State},
    http::StatusCode,
    response::{self, IntoResponse, Response},
    routing::get,
    Router,
};
use tera::Tera;
use tower_http::services::{ServeDir, ServeFile};
use url::Url;

use crate::{
    compat::{MyJson, MyQuery},
    model::{
        network::{LookupQuery, PageResponse, PublishForm, PublishResponse, UpdateForm},
        ApiError,
    },
    service::PageService,
};

#[derive(Clone)]
pub struct AppState {
    service: PageService,
    templates: Arc<Tera>,
    base_url: Arc<Url>,
}

impl AppState {
    pub fn new(service: PageService, templates: Tera, base_url: Url) -> Self {
        AppState {
            service,
            templates: Arc::new(templates),
            base_url: Arc::new(base_url),
        }
    }
}

// an empty glob still gives Ok, so page.html is checked explicitly
pub fn load_templates(dir: &Path) -> Result<Tera, tera::Error> {
    let templates = Tera::new(&format!("{}/**/*.html", dir.display()))?;
    templates.get_template("page.html")?;
    Ok(templates)
}

pub fn router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route("/api", get(fetch).put(create).post(update))
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/favicon.ico", ServeFile::new(static_dir.join("favicon.ico")))
        .route_service("/robots.txt", ServeFile::new(static_dir.join("robots.txt")))
        .nest_service("/s", ServeDir::new(static_dir.join("s")))
        .route("/:name", get(view))
        .with_state(state)
}

async fn create(
    State(state): State<AppState>,
    MyJson(form): MyJson<PublishForm>,
) -> Result<Response, ApiError> {
    let page = state.service.create(form).await?;
    Ok(MyJson(PublishResponse::saved(&page)).into_response())
}

async fn update(
    State(state): State<AppState>,
    MyJson(form): MyJson<UpdateForm>,
) -> Result<Response, ApiError> {
    let page = state.service.update(form).await?;
    Ok(MyJson(PublishResponse::saved(&page)).into_response())
}

async fn fetch(
    State(state): State<AppState>,
    MyQuery(query): MyQuery<LookupQuery>,
) -> Result<Response, ApiError> {
    let page = match query.name {
        Some(name) => state.service.read(&name, &query.id).await?,
        None => state.service.read_by_id(&query.id).await?,
    };
    Ok(MyJson(PageResponse::loaded(&page)).into_response())
}

async fn view(
    State(state): State<AppState>,
    extract::Path(name): extract::Path<String>,
) -> Result<Response, ApiError> {
    let Some(page) = state.service.view(&name).await? else {
        tracing::info!(name = %name, "no such page");
        return Ok((StatusCode::NOT_FOUND, "404 page not found").into_response());
    };

    let context = tera::Context::from_serialize(page.saturate(&state.base_url))?;
    let html = state.templates.render("page.html", &context)?;
    Ok(response::Html(html).into_response())
}
