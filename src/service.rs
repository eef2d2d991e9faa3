use time::OffsetDateTime;

use crate::{
    model::{
        database::DbPage,
        network::{PublishForm, UpdateForm},
        ApiError,
    },
    store::PageStore,
};

#[derive(Clone, Debug)]
pub struct PageService {
    store: PageStore,
}

impl PageService {
    pub fn new(store: PageStore) -> Self {
        PageService { store }
    }

    pub async fn create(&self, form: PublishForm) -> Result<DbPage, ApiError> {
        let page = DbPage::create(form, OffsetDateTime::now_utc())?;
        self.store.put(&page).await?;

        tracing::info!(name = %page.name, "created page");
        Ok(page)
    }

    pub async fn update(&self, form: UpdateForm) -> Result<DbPage, ApiError> {
        let mut page = self.read(&form.name, &form.id).await?;
        page.apply(form.page, OffsetDateTime::now_utc())?;
        self.store.put(&page).await?;

        tracing::info!(name = %page.name, "updated page");
        Ok(page)
    }

    pub async fn read(&self, name: &str, id: &str) -> Result<DbPage, ApiError> {
        let Some(page) = self.store.get_by_name(name).await? else {
            tracing::debug!(name = %name, "page not found");
            return Err(ApiError::NotFound);
        };

        if page.id != id {
            tracing::warn!(name = %name, "id does not match page");
            return Err(ApiError::Permission);
        }

        Ok(page)
    }

    pub async fn read_by_id(&self, id: &str) -> Result<DbPage, ApiError> {
        self.store.get_by_id(id).await?.ok_or(ApiError::NotFound)
    }

    pub async fn view(&self, name: &str) -> Result<Option<DbPage>, ApiError> {
        Ok(self.store.get_by_name(name).await?)
    }
}
