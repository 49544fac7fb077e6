use std::marker::PhantomData;
use std::sync::Arc;

use biblio_types::{ApiEnvelope, Page, SearchFilter};

use super::Resource;
use crate::api::{ApiClient, ApiResult, EnvelopeExt};

/// Thin REST wrapper for one resource.
pub struct CatalogService<R> {
    api: Arc<ApiClient>,
    _resource: PhantomData<fn() -> R>,
}

impl<R> Clone for CatalogService<R> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
            _resource: PhantomData,
        }
    }
}

impl<R: Resource> CatalogService<R> {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            _resource: PhantomData,
        }
    }

    fn item_path(id: i64) -> String {
        format!("{}/{id}", R::BASE_PATH)
    }

    /// `POST <base>/pesquisar`
    ///
    /// # Errors
    /// Returns the transport, HTTP or envelope failure of the call.
    pub async fn search(
        &self,
        filter: &SearchFilter<R::Filters>,
    ) -> ApiResult<Page<R::Record>> {
        let path = format!("{}/pesquisar", R::BASE_PATH);
        let envelope: ApiEnvelope<Page<R::Record>> = self.api.post(&path, filter).await?;
        envelope.into_data(&format!("Failed to search {}s", R::NAME))
    }

    /// `GET <base>/<id>`
    ///
    /// # Errors
    /// Same as [`search`](Self::search).
    pub async fn get(&self, id: i64) -> ApiResult<R::Record> {
        let envelope: ApiEnvelope<R::Record> = self.api.get(&Self::item_path(id)).await?;
        envelope.into_data(&format!("Failed to load {} {id}", R::NAME))
    }

    /// `POST <base>`
    ///
    /// # Errors
    /// Same as [`search`](Self::search).
    pub async fn create(&self, request: &R::Request) -> ApiResult<R::Record> {
        let envelope: ApiEnvelope<R::Record> = self.api.post(R::BASE_PATH, request).await?;
        envelope.into_data(&format!("Failed to create {}", R::NAME))
    }

    /// `PUT <base>/<id>`
    ///
    /// # Errors
    /// Same as [`search`](Self::search).
    pub async fn update(&self, id: i64, request: &R::Request) -> ApiResult<R::Record> {
        let envelope: ApiEnvelope<R::Record> =
            self.api.put(&Self::item_path(id), request).await?;
        envelope.into_data(&format!("Failed to update {} {id}", R::NAME))
    }

    /// `DELETE <base>/<id>`
    ///
    /// # Errors
    /// Same as [`search`](Self::search).
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.api.delete(&Self::item_path(id)).await
    }

    /// Every record on one unfiltered page, for pickers.
    ///
    /// # Errors
    /// Same as [`search`](Self::search).
    pub async fn list_all(&self) -> ApiResult<Vec<R::Record>> {
        let filter = SearchFilter::<R::Filters>::list_all(R::DEFAULT_ORDER);
        Ok(self.search(&filter).await?.content)
    }
}
