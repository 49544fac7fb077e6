use std::sync::{Mutex, PoisonError};

use biblio_types::{Page, SearchFilter};

use super::{CatalogService, Resource};
use crate::api::ApiResult;

/// Paging counters from the last search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub current_page: u32,
    pub total_records: u64,
    /// Page size the server actually used.
    pub loaded: u32,
    pub total_pages: u32,
    pub last: bool,
}

impl Pagination {
    pub fn from_page<T>(page: &Page<T>) -> Self {
        Self {
            current_page: page.number,
            total_records: page.total_elements,
            loaded: page.size,
            total_pages: page.total_pages,
            last: page.is_last(),
        }
    }
}

struct State<R: Resource> {
    records: Vec<R::Record>,
    selected: Option<R::Record>,
    is_loading: bool,
    error: Option<String>,
    filter: SearchFilter<R::Filters>,
    pagination: Pagination,
}

impl<R: Resource> Default for State<R> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            selected: None,
            is_loading: false,
            error: None,
            filter: SearchFilter::new(R::DEFAULT_ORDER),
            pagination: Pagination::default(),
        }
    }
}

/// Screen state for one resource: current page of records, selection,
/// active filter and request status.
///
/// Mutating operations record failures in [`error`](Self::error) and still
/// return them, so callers can both display and react.
pub struct CatalogStore<R: Resource> {
    service: CatalogService<R>,
    state: Mutex<State<R>>,
}

impl<R: Resource> CatalogStore<R> {
    pub fn new(service: CatalogService<R>) -> Self {
        Self {
            service,
            state: Mutex::new(State::default()),
        }
    }

    fn read<T>(&self, f: impl FnOnce(&State<R>) -> T) -> T {
        f(&self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn write<T>(&self, f: impl FnOnce(&mut State<R>) -> T) -> T {
        f(&mut self.state.lock().unwrap_or_else(PoisonError::into_inner))
    }

    fn fail<T>(&self, result: ApiResult<T>) -> ApiResult<T> {
        if let Err(e) = &result {
            tracing::debug!(resource = R::NAME, error = %e, "catalog operation failed");
            self.write(|s| s.error = Some(e.message.clone()));
        }
        result
    }

    pub fn records(&self) -> Vec<R::Record> {
        self.read(|s| s.records.clone())
    }

    pub fn selected(&self) -> Option<R::Record> {
        self.read(|s| s.selected.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.read(|s| s.is_loading)
    }

    pub fn error(&self) -> Option<String> {
        self.read(|s| s.error.clone())
    }

    pub fn filter(&self) -> SearchFilter<R::Filters> {
        self.read(|s| s.filter.clone())
    }

    pub fn pagination(&self) -> Pagination {
        self.read(|s| s.pagination)
    }

    pub fn can_create(&self) -> bool {
        self.read(|s| !s.is_loading)
    }

    pub fn can_edit(&self) -> bool {
        self.read(|s| !s.is_loading && s.selected.is_some())
    }

    pub fn can_delete(&self) -> bool {
        self.can_edit()
    }

    /// Applies `update` to the active filter and loads the matching page.
    ///
    /// Overlapping searches are not fenced; the last one to resolve wins.
    ///
    /// # Errors
    /// Returns the service failure, which is also kept in [`error`](Self::error).
    pub async fn search(
        &self,
        update: impl FnOnce(&mut SearchFilter<R::Filters>),
    ) -> ApiResult<()> {
        let filter = self.write(|s| {
            s.is_loading = true;
            s.error = None;
            update(&mut s.filter);
            s.filter.clone()
        });

        let result = self.service.search(&filter).await;
        self.write(|s| s.is_loading = false);

        let page = self.fail(result)?;
        tracing::debug!(
            resource = R::NAME,
            page = page.number,
            total = page.total_elements,
            "search completed"
        );
        self.write(|s| {
            s.pagination = Pagination::from_page(&page);
            s.records = page.content;
        });
        Ok(())
    }

    /// Loads one record and selects it.
    ///
    /// # Errors
    /// As [`search`](Self::search).
    pub async fn get(&self, id: i64) -> ApiResult<R::Record> {
        let record = self.fail(self.service.get(id).await)?;
        self.write(|s| s.selected = Some(record.clone()));
        Ok(record)
    }

    /// Creates a record; it is shown at the top of the list when the first
    /// page is displayed.
    ///
    /// # Errors
    /// As [`search`](Self::search).
    pub async fn create(&self, request: &R::Request) -> ApiResult<R::Record> {
        let record = self.fail(self.service.create(request).await)?;
        self.write(|s| {
            if s.pagination.current_page == 0 {
                s.records.insert(0, record.clone());
            }
        });
        tracing::info!(resource = R::NAME, id = R::id(&record), "created");
        Ok(record)
    }

    /// Replaces the record in the list and the selection.
    ///
    /// # Errors
    /// As [`search`](Self::search).
    pub async fn update(&self, id: i64, request: &R::Request) -> ApiResult<R::Record> {
        let record = self.fail(self.service.update(id, request).await)?;
        self.write(|s| {
            if let Some(slot) = s.records.iter_mut().find(|r| R::id(r) == id) {
                *slot = record.clone();
            }
            if s.selected.as_ref().is_some_and(|r| R::id(r) == id) {
                s.selected = Some(record.clone());
            }
        });
        tracing::info!(resource = R::NAME, id, "updated");
        Ok(record)
    }

    /// Removes the record from the list and clears it if selected.
    ///
    /// # Errors
    /// As [`search`](Self::search).
    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        self.fail(self.service.delete(id).await)?;
        self.write(|s| {
            s.records.retain(|r| R::id(r) != id);
            if s.selected.as_ref().is_some_and(|r| R::id(r) == id) {
                s.selected = None;
            }
        });
        tracing::info!(resource = R::NAME, id, "deleted");
        Ok(())
    }

    pub fn select(&self, record: R::Record) {
        self.write(|s| s.selected = Some(record));
    }

    pub fn clear_selection(&self) {
        self.write(|s| s.selected = None);
    }

    pub fn clear_error(&self) {
        self.write(|s| s.error = None);
    }

    /// Back to an empty first page with default filters.
    pub fn reset(&self) {
        self.write(|s| *s = State::default());
    }
}
