//! In-process page store

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::sync::Mutex;
use uuid::Uuid;

use super::property::{Page, Properties};
use super::store::{Filter, PageStore, Sort};
use super::StoreError;

#[derive(Debug, Clone)]
struct StoredPage {
    database_id: String,
    page: Page,
}

/// Page store held in memory
///
/// Mirrors the remote store closely enough for the sync service: ids are
/// opaque, updates merge properties and bump `last_edited_time`, and queries
/// return at most `page_size` results.
#[derive(Debug)]
pub struct InMemoryPageStore {
    pages: Mutex<Vec<StoredPage>>,
    page_size: usize,
}

impl Default for InMemoryPageStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryPageStore {
    pub fn new() -> Self {
        Self::with_page_size(100)
    }

    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            pages: Mutex::new(Vec::new()),
            page_size,
        }
    }

    /// All pages of one database in creation order
    pub fn pages(&self, database_id: &str) -> Vec<Page> {
        self.lock()
            .iter()
            .filter(|stored| stored.database_id == database_id)
            .map(|stored| stored.page.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<StoredPage>> {
        self.pages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[async_trait]
impl PageStore for InMemoryPageStore {
    async fn create_page(
        &self,
        database_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        let timestamp = now();
        let page = Page {
            id: Uuid::new_v4().to_string(),
            created_time: timestamp.clone(),
            last_edited_time: timestamp,
            properties: properties.clone(),
        };

        self.lock().push(StoredPage {
            database_id: database_id.to_string(),
            page: page.clone(),
        });
        Ok(page)
    }

    async fn query(
        &self,
        database_id: &str,
        filter: Option<&Filter>,
        sorts: &[Sort],
    ) -> Result<Vec<Page>, StoreError> {
        let mut results: Vec<Page> = self
            .lock()
            .iter()
            .filter(|stored| stored.database_id == database_id)
            .filter(|stored| filter.map_or(true, |f| f.matches(&stored.page.properties)))
            .map(|stored| stored.page.clone())
            .collect();

        results.sort_by(|a, b| {
            sorts
                .iter()
                .map(|sort| sort.compare(a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(self.page_size);
        Ok(results)
    }

    async fn update_page(
        &self,
        page_id: &str,
        properties: &Properties,
    ) -> Result<Page, StoreError> {
        let mut pages = self.lock();
        let stored = pages
            .iter_mut()
            .find(|stored| stored.page.id == page_id)
            .ok_or_else(|| StoreError::Status {
                status: 404,
                body: format!("page {page_id} not found"),
            })?;

        for (name, value) in properties {
            stored.page.properties.insert(name.clone(), value.clone());
        }
        stored.page.last_edited_time = now();
        Ok(stored.page.clone())
    }
}
