//! Test support: an in-memory workspace
//!
//! [`FakeWorkspace`] implements [`WorkspaceApi`] over process memory with
//! scripted failures, so orchestration and handler flows can be exercised
//! without a network. Shared by this crate's tests and the server crate's
//! integration tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use docpress_domain::{
    Block, BlockPage, CreatePageRequest, CreatedPage, Error, QueryPage, RemoteBlock, Result,
    WorkspaceApi,
};
use serde_json::Value;

/// One stored block: wire payload plus assigned id
#[derive(Debug, Clone)]
pub struct StoredBlock {
    /// Assigned id
    pub id: String,
    /// Wire payload as submitted (or as updated)
    pub wire: Value,
}

#[derive(Debug, Default)]
struct State {
    /// parent id → ordered children
    children: HashMap<String, Vec<StoredBlock>>,
    /// page ids known to exist
    pages: Vec<String>,
    /// scripted error per operation name, consumed once per hit
    failures: HashMap<String, Vec<Error>>,
    /// log of operations in arrival order
    log: Vec<String>,
}

/// In-memory workspace with scripted failures
#[derive(Debug, Default)]
pub struct FakeWorkspace {
    state: Mutex<State>,
    sequence: AtomicUsize,
}

impl FakeWorkspace {
    /// Empty workspace
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-create a page so content operations against it succeed
    pub fn seed_page(&self, page_id: &str) {
        let mut state = self.lock();
        state.pages.push(page_id.to_owned());
        state.children.entry(page_id.to_owned()).or_default();
    }

    /// Seed an existing child under a parent
    pub fn seed_child(&self, parent_id: &str, wire: Value) -> String {
        let id = self.next_id();
        let mut state = self.lock();
        state
            .children
            .entry(parent_id.to_owned())
            .or_default()
            .push(StoredBlock {
                id: id.clone(),
                wire,
            });
        id
    }

    /// Queue an error for the named operation; consumed one per call
    pub fn fail_next(&self, operation: &str, error: Error) {
        self.lock()
            .failures
            .entry(operation.to_owned())
            .or_default()
            .push(error);
    }

    /// Ordered children stored under a parent
    #[must_use]
    pub fn children_of(&self, parent_id: &str) -> Vec<StoredBlock> {
        self.lock()
            .children
            .get(parent_id)
            .cloned()
            .unwrap_or_default()
    }

    /// Parsed blocks stored under a parent, children resolved recursively
    #[must_use]
    pub fn tree_of(&self, parent_id: &str) -> Vec<Block> {
        let stored = self.children_of(parent_id);
        stored
            .iter()
            .filter_map(|entry| {
                let mut block = Block::from_wire(&entry.wire).ok()?;
                let children = self.tree_of(&entry.id);
                if !children.is_empty() {
                    if let Some(slot) = block.children_mut() {
                        *slot = children;
                    }
                }
                Some(block)
            })
            .collect()
    }

    /// Operation log in arrival order
    #[must_use]
    pub fn log(&self) -> Vec<String> {
        self.lock().log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn next_id(&self) -> String {
        format!("blk-{:05}", self.sequence.fetch_add(1, Ordering::SeqCst))
    }

    fn take_failure(&self, operation: &str) -> Option<Error> {
        let mut state = self.lock();
        state.log.push(operation.to_owned());
        state
            .failures
            .get_mut(operation)
            .and_then(|queue| (!queue.is_empty()).then(|| queue.remove(0)))
    }

    fn parent_exists(&self, parent_id: &str) -> bool {
        let state = self.lock();
        state.pages.iter().any(|p| p == parent_id)
            || state.children.contains_key(parent_id)
            || state
                .children
                .values()
                .flatten()
                .any(|b| b.id == parent_id)
    }
}

#[async_trait]
impl WorkspaceApi for FakeWorkspace {
    async fn create_page(&self, request: CreatePageRequest) -> Result<CreatedPage> {
        if let Some(error) = self.take_failure("create_page") {
            return Err(error);
        }
        let id = format!("page-{:05}", self.sequence.fetch_add(1, Ordering::SeqCst));
        {
            let mut state = self.lock();
            state.pages.push(id.clone());
            state.children.entry(id.clone()).or_default();
        }
        for child in request.children {
            self.append_children(&id, vec![child]).await?;
        }
        Ok(CreatedPage {
            url: Some(format!("https://workspace.test/{id}")),
            id,
        })
    }

    async fn append_children(
        &self,
        parent_id: &str,
        children: Vec<Value>,
    ) -> Result<Vec<RemoteBlock>> {
        if let Some(error) = self.take_failure("append_children") {
            return Err(error);
        }
        if !self.parent_exists(parent_id) {
            return Err(Error::not_found(format!("parent {parent_id}")));
        }
        let mut created = Vec::with_capacity(children.len());
        for wire in children {
            let id = self.next_id();
            // Embedded children are stored under the new id so listings see
            // the same nesting the workspace would report.
            let tag = wire
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned();
            let mut stored = wire.clone();
            let embedded = stored
                .get_mut(&tag)
                .and_then(|payload| payload.as_object_mut())
                .and_then(|payload| payload.remove("children"));
            {
                let mut state = self.lock();
                state
                    .children
                    .entry(parent_id.to_owned())
                    .or_default()
                    .push(StoredBlock {
                        id: id.clone(),
                        wire: stored.clone(),
                    });
            }
            if let Some(Value::Array(embedded_children)) = embedded {
                Box::pin(self.append_children(&id, embedded_children)).await?;
            }
            let has_children = !self.children_of(&id).is_empty();
            let mut annotated = stored;
            annotated["id"] = Value::String(id.clone());
            annotated["has_children"] = Value::Bool(has_children);
            created.push(RemoteBlock::from_wire(&annotated)?);
        }
        Ok(created)
    }

    async fn update_block(&self, block_id: &str, payload: Value) -> Result<()> {
        if let Some(error) = self.take_failure("update_block") {
            return Err(error);
        }
        let mut state = self.lock();
        for children in state.children.values_mut() {
            if let Some(stored) = children.iter_mut().find(|b| b.id == block_id) {
                if let (Some(target), Some(source)) =
                    (stored.wire.as_object_mut(), payload.as_object())
                {
                    for (key, value) in source {
                        target.insert(key.clone(), value.clone());
                    }
                }
                return Ok(());
            }
        }
        Err(Error::not_found(format!("block {block_id}")))
    }

    async fn delete_block(&self, block_id: &str) -> Result<()> {
        if let Some(error) = self.take_failure("delete_block") {
            return Err(error);
        }
        let mut state = self.lock();
        for children in state.children.values_mut() {
            if let Some(position) = children.iter().position(|b| b.id == block_id) {
                children.remove(position);
                return Ok(());
            }
        }
        Err(Error::not_found(format!("block {block_id}")))
    }

    async fn list_children(&self, parent_id: &str, cursor: Option<String>) -> Result<BlockPage> {
        if let Some(error) = self.take_failure("list_children") {
            return Err(error);
        }
        if !self.parent_exists(parent_id) {
            return Err(Error::not_found(format!("parent {parent_id}")));
        }
        let offset: usize = cursor.and_then(|c| c.parse().ok()).unwrap_or(0);
        let children = self.children_of(parent_id);
        let page: Vec<RemoteBlock> = children
            .iter()
            .skip(offset)
            .take(100)
            .filter_map(|stored| {
                let mut annotated = stored.wire.clone();
                annotated["id"] = Value::String(stored.id.clone());
                annotated["has_children"] =
                    Value::Bool(!self.children_of(&stored.id).is_empty());
                RemoteBlock::from_wire(&annotated).ok()
            })
            .collect();
        let has_more = offset + 100 < children.len();
        Ok(BlockPage {
            results: page,
            next_cursor: has_more.then(|| (offset + 100).to_string()),
            has_more,
        })
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Value> {
        if let Some(error) = self.take_failure("retrieve_page") {
            return Err(error);
        }
        if !self.parent_exists(page_id) {
            return Err(Error::not_found(format!("page {page_id}")));
        }
        Ok(serde_json::json!({ "object": "page", "id": page_id }))
    }

    async fn retrieve_database(&self, database_id: &str) -> Result<Value> {
        if let Some(error) = self.take_failure("retrieve_database") {
            return Err(error);
        }
        Ok(serde_json::json!({
            "object": "database",
            "id": database_id,
            "properties": {
                "title": { "type": "title" },
                "URL": { "type": "url" },
                "Coverage": { "type": "number" }
            }
        }))
    }

    async fn query_database(
        &self,
        database_id: &str,
        _filter: Option<Value>,
        _sorts: Option<Value>,
        _page_size: Option<u32>,
        _cursor: Option<String>,
    ) -> Result<QueryPage> {
        if let Some(error) = self.take_failure("query_database") {
            return Err(error);
        }
        let _ = database_id;
        Ok(QueryPage::default())
    }

    async fn update_page_properties(&self, page_id: &str, _properties: Value) -> Result<()> {
        if let Some(error) = self.take_failure("update_page_properties") {
            return Err(error);
        }
        if !self.parent_exists(page_id) {
            return Err(Error::not_found(format!("page {page_id}")));
        }
        Ok(())
    }
}
