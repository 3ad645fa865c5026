//! Port interfaces to external collaborators
//!
//! The workspace API and the pluggable image uploader are reached only
//! through these traits, so orchestration and handlers can be exercised
//! against fakes.

use async_trait::async_trait;
use serde_json::Value;

use crate::block::RemoteBlock;
use crate::error::Result;

/// Request payload for creating a workspace page
#[derive(Debug, Clone, Default)]
pub struct CreatePageRequest {
    /// Parent database id
    pub database_id: String,
    /// Page title
    pub title: String,
    /// Source URL property, when the database schema carries one
    pub source_url: Option<String>,
    /// Optional emoji icon
    pub icon: Option<String>,
    /// Optional external cover URL
    pub cover: Option<String>,
    /// Initial children, already in wire shape
    pub children: Vec<Value>,
}

/// A page the workspace created
#[derive(Debug, Clone)]
pub struct CreatedPage {
    /// Assigned page id
    pub id: String,
    /// Canonical page URL
    pub url: Option<String>,
}

/// One page of a paginated children listing
#[derive(Debug, Clone, Default)]
pub struct BlockPage {
    /// Blocks in listing order
    pub results: Vec<RemoteBlock>,
    /// Cursor for the next page, when more results exist
    pub next_cursor: Option<String>,
    /// Whether another page exists
    pub has_more: bool,
}

/// One page of a database query result
#[derive(Debug, Clone, Default)]
pub struct QueryPage {
    /// Raw result objects
    pub results: Vec<Value>,
    /// Cursor for the next page, when more results exist
    pub next_cursor: Option<String>,
    /// Whether another page exists
    pub has_more: bool,
}

/// Typed operations against the workspace API
///
/// Implementations own auth, pacing, and retries; every failure crossing
/// this boundary is already mapped into the domain error taxonomy.
#[async_trait]
pub trait WorkspaceApi: Send + Sync {
    /// Create a page under a database parent
    async fn create_page(&self, request: CreatePageRequest) -> Result<CreatedPage>;

    /// Append child blocks to a parent block or page
    ///
    /// Returns the created blocks with their assigned ids, in order.
    async fn append_children(&self, parent_id: &str, children: Vec<Value>)
    -> Result<Vec<RemoteBlock>>;

    /// Update a block's payload (used by the marker sweeper)
    async fn update_block(&self, block_id: &str, payload: Value) -> Result<()>;

    /// Delete (archive) a block
    async fn delete_block(&self, block_id: &str) -> Result<()>;

    /// List a parent's children, one cursor page at a time
    async fn list_children(&self, parent_id: &str, cursor: Option<String>) -> Result<BlockPage>;

    /// Retrieve a page object
    async fn retrieve_page(&self, page_id: &str) -> Result<Value>;

    /// Retrieve a database object (schema snapshot)
    async fn retrieve_database(&self, database_id: &str) -> Result<Value>;

    /// Run a database query, one cursor page at a time
    async fn query_database(
        &self,
        database_id: &str,
        filter: Option<Value>,
        sorts: Option<Value>,
        page_size: Option<u32>,
        cursor: Option<String>,
    ) -> Result<QueryPage>;

    /// Patch page properties
    async fn update_page_properties(&self, page_id: &str, properties: Value) -> Result<()>;
}

/// Where an image came from
#[derive(Debug, Clone)]
pub enum ImageSource {
    /// A URL found in the source document
    Url(String),
    /// Decoded bytes of an inline data URI
    Bytes(Vec<u8>),
}

/// Pluggable image re-hosting collaborator
///
/// The builder is synchronous CPU-bound work, so this port is synchronous
/// too; an implementation that re-hosts remotely should resolve ahead of the
/// build or block on its own runtime. A failure degrades the image to a link
/// placeholder with a warning.
pub trait ImageUploader: Send + Sync {
    /// Resolve an image source to an externally reachable URL
    fn upload(&self, source: &ImageSource) -> Result<String>;
}

/// Default uploader: passes URLs through unchanged, rejects raw bytes
#[derive(Debug, Default)]
pub struct PassthroughUploader;

impl ImageUploader for PassthroughUploader {
    fn upload(&self, source: &ImageSource) -> Result<String> {
        match source {
            ImageSource::Url(url) => Ok(url.clone()),
            ImageSource::Bytes(_) => Err(crate::error::Error::invalid_input(
                "no uploader configured for raw image bytes",
            )),
        }
    }
}
