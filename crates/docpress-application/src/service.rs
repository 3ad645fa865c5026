//! Page-level services
//!
//! The flows behind the HTTP surface: create, replace-content, append,
//! validate, and compare. Each mutating flow binds one [`UploadJob`] in the
//! shared registry, drives the orchestrator, and assembles the response
//! payload the coordinator serializes.

use std::sync::Arc;

use docpress_convert::{BuildOptions, BuildOutcome, convert};
use docpress_domain::constants::DEFAULT_MAX_SOURCE_BYTES;
use docpress_domain::report::ValidationReport;
use docpress_domain::{
    Block, CreatePageRequest, Error, ImageUploader, JobPhase, PassthroughUploader, Result,
    SourceDocument, UploadJob, WorkspaceApi, deadline_for, marker, normalize_page_id,
};
use futures::future::BoxFuture;
use serde_json::{Value, json};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::orchestrator::{Orchestrator, OrchestratorConfig};
use crate::registry::JobRegistry;
use docpress_validate::Validator;

/// Service configuration
#[derive(Clone)]
pub struct ServiceConfig {
    /// Maximum accepted source size in bytes
    pub max_source_bytes: usize,
    /// Orchestrator settings
    pub orchestrator: OrchestratorConfig,
    /// Image re-hosting collaborator for the builder
    pub uploader: Arc<dyn ImageUploader>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            max_source_bytes: DEFAULT_MAX_SOURCE_BYTES,
            orchestrator: OrchestratorConfig::default(),
            uploader: Arc::new(PassthroughUploader),
        }
    }
}

impl std::fmt::Debug for ServiceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceConfig")
            .field("max_source_bytes", &self.max_source_bytes)
            .field("orchestrator", &self.orchestrator)
            .finish_non_exhaustive()
    }
}

/// Parameters for creating a page
#[derive(Debug, Clone, Default)]
pub struct CreatePageParams {
    /// Page title; falls back to source metadata, then "Untitled"
    pub title: Option<String>,
    /// Parent database id
    pub database_id: String,
    /// Captured HTML
    pub content_html: String,
    /// Source URL
    pub url: Option<String>,
    /// Emoji icon
    pub icon: Option<String>,
    /// External cover URL
    pub cover: Option<String>,
    /// Build and validate locally without touching the workspace
    pub dry_run: bool,
}

/// Parameters for replacing a page's content
#[derive(Debug, Clone, Default)]
pub struct ReplaceContentParams {
    /// New title, when the caller wants it updated
    pub title: Option<String>,
    /// Captured HTML
    pub content_html: String,
    /// Source URL
    pub url: Option<String>,
    /// Build and validate locally without touching the workspace
    pub dry_run: bool,
}

/// Outcome of a page operation
#[derive(Debug)]
pub struct PageOperationResult {
    /// Request id usable with the jobs endpoints
    pub request_id: String,
    /// Target page id (absent for dry runs of new pages)
    pub page_id: Option<String>,
    /// Canonical page URL when the workspace reported one
    pub page_url: Option<String>,
    /// Fidelity report
    pub report: ValidationReport,
    /// Non-fatal findings from build, upload, and sweep
    pub warnings: Vec<String>,
    /// Blocks appended across the whole job
    pub appended: usize,
    /// Wire-shaped tree, returned for dry runs
    pub blocks: Option<Vec<Value>>,
}

/// Per-page summary from the validate endpoint
#[derive(Debug, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageValidationSummary {
    /// Page id
    pub page_id: String,
    /// Remote block count
    pub blocks: usize,
    /// Markers still visible in remote content
    pub residual_markers: usize,
    /// Whether the summary properties were written back
    pub updated: bool,
    /// Failure detail when the page could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Application-level entry point shared by every handler
pub struct PageService {
    api: Arc<dyn WorkspaceApi>,
    registry: Arc<JobRegistry>,
    validator: Validator,
    config: ServiceConfig,
}

impl PageService {
    /// Wire the service over the shared client, registry, and validator
    #[must_use]
    pub fn new(
        api: Arc<dyn WorkspaceApi>,
        registry: Arc<JobRegistry>,
        validator: Validator,
        config: ServiceConfig,
    ) -> Self {
        Self {
            api,
            registry,
            validator,
            config,
        }
    }

    /// The shared job registry
    #[must_use]
    pub fn registry(&self) -> &Arc<JobRegistry> {
        &self.registry
    }

    /// Create a new page from captured HTML
    ///
    /// # Errors
    ///
    /// Propagates invalid input, workspace failures, cancellation, and
    /// deadline expiry. Validation findings are not errors; they ride in the
    /// report.
    #[instrument(skip(self, params), fields(database_id = %params.database_id))]
    pub async fn create_page(&self, params: CreatePageParams) -> Result<PageOperationResult> {
        if params.database_id.trim().is_empty() {
            return Err(Error::invalid_input("databaseId is required"));
        }
        let document =
            SourceDocument::parse(params.content_html.clone(), self.config.max_source_bytes)?;
        let title = params
            .title
            .clone()
            .or_else(|| document.title.clone())
            .unwrap_or_else(|| "Untitled".to_owned());
        let outcome = self.build(&document, params.dry_run)?;

        if params.dry_run {
            return Ok(self.dry_run_result(&document, outcome));
        }

        let request_id = Uuid::new_v4().to_string();
        let job = Arc::new(UploadJob::new(
            request_id.clone(),
            None,
            deadline_for(outcome.stats.blocks, outcome.stats.counts.tables),
        ));
        self.registry.insert(Arc::clone(&job));

        let result = self
            .create_and_upload(&job, &title, &params, &document, outcome)
            .await;
        self.seal(&job, &result);
        result.map(|mut ok| {
            ok.request_id = request_id;
            ok
        })
    }

    async fn create_and_upload(
        &self,
        job: &UploadJob,
        title: &str,
        params: &CreatePageParams,
        document: &SourceDocument,
        outcome: BuildOutcome,
    ) -> Result<PageOperationResult> {
        job.report(JobPhase::Validating, 1, 1);
        let created = self
            .api
            .create_page(CreatePageRequest {
                database_id: params.database_id.clone(),
                title: title.to_owned(),
                source_url: params.url.clone().or_else(|| document.source_url.clone()),
                icon: params.icon.clone(),
                cover: params.cover.clone(),
                children: Vec::new(),
            })
            .await?;
        info!(page_id = %created.id, "page created");

        self.upload_and_validate(job, &created.id, document, outcome, false)
            .await
            .map(|mut result| {
                result.page_id = Some(created.id.clone());
                result.page_url = created.url.clone();
                result
            })
    }

    /// Replace an existing page's content
    ///
    /// # Errors
    ///
    /// `not_found` when the page is gone from the workspace; otherwise as
    /// [`Self::create_page`].
    #[instrument(skip(self, params), fields(page_id = %page_id))]
    pub async fn replace_content(
        &self,
        page_id: &str,
        params: ReplaceContentParams,
    ) -> Result<PageOperationResult> {
        let page_id = normalize_page_id(page_id);
        let document =
            SourceDocument::parse(params.content_html.clone(), self.config.max_source_bytes)?;
        let outcome = self.build(&document, params.dry_run)?;

        if params.dry_run {
            let mut result = self.dry_run_result(&document, outcome);
            result.page_id = Some(page_id);
            return Ok(result);
        }

        let request_id = Uuid::new_v4().to_string();
        let job = Arc::new(UploadJob::new(
            request_id.clone(),
            Some(page_id.clone()),
            deadline_for(outcome.stats.blocks, outcome.stats.counts.tables),
        ));
        self.registry.insert(Arc::clone(&job));

        let result = async {
            if let Some(title) = &params.title {
                // Title refresh rides ahead of the content swap.
                self.api
                    .update_page_properties(
                        &page_id,
                        json!({
                            "title": {
                                "title": [{ "type": "text", "text": { "content": title } }]
                            }
                        }),
                    )
                    .await?;
            }
            self.upload_and_validate(&job, &page_id, &document, outcome, true)
                .await
                .map(|mut ok| {
                    ok.page_id = Some(page_id.clone());
                    ok
                })
        }
        .await;
        self.seal(&job, &result);
        result.map(|mut ok| {
            ok.request_id = request_id;
            ok
        })
    }

    /// Append a pre-built block list to a page
    ///
    /// # Errors
    ///
    /// `invalid_input` when any block fails wire validation; workspace
    /// errors otherwise.
    pub async fn append_blocks(
        &self,
        page_id: &str,
        children: Vec<Value>,
    ) -> Result<(String, usize, Vec<String>)> {
        let page_id = normalize_page_id(page_id);
        // Validate the sum at the wire boundary before any call goes out.
        for (index, child) in children.iter().enumerate() {
            Block::from_wire(child)
                .map_err(|e| Error::invalid_input(format!("children[{index}]: {e}")))?;
        }
        let request_id = Uuid::new_v4().to_string();
        let job = Arc::new(UploadJob::new(
            request_id.clone(),
            Some(page_id.clone()),
            deadline_for(children.len(), 0),
        ));
        self.registry.insert(Arc::clone(&job));

        let result = async {
            let mut assigned = Vec::new();
            let total = children.len();
            job.report(JobPhase::Uploading, 0, total);
            for batch in children.chunks(docpress_domain::constants::MAX_CHILDREN_PER_APPEND) {
                if job.is_cancelled() {
                    return Err(Error::cancelled("append cancelled"));
                }
                if job.is_expired() {
                    return Err(Error::timeout("append exceeded its deadline"));
                }
                let created = self.api.append_children(&page_id, batch.to_vec()).await?;
                assigned.extend(created.into_iter().map(|b| b.id));
                job.report(JobPhase::Uploading, assigned.len(), total);
            }
            Ok(assigned)
        }
        .await;
        match &result {
            Ok(_) => job.report(JobPhase::Done, 1, 1),
            Err(_) => job.report(JobPhase::Failed, 0, 1),
        }
        result.map(|assigned| {
            let count = assigned.len();
            (request_id, count, assigned)
        })
    }

    /// Refresh validation summaries for existing pages
    pub async fn validate_pages(&self, page_ids: &[String]) -> Vec<PageValidationSummary> {
        let mut summaries = Vec::with_capacity(page_ids.len());
        for raw_id in page_ids {
            let page_id = normalize_page_id(raw_id);
            summaries.push(self.validate_one(&page_id).await);
        }
        summaries
    }

    async fn validate_one(&self, page_id: &str) -> PageValidationSummary {
        match self.fetch_remote_tree(page_id).await {
            Ok(blocks) => {
                let block_count: usize = blocks.iter().map(Block::subtree_size).sum();
                let residual = count_residual_markers(&blocks);
                let properties = json!({
                    "Blocks": { "number": block_count },
                    "Residual Markers": { "number": residual },
                    "Checked": { "date": { "start": chrono::Utc::now().to_rfc3339() } },
                });
                let updated = match self.api.update_page_properties(page_id, properties).await {
                    Ok(()) => true,
                    Err(error) => {
                        warn!(page_id, %error, "summary property write failed");
                        false
                    }
                };
                PageValidationSummary {
                    page_id: page_id.to_owned(),
                    blocks: block_count,
                    residual_markers: residual,
                    updated,
                    error: None,
                }
            }
            Err(error) => PageValidationSummary {
                page_id: page_id.to_owned(),
                blocks: 0,
                residual_markers: 0,
                updated: false,
                error: Some(error.to_string()),
            },
        }
    }

    /// Text-coverage report for a page against caller-supplied source text
    ///
    /// # Errors
    ///
    /// `not_found` when the page is gone; workspace errors otherwise.
    pub async fn compare_page(
        &self,
        page_id: &str,
        source_text: &str,
        min_missing_span_tokens: Option<usize>,
    ) -> Result<ValidationReport> {
        let page_id = normalize_page_id(page_id);
        let blocks = self.fetch_remote_tree(&page_id).await?;
        let mut report = self.validator.compare_text(source_text, &blocks);
        if let Some(min_tokens) = min_missing_span_tokens {
            report
                .missing_spans
                .retain(|span| span.text.split_whitespace().count() >= min_tokens);
        }
        Ok(report)
    }

    /// Compare and write the results into the page's properties
    ///
    /// # Errors
    ///
    /// As [`Self::compare_page`]; the property write itself is best-effort.
    pub async fn compare_and_record(
        &self,
        page_id: &str,
        source_text: &str,
    ) -> Result<(ValidationReport, bool)> {
        let page_id = normalize_page_id(page_id);
        let report = self.compare_page(&page_id, source_text, None).await?;
        let properties = json!({
            "Coverage": { "number": (report.coverage * 10_000.0).round() / 10_000.0 },
            "Checked": { "date": { "start": chrono::Utc::now().to_rfc3339() } },
        });
        let updated = match self.api.update_page_properties(&page_id, properties).await {
            Ok(()) => true,
            Err(error) => {
                warn!(page_id, %error, "coverage property write failed");
                false
            }
        };
        Ok((report, updated))
    }

    /// Database schema snapshot
    ///
    /// # Errors
    ///
    /// Workspace errors, including `not_found`.
    pub async fn database_schema(&self, database_id: &str) -> Result<Value> {
        let database = self.api.retrieve_database(database_id).await?;
        Ok(database.get("properties").cloned().unwrap_or(database))
    }

    /// Proxy a database query
    ///
    /// # Errors
    ///
    /// Workspace errors, including `not_found`.
    pub async fn query_database(
        &self,
        database_id: &str,
        filter: Option<Value>,
        sorts: Option<Value>,
        page_size: Option<u32>,
    ) -> Result<Vec<Value>> {
        let mut results = Vec::new();
        let mut cursor = None;
        loop {
            let page = self
                .api
                .query_database(database_id, filter.clone(), sorts.clone(), page_size, cursor)
                .await?;
            results.extend(page.results);
            if !page.has_more || page.next_cursor.is_none() {
                return Ok(results);
            }
            if page_size.is_some() {
                // The caller asked for one page; do not walk the cursor.
                return Ok(results);
            }
            cursor = page.next_cursor;
        }
    }

    /// Build the block tree for a document
    fn build(&self, document: &SourceDocument, dry_run: bool) -> Result<BuildOutcome> {
        let options = BuildOptions {
            insert_markers: !dry_run,
            uploader: Arc::clone(&self.config.uploader),
        };
        convert(&document.html, &options)
    }

    fn dry_run_result(
        &self,
        document: &SourceDocument,
        outcome: BuildOutcome,
    ) -> PageOperationResult {
        let report =
            self.validator
                .validate_blocks(&document.html, &outcome.blocks, &outcome.warnings);
        PageOperationResult {
            request_id: Uuid::new_v4().to_string(),
            page_id: None,
            page_url: None,
            warnings: outcome.warnings.clone(),
            appended: 0,
            blocks: Some(outcome.blocks.iter().map(Block::to_wire).collect()),
            report,
        }
    }

    /// Shared upload + post-upload validation + finalization path
    async fn upload_and_validate(
        &self,
        job: &UploadJob,
        page_id: &str,
        document: &SourceDocument,
        outcome: BuildOutcome,
        purge: bool,
    ) -> Result<PageOperationResult> {
        let orchestrator = Orchestrator::new(Arc::clone(&self.api), self.config.orchestrator.clone());
        let uploaded = orchestrator
            .run(job, page_id, &outcome.blocks, purge)
            .await?;

        let mut warnings = outcome.warnings;
        warnings.extend(uploaded.warnings.iter().cloned());
        let report =
            self.validator
                .validate_remote(&document.html, &uploaded.remote_blocks, &warnings);

        let mut final_warnings = warnings;
        let properties = json!({
            "Coverage": { "number": (report.coverage * 10_000.0).round() / 10_000.0 },
            "Checked": { "date": { "start": chrono::Utc::now().to_rfc3339() } },
        });
        orchestrator
            .finalize_properties(job, page_id, properties, &mut final_warnings)
            .await;

        Ok(PageOperationResult {
            request_id: job.request_id.clone(),
            page_id: None,
            page_url: None,
            report,
            warnings: final_warnings,
            appended: uploaded.appended,
            blocks: None,
        })
    }

    /// Read the remote tree without mutating it
    fn fetch_remote_tree<'a>(&'a self, parent_id: &'a str) -> BoxFuture<'a, Result<Vec<Block>>> {
        self.fetch_level(parent_id, self.config.orchestrator.sweep_depth)
    }

    fn fetch_level<'a>(
        &'a self,
        parent_id: &'a str,
        depth: usize,
    ) -> BoxFuture<'a, Result<Vec<Block>>> {
        Box::pin(async move {
            let mut blocks = Vec::new();
            let mut cursor = None;
            loop {
                let page = self.api.list_children(parent_id, cursor).await?;
                for remote in page.results {
                    let mut block = remote.block;
                    if remote.has_children && depth > 0 && block.kind().supports_children() {
                        let children = self.fetch_level(&remote.id, depth - 1).await?;
                        if let Some(slot) = block.children_mut() {
                            *slot = children;
                        }
                    }
                    blocks.push(block);
                }
                if !page.has_more {
                    return Ok(blocks);
                }
                cursor = page.next_cursor;
                if cursor.is_none() {
                    return Ok(blocks);
                }
            }
        })
    }

    /// Flip the job to its terminal phase matching the result
    fn seal(&self, job: &UploadJob, result: &Result<PageOperationResult>) {
        match result {
            Ok(_) => job.report(JobPhase::Done, 1, 1),
            Err(_) => job.report(JobPhase::Failed, 0, 1),
        }
    }
}

impl std::fmt::Debug for PageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Count markers visible anywhere in a block tree
fn count_residual_markers(blocks: &[Block]) -> usize {
    let mut total = 0usize;
    for block in blocks {
        total += marker::count(&block.own_text());
        if let Some(children) = block.children() {
            total += count_residual_markers(children);
        }
    }
    total
}
