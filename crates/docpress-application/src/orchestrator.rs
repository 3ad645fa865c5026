//! Upload orchestration
//!
//! Drives one page's content replacement through the phase machine:
//! `Purging → Chunking → Uploading → Sweeping`, leaving finalization and the
//! terminal transition to the page service. Every workspace call, purge
//! batch, and sweep cursor is a suspension point that observes the job's
//! cancellation flag and deadline.

use std::sync::Arc;

use docpress_domain::constants::{
    JOB_IO_PERMITS, MAX_CHILDREN_PER_APPEND, PURGE_BATCH_SIZE, PURGE_MAX_ROUNDS,
    SWEEP_MAX_RETRIES, SWEEP_RETRY_DELAY_MS,
};
use docpress_domain::{Block, Error, JobPhase, Result, RichText, UploadJob, WorkspaceApi, marker};
use futures::future::BoxFuture;
use serde_json::{Value, json};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::chunk::{ChunkLimits, UploadNode, UploadPlan, plan};

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Residual markers fail the job instead of warning
    pub strict_marker_sweep: bool,
    /// Chunk-planner limits
    pub limits: ChunkLimits,
    /// List/delete rounds before purge gives up
    pub purge_rounds: usize,
    /// Remote tree depth bound during sweep traversal
    pub sweep_depth: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            strict_marker_sweep: false,
            limits: ChunkLimits::default(),
            purge_rounds: PURGE_MAX_ROUNDS,
            sweep_depth: 10,
        }
    }
}

/// What one orchestrated upload produced
#[derive(Debug, Default)]
pub struct UploadOutcome {
    /// Blocks appended across every call
    pub appended: usize,
    /// Non-fatal findings
    pub warnings: Vec<String>,
    /// Remote tree as it stands after the sweep, in document order
    pub remote_blocks: Vec<Block>,
}

/// Stateful coordinator for one page's uploads
pub struct Orchestrator {
    api: Arc<dyn WorkspaceApi>,
    config: OrchestratorConfig,
    io_permits: Arc<Semaphore>,
}

impl Orchestrator {
    /// Create an orchestrator over the shared workspace client
    #[must_use]
    pub fn new(api: Arc<dyn WorkspaceApi>, config: OrchestratorConfig) -> Self {
        Self {
            api,
            config,
            io_permits: Arc::new(Semaphore::new(JOB_IO_PERMITS)),
        }
    }

    /// Replace (or fill) a page's content with the given block tree
    ///
    /// With `purge` set, existing children are deleted first. Returns after
    /// the sweep; property finalization is the caller's step.
    ///
    /// # Errors
    ///
    /// Propagates cancellation, deadline expiry, purge exhaustion, and any
    /// non-retryable workspace failure.
    pub async fn run(
        &self,
        job: &UploadJob,
        page_id: &str,
        blocks: &[Block],
        purge: bool,
    ) -> Result<UploadOutcome> {
        let mut outcome = UploadOutcome::default();
        if purge {
            self.purge(job, page_id).await?;
        }

        checkpoint(job)?;
        job.report(JobPhase::Chunking, 0, 1);
        let upload_plan = plan(blocks, &self.config.limits);
        let total_calls = upload_plan.append_calls();
        debug!(
            chunks = upload_plan.chunks.len(),
            calls = total_calls,
            blocks = upload_plan.block_count(),
            "upload plan ready"
        );
        job.report(JobPhase::Chunking, 1, 1);

        let mut completed_calls = 0usize;
        job.report(JobPhase::Uploading, 0, total_calls);
        self.upload(job, page_id, &upload_plan, total_calls, &mut completed_calls, &mut outcome)
            .await?;
        info!(appended = outcome.appended, page_id, "upload complete");

        let (remote_blocks, sweep_warnings, residual) = self.sweep(job, page_id).await?;
        outcome.remote_blocks = remote_blocks;
        outcome.warnings.extend(sweep_warnings);
        if residual > 0 {
            if self.config.strict_marker_sweep {
                return Err(Error::workspace(format!(
                    "{residual} markers survived the sweep in strict mode"
                )));
            }
            outcome
                .warnings
                .push(format!("{residual} markers survived the sweep"));
        }
        Ok(outcome)
    }

    /// Delete every existing child of the target page
    async fn purge(&self, job: &UploadJob, page_id: &str) -> Result<()> {
        for round in 0..self.config.purge_rounds.max(1) {
            checkpoint(job)?;
            let ids = self.list_all_child_ids(job, page_id).await?;
            if ids.is_empty() {
                debug!(page_id, round, "purge complete");
                return Ok(());
            }
            job.report(JobPhase::Purging, 0, ids.len());
            let mut deleted = 0usize;
            for batch in ids.chunks(PURGE_BATCH_SIZE) {
                checkpoint(job)?;
                let deletions = batch.iter().map(|id| {
                    let api = Arc::clone(&self.api);
                    let permits = Arc::clone(&self.io_permits);
                    let id = id.clone();
                    async move {
                        let _permit = permits.acquire().await.map_err(|_| {
                            Error::internal("io semaphore closed")
                        })?;
                        match api.delete_block(&id).await {
                            // Already gone is success for a purge.
                            Err(Error::NotFound { .. }) | Ok(()) => Ok(()),
                            Err(error) => Err(error),
                        }
                    }
                });
                let results = futures::future::join_all(deletions).await;
                for result in results {
                    result?;
                }
                deleted += batch.len();
                job.report(JobPhase::Purging, deleted, ids.len());
            }
        }
        checkpoint(job)?;
        let remaining = self.list_all_child_ids(job, page_id).await?.len();
        if remaining == 0 {
            return Ok(());
        }
        Err(Error::PurgeIncomplete {
            remaining,
            attempts: self.config.purge_rounds,
        })
    }

    async fn list_all_child_ids(&self, job: &UploadJob, parent: &str) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut cursor = None;
        loop {
            checkpoint(job)?;
            let page = self.api.list_children(parent, cursor).await?;
            ids.extend(page.results.into_iter().map(|b| b.id));
            if !page.has_more {
                return Ok(ids);
            }
            cursor = page.next_cursor;
            if cursor.is_none() {
                return Ok(ids);
            }
        }
    }

    /// Append every chunk sequentially, then recurse into deferred subtrees
    async fn upload(
        &self,
        job: &UploadJob,
        page_id: &str,
        upload_plan: &UploadPlan,
        total_calls: usize,
        completed_calls: &mut usize,
        outcome: &mut UploadOutcome,
    ) -> Result<()> {
        for (chunk_index, chunk) in upload_plan.chunks.iter().enumerate() {
            checkpoint(job)?;
            let wires: Vec<Value> = chunk.iter().map(|node| node.wire.clone()).collect();
            let created = self
                .api
                .append_children(page_id, wires)
                .await
                .map_err(|error| annotate_chunk(error, chunk_index))?;
            outcome.appended += chunk.len();
            *completed_calls += 1;
            job.report(JobPhase::Uploading, *completed_calls, total_calls);
            if created.len() < chunk.len() {
                return Err(Error::workspace(format!(
                    "append returned {} blocks for a chunk of {}",
                    created.len(),
                    chunk.len()
                )));
            }
            for (node, remote) in chunk.iter().zip(created.iter()) {
                if !node.deferred.is_empty() {
                    self.append_deferred(
                        job,
                        &remote.id,
                        &node.deferred,
                        total_calls,
                        completed_calls,
                        outcome,
                    )
                    .await?;
                }
            }
        }
        Ok(())
    }

    /// Append deferred children against an assigned parent id
    fn append_deferred<'a>(
        &'a self,
        job: &'a UploadJob,
        parent_id: &'a str,
        nodes: &'a [UploadNode],
        total_calls: usize,
        completed_calls: &'a mut usize,
        outcome: &'a mut UploadOutcome,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            for batch in nodes.chunks(MAX_CHILDREN_PER_APPEND) {
                checkpoint(job)?;
                let wires: Vec<Value> = batch.iter().map(|node| node.wire.clone()).collect();
                let created = self.api.append_children(parent_id, wires).await?;
                outcome.appended += batch.len();
                *completed_calls += 1;
                job.report(JobPhase::Uploading, *completed_calls, total_calls);
                if created.len() < batch.len() {
                    return Err(Error::workspace(format!(
                        "deferred append returned {} blocks for a batch of {}",
                        created.len(),
                        batch.len()
                    )));
                }
                for (node, remote) in batch.iter().zip(created.iter()) {
                    if !node.deferred.is_empty() {
                        self.append_deferred(
                            job,
                            &remote.id,
                            &node.deferred,
                            total_calls,
                            completed_calls,
                            outcome,
                        )
                        .await?;
                    }
                }
            }
            Ok(())
        })
    }

    /// Walk the remote tree, strip markers, and return the swept tree
    async fn sweep(
        &self,
        job: &UploadJob,
        page_id: &str,
    ) -> Result<(Vec<Block>, Vec<String>, usize)> {
        job.report(JobPhase::Sweeping, 0, 0);
        let mut warnings = Vec::new();
        let mut residual = 0usize;
        let mut visited = 0usize;
        let blocks = self
            .sweep_level(
                job,
                page_id,
                self.config.sweep_depth,
                &mut warnings,
                &mut residual,
                &mut visited,
            )
            .await?;
        Ok((blocks, warnings, residual))
    }

    fn sweep_level<'a>(
        &'a self,
        job: &'a UploadJob,
        parent_id: &'a str,
        depth: usize,
        warnings: &'a mut Vec<String>,
        residual: &'a mut usize,
        visited: &'a mut usize,
    ) -> BoxFuture<'a, Result<Vec<Block>>> {
        Box::pin(async move {
            let mut blocks = Vec::new();
            let mut cursor = None;
            loop {
                checkpoint(job)?;
                let page = self.api.list_children(parent_id, cursor).await?;
                for remote in page.results {
                    *visited += 1;
                    let mut block = remote.block;
                    if strip_block_markers(&mut block) {
                        match self.sweep_update(job, &remote.id, &block).await {
                            Ok(()) => {}
                            Err(Error::NotFound { .. }) => {
                                // Deleted underneath us; nothing to sweep.
                            }
                            Err(error) => {
                                warn!(block_id = %remote.id, %error, "marker sweep failed");
                                warnings.push(format!(
                                    "marker not swept from block {}",
                                    remote.id
                                ));
                                *residual += 1;
                            }
                        }
                    }
                    if remote.has_children && depth > 0 && block.kind().supports_children() {
                        let children = self
                            .sweep_level(job, &remote.id, depth - 1, warnings, residual, visited)
                            .await?;
                        if let Some(slot) = block.children_mut() {
                            *slot = children;
                        }
                    }
                    job.report(JobPhase::Sweeping, *visited, 0);
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

    /// Issue the marker-stripping update with conflict retries
    async fn sweep_update(&self, job: &UploadJob, block_id: &str, cleaned: &Block) -> Result<()> {
        let Some(payload) = update_payload(cleaned) else {
            return Ok(());
        };
        let mut attempt = 1usize;
        loop {
            checkpoint(job)?;
            match self.api.update_block(block_id, payload.clone()).await {
                Ok(()) => return Ok(()),
                Err(Error::Conflict { .. }) if attempt < SWEEP_MAX_RETRIES => {
                    tokio::time::sleep(std::time::Duration::from_millis(
                        SWEEP_RETRY_DELAY_MS * attempt as u64,
                    ))
                    .await;
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    /// Best-effort page property refresh; failures become warnings
    pub async fn finalize_properties(
        &self,
        job: &UploadJob,
        page_id: &str,
        properties: Value,
        warnings: &mut Vec<String>,
    ) {
        job.report(JobPhase::Finalizing, 0, 1);
        if let Err(error) = self.api.update_page_properties(page_id, properties).await {
            warn!(page_id, %error, "property refresh failed");
            warnings.push(format!("property refresh failed: {error}"));
        }
        job.report(JobPhase::Finalizing, 1, 1);
    }
}

/// Observe cancellation and deadline at a suspension point
fn checkpoint(job: &UploadJob) -> Result<()> {
    if job.is_cancelled() {
        return Err(Error::cancelled(format!(
            "job {} cancelled by request",
            job.request_id
        )));
    }
    if job.is_expired() {
        return Err(Error::timeout(format!(
            "job {} exceeded its deadline",
            job.request_id
        )));
    }
    Ok(())
}

/// Record the failing chunk index on terminal validation errors
fn annotate_chunk(error: Error, chunk_index: usize) -> Error {
    match error {
        Error::Validation { message } => {
            Error::validation(format!("chunk {chunk_index}: {message}"))
        }
        other => other,
    }
}

/// Strip markers from a block's own runs; true when anything changed
fn strip_block_markers(block: &mut Block) -> bool {
    let mut changed = false;
    if let Block::TableRow { cells } = block {
        for cell in cells {
            changed |= strip_runs(cell);
        }
        return changed;
    }
    if let Some(runs) = block.rich_text_mut() {
        changed |= strip_runs(runs);
    }
    changed
}

fn strip_runs(runs: &mut Vec<RichText>) -> bool {
    let mut changed = false;
    for run in runs.iter_mut() {
        if marker::contains_marker(&run.text) {
            run.text = marker::strip(&run.text);
            changed = true;
        }
    }
    if changed {
        runs.retain(|run| !run.text.is_empty());
    }
    changed
}

/// Update payload rewriting only the swept text content
fn update_payload(block: &Block) -> Option<Value> {
    let wire = block.to_wire_shallow();
    let tag = block.kind().as_str();
    let payload = wire.get(tag)?;
    let inner = match block {
        Block::TableRow { .. } => json!({ "cells": payload.get("cells")? }),
        _ => json!({ "rich_text": payload.get("rich_text")? }),
    };
    let mut out = serde_json::Map::new();
    out.insert(tag.to_owned(), inner);
    Some(Value::Object(out))
}
