//! Concurrent batch rendering with per-document failure reporting

use anyhow::Result;
use serde::Serialize;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::CollisionPolicy;
use crate::content::loader::SourceDocument;
use crate::content::{BatchError, MarkdownRenderer, ParseError, Post, ReadError, RenderedPage};

/// Why a document was left out of the output
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Read(#[from] ReadError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("rendering panicked: {0}")]
    Panicked(String),

    #[error("address `{address}` is already taken by {}", .winner.display())]
    AddressTaken { address: String, winner: PathBuf },
}

/// A skipped document and the reason
#[derive(Debug)]
pub struct DocumentFailure {
    pub source: PathBuf,
    pub error: DocumentError,
}

#[derive(Debug, Serialize)]
struct FailureEntry<'a> {
    source: &'a PathBuf,
    error: String,
}

impl Serialize for DocumentFailure {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        FailureEntry {
            source: &self.source,
            error: self.error.to_string(),
        }
        .serialize(serializer)
    }
}

/// Result of rendering one document, tagged with its source position
#[derive(Debug)]
pub struct DocumentOutcome {
    /// Position in source order
    pub index: usize,
    pub source: PathBuf,
    pub result: Result<RenderedPage, DocumentError>,
}

/// Everything a batch produced
#[derive(Debug, Default, Serialize)]
pub struct BatchReport {
    /// Rendered pages, newest first
    pub pages: Vec<RenderedPage>,
    /// Skipped documents, in source order
    pub failures: Vec<DocumentFailure>,
}

impl BatchReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    pub fn warning_count(&self) -> usize {
        self.pages
            .iter()
            .map(|p| p.front_matter.warnings.len())
            .sum()
    }
}

/// Parse and render one document
pub fn render_document(
    document: &SourceDocument,
    renderer: &MarkdownRenderer,
) -> Result<RenderedPage, DocumentError> {
    let text = document.text.as_ref().map_err(|e| e.clone())?;
    let post = Post::parse(document.source.clone(), text)?;
    for warning in post.warnings() {
        tracing::debug!("{:?}: {}", post.source, warning);
    }
    Ok(post.render(renderer))
}

/// Like [`render_document`], but a panic becomes [`DocumentError::Panicked`]
fn render_isolated(
    document: &SourceDocument,
    renderer: &MarkdownRenderer,
) -> Result<RenderedPage, DocumentError> {
    panic::catch_unwind(AssertUnwindSafe(|| render_document(document, renderer)))
        .unwrap_or_else(|payload| Err(DocumentError::Panicked(panic_message(payload.as_ref()))))
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Render documents on blocking tasks, at most `workers` at a time.
///
/// Outcomes come back in completion order.
pub async fn render_all(
    documents: Vec<SourceDocument>,
    renderer: Arc<MarkdownRenderer>,
    workers: usize,
) -> Result<Vec<DocumentOutcome>> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut set = JoinSet::new();
    let total = documents.len();

    for (index, document) in documents.into_iter().enumerate() {
        let permit = semaphore.clone().acquire_owned().await?;
        let renderer = renderer.clone();
        set.spawn_blocking(move || {
            let _permit = permit;
            let result = render_isolated(&document, &renderer);
            DocumentOutcome {
                index,
                source: document.source,
                result,
            }
        });
    }

    let mut outcomes = Vec::with_capacity(total);
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(outcome) => outcomes.push(outcome),
            // Panics are caught inside the task; this is cancellation only
            Err(e) => tracing::error!("Render task failed: {}", e),
        }
    }

    Ok(outcomes)
}

/// Split outcomes into pages and failures, enforcing unique addresses
pub fn resolve_addresses(
    mut outcomes: Vec<DocumentOutcome>,
    policy: CollisionPolicy,
) -> Result<BatchReport, BatchError> {
    outcomes.sort_by_key(|o| o.index);

    let mut failures = Vec::new();
    let mut claimed: indexmap::IndexMap<String, Vec<RenderedPage>> = indexmap::IndexMap::new();

    for outcome in outcomes {
        match outcome.result {
            Ok(page) => claimed.entry(page.address.clone()).or_default().push(page),
            Err(error) => {
                tracing::warn!("Skipping {:?}: {}", outcome.source, error);
                failures.push(DocumentFailure {
                    source: outcome.source,
                    error,
                });
            }
        }
    }

    let mut pages = Vec::with_capacity(claimed.len());
    for (address, group) in claimed {
        if group.len() > 1 && policy == CollisionPolicy::Error {
            return Err(BatchError::AddressCollision {
                address,
                sources: group.into_iter().map(|p| p.source).collect(),
            });
        }

        let mut group = group.into_iter();
        let Some(winner) = group.next() else {
            continue;
        };
        for loser in group {
            tracing::warn!(
                "Skipping {:?}: address `{}` already taken by {:?}",
                loser.source,
                address,
                winner.source
            );
            failures.push(DocumentFailure {
                source: loser.source,
                error: DocumentError::AddressTaken {
                    address: address.clone(),
                    winner: winner.source.clone(),
                },
            });
        }
        pages.push(winner);
    }

    sort_chronologically(&mut pages);
    failures.sort_by(|a, b| a.source.cmp(&b.source));

    Ok(BatchReport { pages, failures })
}

/// Newest first; same-instant posts by address
pub fn sort_chronologically(pages: &mut [RenderedPage]) {
    pages.sort_by(|a, b| b.date().cmp(a.date()).then_with(|| a.address.cmp(&b.address)));
}

/// Render every document and resolve addresses
pub async fn run(
    documents: Vec<SourceDocument>,
    renderer: Arc<MarkdownRenderer>,
    workers: usize,
    policy: CollisionPolicy,
) -> Result<BatchReport> {
    let count = documents.len();
    tracing::info!("Rendering {} documents with {} workers", count, workers);

    let outcomes = render_all(documents, renderer, workers).await?;
    let report = resolve_addresses(outcomes, policy)?;

    tracing::info!(
        "Rendered {} of {} documents ({} skipped, {} warnings)",
        report.pages.len(),
        count,
        report.failures.len(),
        report.warning_count()
    );
    Ok(report)
}
