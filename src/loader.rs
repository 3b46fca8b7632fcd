//! Asynchronous boundary with the collaborators that fetch markup.
//!
//! Fetching is the only suspension point. Once the markup is in hand the
//! synchronous [`DocumentPipeline`] runs to completion.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use futures::future::join_all;
use thiserror::Error;

use crate::{
    bus::{BusError, Message, MessageBus, MessagePayload, PanelId, ResourceInfo},
    pipeline::{ChapterResult, DocumentPipeline},
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("{book} {chapter} not found")]
    NotFound { book: String, chapter: u32 },
    #[error("Failed to fetch {book} {chapter}: {message}")]
    Fetch {
        book: String,
        chapter: u32,
        message: String,
    },
    #[error("Bus error: {0}")]
    Bus(#[from] BusError),
}

pub type LoadResult<T> = Result<T, LoadError>;

/// Supplies raw chapter markup, e.g. from a network resource or a cache.
#[mockall::automock]
#[async_trait]
pub trait MarkupSource: Send + Sync {
    async fn fetch_chapter(&self, book: &str, chapter: u32) -> LoadResult<String>;
}

/// Chapters held in memory, keyed by book and chapter.
#[derive(Debug, Default)]
pub struct InMemorySource {
    chapters: DashMap<(String, u32), String>,
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, book: &str, chapter: u32, markup: impl Into<String>) {
        self.chapters.insert((book.to_string(), chapter), markup.into());
    }

    pub fn with_chapter(self, book: &str, chapter: u32, markup: impl Into<String>) -> Self {
        self.insert(book, chapter, markup);
        self
    }
}

#[async_trait]
impl MarkupSource for InMemorySource {
    async fn fetch_chapter(&self, book: &str, chapter: u32) -> LoadResult<String> {
        self.chapters
            .get(&(book.to_string(), chapter))
            .map(|markup| markup.clone())
            .ok_or_else(|| LoadError::NotFound {
                book: book.to_string(),
                chapter,
            })
    }
}

pub struct ChapterLoader {
    source: Arc<dyn MarkupSource>,
    pipeline: DocumentPipeline,
    resource: PanelId,
    bus: Option<Arc<MessageBus>>,
}

impl ChapterLoader {
    pub fn new(
        source: Arc<dyn MarkupSource>,
        pipeline: DocumentPipeline,
        resource: impl Into<PanelId>,
    ) -> Self {
        Self {
            source,
            pipeline,
            resource: resource.into(),
            bus: None,
        }
    }

    /// Announces every loaded chapter on `bus` with a `resourceLoaded` event.
    pub fn with_bus(mut self, bus: Arc<MessageBus>) -> Self {
        self.bus = Some(bus);
        self
    }

    pub fn pipeline(&self) -> &DocumentPipeline {
        &self.pipeline
    }

    #[tracing::instrument(level = "debug", skip(self))]
    pub async fn load_chapter(&self, book: &str, chapter: u32) -> LoadResult<ChapterResult> {
        let markup = self.source.fetch_chapter(book, chapter).await?;
        let result = self.pipeline.process_chapter(book, chapter, &markup);
        tracing::debug!(
            "{} loaded {} {} ({} verses, generation {})",
            self.resource,
            book,
            result.chapter,
            result.verses.len(),
            result.generation
        );
        self.announce(&result)?;
        Ok(result)
    }

    /// Fetches chapters concurrently. Results keep the order of `chapters`.
    pub async fn load_chapters(&self, book: &str, chapters: &[u32]) -> Vec<LoadResult<ChapterResult>> {
        join_all(chapters.iter().map(|chapter| self.load_chapter(book, *chapter))).await
    }

    fn announce(&self, result: &ChapterResult) -> LoadResult<()> {
        let Some(bus) = &self.bus else {
            return Ok(());
        };
        let message = Message::builder(MessagePayload::ResourceLoaded(ResourceInfo {
            resource: self.resource.to_string(),
            book: result.book.clone(),
            chapters: vec![result.chapter],
            verse_count: result.verses.len(),
            generation: result.generation,
        }))
        .source(self.resource.clone())
        .build()?;
        bus.send(message)?;
        Ok(())
    }
}
