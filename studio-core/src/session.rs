//! Document session lifecycle.
//!
//! A [`Session`] owns the engine, the branding enforcer and the durable store,
//! and drives every document through the same pipeline:
//!
//! ```text
//!   Idle ──create/import──▶ Loading ──commit──▶ Ready
//!                              │                  │
//!                              └──reject──▶ Error ┘ (next create/import)
//! ```
//!
//! Imports are validate-then-commit: nothing reaches the engine until the
//! candidate has been converted and validated, so a rejected file leaves the
//! previous document byte-for-byte intact.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::config::SessionConfig;
use crate::convert::{self, page_to_svg, DroppedPrimitive};
use crate::enforcer::{EnsureOutcome, InvariantEnforcer};
use crate::engine::{DocumentEngine, MemoryEngine};
use crate::error::{DropError, ImportError, PersistenceError};
use crate::i18n::{keys, Language, Translations};
use crate::import::{DeclaredFormat, DropGesture, ImportRequest};
use crate::io::{FileSink, FileSource};
use crate::storage::{SessionStorage, StorageKey};
use crate::validate::ValidationError;
use crate::{Document, StudioResult};

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Nothing loaded yet.
    #[default]
    Idle,
    /// A create or import is in flight.
    Loading,
    /// A document is committed and editable.
    Ready,
    /// The last create/import was rejected.
    Error,
}

impl SessionStatus {
    /// Translation key of the status label.
    #[must_use]
    pub fn label_key(self) -> &'static str {
        match self {
            Self::Idle => keys::STATUS_IDLE,
            Self::Loading => keys::STATUS_LOADING,
            Self::Ready => keys::STATUS_READY,
            Self::Error => keys::STATUS_ERROR,
        }
    }
}

/// Proof that an import was started at a given generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportTicket {
    generation: u64,
}

impl ImportTicket {
    /// Generation the import was started at.
    #[must_use]
    pub fn generation(self) -> u64 {
        self.generation
    }
}

/// Outcome of a committed import.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportReport {
    /// Imported file name.
    pub name: String,
    /// Format the file was read as.
    pub format: DeclaredFormat,
    /// Primitives the SVG conversion left out.
    pub dropped: Vec<DroppedPrimitive>,
    /// Number of elements in the committed document, watermark included.
    pub elements: usize,
    /// Whether the committed document reached durable storage.
    pub persisted: bool,
}

/// What [`Session::first_load`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FirstLoad {
    /// The last persisted document was restored.
    Restored,
    /// A fresh document was created.
    Created,
    /// First load had already run; nothing changed.
    AlreadyLoaded,
}

/// Export file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    /// Editable document JSON.
    Json,
    /// SVG of the active page.
    Svg,
}

/// A file produced by [`Session::export`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedFile {
    /// Suggested file name.
    pub name: &'static str,
    /// MIME type.
    pub mime: &'static str,
    /// Contents.
    pub bytes: Vec<u8>,
}

/// The last rejected create/import, kept for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastError {
    /// Translation key of the message.
    pub key: &'static str,
    /// Diagnostic lines.
    pub diagnostics: Vec<String>,
}

/// Snapshot of the session for a UI or API client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionView {
    /// Lifecycle state.
    pub status: SessionStatus,
    /// Translated status label.
    pub status_label: String,
    /// Active language code.
    pub language: String,
    /// Translated message for the last failure, or the last notice.
    pub message: Option<String>,
    /// Diagnostics for the last failure, while in error.
    pub diagnostics: Vec<String>,
    /// Create/import counter.
    pub generation: u64,
    /// Pages in the current document.
    pub pages: usize,
    /// Active page index.
    pub active_page: Option<usize>,
}

/// A design-document session.
#[derive(Debug)]
pub struct Session<E: DocumentEngine> {
    engine: E,
    enforcer: InvariantEnforcer,
    storage: Arc<dyn SessionStorage>,
    status: watch::Sender<SessionStatus>,
    language: Language,
    generation: u64,
    last_error: Option<LastError>,
    notice: Option<&'static str>,
    committed: bool,
    first_load_done: bool,
    config: SessionConfig,
}

impl Session<MemoryEngine> {
    /// Create a session over a fresh in-memory engine.
    #[must_use]
    pub fn in_memory(storage: Arc<dyn SessionStorage>, config: SessionConfig) -> Self {
        let engine = MemoryEngine::with_history_limit(
            config.canvas.width,
            config.canvas.height,
            config.history_limit,
        );
        Self::new(engine, storage, config)
    }
}

impl<E: DocumentEngine> Session<E> {
    /// Create an idle session around an engine.
    ///
    /// The branding enforcer subscribes to the engine immediately; it only acts
    /// once a document has been committed.
    #[must_use]
    pub fn new(mut engine: E, storage: Arc<dyn SessionStorage>, config: SessionConfig) -> Self {
        let mut enforcer = InvariantEnforcer::new(config.branding.clone());
        enforcer.attach(&engine);
        let language = config.default_language;
        engine.set_translations(Translations::for_language(language));
        let (status, _) = watch::channel(SessionStatus::Idle);
        Self {
            engine,
            enforcer,
            storage,
            status,
            language,
            generation: 0,
            last_error: None,
            notice: None,
            committed: false,
            first_load_done: false,
            config,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        *self.status.borrow()
    }

    /// Watch lifecycle changes.
    #[must_use]
    pub fn subscribe_status(&self) -> watch::Receiver<SessionStatus> {
        self.status.subscribe()
    }

    /// The engine.
    #[must_use]
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// The current document.
    #[must_use]
    pub fn document(&self) -> &Document {
        self.engine.document()
    }

    /// Active language.
    #[must_use]
    pub fn language(&self) -> Language {
        self.language
    }

    /// Number of creates and imports started so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The last rejected create/import, if the session is in error.
    #[must_use]
    pub fn last_error(&self) -> Option<&LastError> {
        self.last_error.as_ref()
    }

    /// Translation key of the last non-fatal notice (rejected drop, failed
    /// save). Cleared by the next commit.
    #[must_use]
    pub fn notice(&self) -> Option<&'static str> {
        self.notice
    }

    /// Session configuration.
    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Durable store.
    #[must_use]
    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    fn set_status(&self, status: SessionStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            tracing::info!("Session status {previous:?} -> {status:?}");
        }
    }

    /// Replace the document with an empty one-page document.
    pub fn create_new_document(&mut self) {
        self.generation += 1;
        self.set_status(SessionStatus::Loading);
        let size = self.config.canvas;
        self.engine.load_document(Document::new(size.width, size.height));
        self.commit_ready();
        tracing::info!(
            "Created new {}x{} document (generation {})",
            size.width,
            size.height,
            self.generation
        );
    }

    fn commit_ready(&mut self) {
        self.last_error = None;
        self.notice = None;
        self.committed = true;
        self.set_status(SessionStatus::Ready);
        if let Some(EnsureOutcome::Present { canonical: false }) = self.sync_invariant() {
            tracing::warn!(
                "Document carries a non-canonical '{}' element; keeping it",
                self.enforcer.branding().id
            );
        }
    }

    /// Start an import: bumps the generation and enters `Loading`.
    pub fn begin_import(&mut self) -> ImportTicket {
        self.generation += 1;
        self.set_status(SessionStatus::Loading);
        ImportTicket {
            generation: self.generation,
        }
    }

    /// Convert, validate and commit a request started with [`Session::begin_import`].
    ///
    /// Does not persist; see [`Session::import_file`].
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Superseded`] if another create/import started after
    /// the ticket was issued (the session is left as the newer request put it).
    /// Any other error moves the session to `Error` with the document untouched.
    pub fn finish_import(
        &mut self,
        ticket: ImportTicket,
        request: ImportRequest,
    ) -> Result<ImportReport, ImportError> {
        if ticket.generation != self.generation {
            tracing::debug!(
                "Discarding import of {} (generation {} superseded by {})",
                request.name(),
                ticket.generation,
                self.generation
            );
            return Err(ImportError::Superseded);
        }

        if request.len() > self.config.max_import_bytes {
            return Err(self.reject(ImportError::TooLarge {
                size: request.len(),
                max: self.config.max_import_bytes,
            }));
        }

        let name = request.name().to_string();
        let conversion = match convert::convert(request) {
            Ok(conversion) => conversion,
            Err(e) => return Err(self.reject(e)),
        };

        let errors = self.engine.validate(conversion.candidate.as_json());
        if !errors.is_empty() {
            return Err(self.reject(ImportError::Invalid(errors)));
        }
        let document = match Document::from_value(conversion.candidate.into_json()) {
            Ok(document) => document,
            Err(e) => {
                return Err(self.reject(ImportError::Invalid(vec![ValidationError::Schema(
                    e.to_string(),
                )])))
            }
        };

        self.engine.load_document(document);
        self.commit_ready();

        if !conversion.dropped.is_empty() {
            tracing::info!(
                "Import of {name} dropped {} unsupported primitive(s)",
                conversion.dropped.len()
            );
        }
        tracing::info!("Imported {name} as {:?}", conversion.format);

        Ok(ImportReport {
            name,
            format: conversion.format,
            dropped: conversion.dropped,
            elements: self.engine.document().element_count(),
            persisted: false,
        })
    }

    fn reject(&mut self, error: ImportError) -> ImportError {
        tracing::warn!("Import rejected: {error}");
        self.last_error = Some(LastError {
            key: error.message_key(),
            diagnostics: error.diagnostics(),
        });
        self.set_status(SessionStatus::Error);
        error
    }

    /// Import one file and persist the result.
    ///
    /// A persist failure is logged and reported through
    /// [`ImportReport::persisted`]; it never fails the import.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError`] if the file is rejected; the session is then in
    /// `Error` and the previous document is unchanged.
    #[tracing::instrument(skip(self, request), fields(name = request.name()))]
    pub async fn import_file(&mut self, request: ImportRequest) -> Result<ImportReport, ImportError> {
        let ticket = self.begin_import();
        let mut report = self.finish_import(ticket, request)?;
        report.persisted = self.persist_logged().await;
        Ok(report)
    }

    /// Read a file through its capability and import it.
    ///
    /// # Errors
    ///
    /// Same as [`Session::import_file`], plus [`ImportError::Read`] and
    /// [`ImportError::UnsupportedFormat`] from reading the source.
    pub async fn import_from_source(
        &mut self,
        source: &dyn FileSource,
    ) -> Result<ImportReport, ImportError> {
        let ticket = self.begin_import();
        let request = match ImportRequest::from_source(source).await {
            Ok(request) => request,
            Err(e) => return Err(self.reject(e)),
        };
        let mut report = self.finish_import(ticket, request)?;
        report.persisted = self.persist_logged().await;
        Ok(report)
    }

    /// Import every file of a drop gesture, in order.
    ///
    /// The gesture is all-or-nothing: if any item is not a recognised file,
    /// nothing is imported and the session is unchanged. Once accepted, each
    /// file is imported independently and its own result returned.
    ///
    /// # Errors
    ///
    /// Returns [`DropError::CountMismatch`] when the gesture is rejected.
    pub async fn import_drop(
        &mut self,
        gesture: DropGesture,
    ) -> Result<Vec<Result<ImportReport, ImportError>>, DropError> {
        let requests = match gesture.into_requests() {
            Ok(requests) => requests,
            Err(e) => {
                tracing::warn!("Drop rejected: {e}");
                self.notice = Some(keys::DROP_REJECTED);
                return Err(e);
            }
        };
        let mut results = Vec::with_capacity(requests.len());
        for request in requests {
            results.push(self.import_file(request).await);
        }
        Ok(results)
    }

    /// Write the current document and language to durable storage.
    ///
    /// A failure is also raised as the `persist.failed` notice; the next
    /// successful write clears it.
    ///
    /// # Errors
    ///
    /// Returns [`PersistenceError`] if serialization or the store fails.
    pub async fn persist(&mut self) -> Result<(), PersistenceError> {
        let result = self.write_store().await;
        match &result {
            Ok(()) if self.notice == Some(keys::PERSIST_FAILED) => self.notice = None,
            Ok(()) => {}
            Err(_) => self.notice = Some(keys::PERSIST_FAILED),
        }
        result
    }

    async fn write_store(&self) -> Result<(), PersistenceError> {
        let json = self
            .engine
            .to_json()
            .map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        self.storage.set(StorageKey::Document, &json).await?;
        self.storage
            .set(StorageKey::Language, self.language.code())
            .await?;
        tracing::debug!("Persisted session ({} bytes)", json.len());
        Ok(())
    }

    async fn persist_logged(&mut self) -> bool {
        match self.persist().await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Failed to persist session: {e}");
                false
            }
        }
    }

    /// Switch language; unknown codes fall back to English.
    pub fn set_language(&mut self, code: &str) -> Language {
        let language = Language::from_code(code);
        self.language = language;
        self.engine
            .set_translations(Translations::for_language(language));
        tracing::debug!("Language set to {language} (requested {code:?})");
        language
    }

    /// Restore the last persisted session, or create a fresh document.
    ///
    /// Runs once; later calls return [`FirstLoad::AlreadyLoaded`].
    pub async fn first_load(&mut self) -> FirstLoad {
        if self.first_load_done {
            tracing::info!("First load already ran, ignoring");
            return FirstLoad::AlreadyLoaded;
        }
        self.first_load_done = true;

        match self.storage.get(StorageKey::Language).await {
            Ok(Some(code)) => {
                self.set_language(code.trim());
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Failed to read stored language: {e}"),
        }

        let stored = match self.storage.get(StorageKey::Document).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!("Failed to read stored document: {e}");
                None
            }
        };

        if let Some(json) = stored {
            let ticket = self.begin_import();
            let restored = ImportRequest::new(
                "document.json",
                Some("application/json".to_string()),
                json.into_bytes(),
            )
            .and_then(|request| self.finish_import(ticket, request));
            match restored {
                Ok(_) => {
                    tracing::info!("Restored persisted document");
                    return FirstLoad::Restored;
                }
                Err(e) => tracing::warn!("Stored document is unusable, starting fresh: {e}"),
            }
        }

        self.create_new_document();
        self.persist_logged().await;
        FirstLoad::Created
    }

    /// Run an edit against the engine, then enforce the invariant.
    ///
    /// Change notifications raised before the first commit or while a load is
    /// in flight are discarded.
    pub fn edit<R>(&mut self, edit: impl FnOnce(&mut E) -> R) -> R {
        let result = edit(&mut self.engine);
        self.sync_invariant();
        result
    }

    /// Switch the active page and enforce the invariant on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range.
    pub fn set_active_page(&mut self, index: usize) -> StudioResult<()> {
        self.edit(|engine| engine.set_active_page(index))
    }

    /// Process pending change notifications, then make sure the watermark is
    /// on the active page.
    ///
    /// Runs whenever a committed document is open, including in `Error` where
    /// the previous document stays editable. Returns `None` before the first
    /// commit and while loading.
    pub fn sync_invariant(&mut self) -> Option<EnsureOutcome> {
        let open = matches!(self.status(), SessionStatus::Ready | SessionStatus::Error);
        if !(self.committed && open) {
            self.enforcer.discard_pending();
            return None;
        }
        self.enforcer.process_pending(&mut self.engine);
        let outcome = self.enforcer.enforce(&mut self.engine);
        // Our own insert, if any, is already accounted for.
        self.enforcer.discard_pending();
        Some(outcome)
    }

    /// Serialize the document for download. A pure read.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or, for SVG, the document has no
    /// active page.
    pub fn export(&self, format: ExportFormat) -> StudioResult<ExportedFile> {
        match format {
            ExportFormat::Json => Ok(ExportedFile {
                name: "editable-template.json",
                mime: "application/json",
                bytes: self.engine.document().to_json_pretty()?.into_bytes(),
            }),
            ExportFormat::Svg => {
                let page = self.engine.active_page_index().unwrap_or(0);
                Ok(ExportedFile {
                    name: "design.svg",
                    mime: "image/svg+xml",
                    bytes: page_to_svg(self.engine.document(), page)?.into_bytes(),
                })
            }
        }
    }

    /// Export and write the file through a sink.
    ///
    /// # Errors
    ///
    /// Returns an error if the export or the write fails.
    pub async fn export_to(&self, format: ExportFormat, sink: &dyn FileSink) -> StudioResult<ExportedFile> {
        let file = self.export(format)?;
        sink.write(file.name, &file.bytes).await?;
        tracing::info!("Exported {}", file.name);
        Ok(file)
    }

    /// Translated message for the last failure, or else the last notice.
    #[must_use]
    pub fn message(&self) -> Option<String> {
        self.last_error
            .as_ref()
            .map(|e| e.key)
            .or(self.notice)
            .map(|key| self.engine.translations().get(key).to_string())
    }

    /// Snapshot for display.
    #[must_use]
    pub fn view(&self) -> SessionView {
        let status = self.status();
        SessionView {
            status,
            status_label: self.engine.translations().get(status.label_key()).to_string(),
            language: self.language.code().to_string(),
            message: self.message(),
            diagnostics: self
                .last_error
                .as_ref()
                .map(|e| e.diagnostics.clone())
                .unwrap_or_default(),
            generation: self.generation,
            pages: self.engine.document().page_count(),
            active_page: self.engine.active_page_index(),
        }
    }

    /// Release the enforcer's change subscription.
    pub fn close(&mut self) {
        self.enforcer.detach();
        tracing::info!("Session closed");
    }
}
