//! # Priey Design Studio Core
//!
//! Document session and integrity core of the design editor: the session
//! lifecycle, the validate-then-commit import pipeline, the branding
//! watermark invariant, persistence and localization.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                  Session                    │
//! │  status · language · generation · storage   │
//! ├──────────────────────┬──────────────────────┤
//! │  Format Converters   │  Invariant Enforcer  │
//! │  - document JSON     │  - change stream     │
//! │  - SVG import/export │  - branding element  │
//! ├──────────────────────┴──────────────────────┤
//! │        Document Engine (MemoryEngine)       │
//! │  pages · elements · undo · translations     │
//! └─────────────────────────────────────────────┘
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod convert;
pub mod document;
pub mod element;
pub mod enforcer;
pub mod engine;
pub mod error;
pub mod i18n;
pub mod import;
pub mod io;
pub mod session;
pub mod storage;
pub mod validate;

pub use config::{CanvasSize, SessionConfig};
pub use convert::{CandidateDocument, DroppedPrimitive};
pub use document::{Document, Page};
pub use element::{Element, ElementKind};
pub use enforcer::{BrandingConfig, EnsureOutcome, InvariantEnforcer, BRANDING_ID};
pub use engine::{ChangeEvent, DocumentEngine, MemoryEngine, Notification, Subscription};
pub use error::{
    ConversionError, DropError, ImportError, ParseError, PersistenceError, StudioError,
    StudioResult,
};
pub use i18n::{Language, Translations};
pub use import::{DeclaredFormat, DropGesture, DroppedItem, ImportRequest};
pub use session::{
    ExportFormat, ExportedFile, FirstLoad, ImportReport, ImportTicket, Session, SessionStatus,
    SessionView,
};
pub use storage::{FsStorage, MemoryStorage, SessionStorage, StorageKey};
pub use validate::ValidationError;

/// Studio core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
