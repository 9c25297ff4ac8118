//! Document engine adapter.
//!
//! [`DocumentEngine`] is the contract the session core consumes: a mutable
//! document tree, JSON serialization, validation, and a change stream.
//! [`MemoryEngine`] implements it in memory with snapshot undo.
//!
//! Every mutation publishes a [`ChangeEvent`] on a broadcast channel.
//! Subscribers hold a [`Subscription`]; dropping it unsubscribes.

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::TryRecvError;

use crate::i18n::Translations;
use crate::validate::{validate_document, ValidationError};
use crate::{Document, Element, Page, StudioError, StudioResult};

/// Capacity of the change channel before slow subscribers start lagging.
const CHANGE_CHANNEL_CAPACITY: usize = 256;

/// Default number of undo snapshots kept.
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

/// A change to the engine's document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A whole document replaced the previous one.
    DocumentLoaded,
    /// An element was added to a page.
    ElementAdded {
        /// Page index.
        page: usize,
        /// Element identifier.
        id: String,
    },
    /// An element was modified.
    ElementUpdated {
        /// Page index.
        page: usize,
        /// Element identifier.
        id: String,
    },
    /// An element was removed from a page.
    ElementRemoved {
        /// Page index.
        page: usize,
        /// Element identifier.
        id: String,
    },
    /// A page was appended.
    PageAdded {
        /// Index of the new page.
        page: usize,
    },
    /// The active page changed.
    ActivePageChanged {
        /// Index of the new active page.
        page: usize,
    },
    /// Undo or redo restored an earlier document state.
    HistoryRestored,
}

/// What a subscriber observed when polling its change stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    /// A single change.
    Change(ChangeEvent),
    /// The subscriber fell behind and missed this many changes.
    Missed(u64),
}

/// A live subscription to an engine's change stream.
#[derive(Debug)]
pub struct Subscription {
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    /// Take the next pending notification without waiting.
    pub fn poll(&mut self) -> Option<Notification> {
        match self.receiver.try_recv() {
            Ok(event) => Some(Notification::Change(event)),
            Err(TryRecvError::Lagged(missed)) => Some(Notification::Missed(missed)),
            Err(TryRecvError::Empty | TryRecvError::Closed) => None,
        }
    }

    /// Discard every pending notification, returning how many were pending.
    pub fn clear(&mut self) -> usize {
        let mut count = 0;
        while self.poll().is_some() {
            count += 1;
        }
        count
    }

    /// End the subscription.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

/// Contract of the canvas/document engine.
pub trait DocumentEngine {
    /// Replace the current document, releasing the previous one.
    fn load_document(&mut self, document: Document);

    /// The current document.
    fn document(&self) -> &Document;

    /// Serialize the current document.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    fn to_json(&self) -> StudioResult<String> {
        self.document().to_json()
    }

    /// Check a candidate document; an empty list means it can be loaded.
    fn validate(&self, candidate: &serde_json::Value) -> Vec<ValidationError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> Subscription;

    /// Number of live subscriptions.
    fn subscriber_count(&self) -> usize;

    /// Index of the active page, if the document has pages.
    fn active_page_index(&self) -> Option<usize>;

    /// The active page.
    fn active_page(&self) -> Option<&Page> {
        self.active_page_index()
            .and_then(|index| self.document().page(index))
    }

    /// Switch the active page.
    ///
    /// # Errors
    ///
    /// Returns an error if the index is out of range.
    fn set_active_page(&mut self, index: usize) -> StudioResult<()>;

    /// Append an empty page and return its index.
    fn add_page(&mut self) -> usize;

    /// Add an element on top of a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page index is out of range.
    fn add_element(&mut self, page: usize, element: Element) -> StudioResult<()>;

    /// Modify a direct child of a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page or element does not exist, or the element
    /// is not editable.
    fn update_element(
        &mut self,
        page: usize,
        id: &str,
        update: &mut dyn FnMut(&mut Element),
    ) -> StudioResult<()>;

    /// Remove a direct child of a page.
    ///
    /// # Errors
    ///
    /// Returns an error if the page or element does not exist, or the element
    /// is not removable.
    fn remove_element(&mut self, page: usize, id: &str) -> StudioResult<Element>;

    /// Replace the translation table (last write wins).
    fn set_translations(&mut self, translations: Translations);

    /// The active translation table.
    fn translations(&self) -> &Translations;
}

/// In-memory engine with snapshot undo/redo.
#[derive(Debug)]
pub struct MemoryEngine {
    document: Document,
    active_page: usize,
    undo_stack: Vec<Document>,
    redo_stack: Vec<Document>,
    history_limit: usize,
    translations: Translations,
    changes: broadcast::Sender<ChangeEvent>,
}

impl MemoryEngine {
    /// Create an engine holding an empty document of the given size.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_history_limit(width, height, DEFAULT_HISTORY_LIMIT)
    }

    /// Create an engine keeping at most `history_limit` undo snapshots.
    #[must_use]
    pub fn with_history_limit(width: f64, height: f64, history_limit: usize) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            document: Document::new(width, height),
            active_page: 0,
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            history_limit,
            translations: Translations::default(),
            changes,
        }
    }

    /// Restore the previous document state. Returns false if there is none.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.undo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.document, previous);
        self.redo_stack.push(current);
        self.clamp_active_page();
        self.emit(ChangeEvent::HistoryRestored);
        true
    }

    /// Re-apply an undone state. Returns false if there is none.
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.redo_stack.pop() else {
            return false;
        };
        let current = std::mem::replace(&mut self.document, next);
        self.undo_stack.push(current);
        self.clamp_active_page();
        self.emit(ChangeEvent::HistoryRestored);
        true
    }

    /// Check if undo is available.
    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    /// Check if redo is available.
    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    fn save_state(&mut self) {
        if self.history_limit == 0 {
            return;
        }
        self.undo_stack.push(self.document.clone());
        self.redo_stack.clear();
        while self.undo_stack.len() > self.history_limit {
            self.undo_stack.remove(0);
        }
    }

    fn clamp_active_page(&mut self) {
        let count = self.document.page_count();
        if self.active_page >= count {
            self.active_page = count.saturating_sub(1);
        }
    }

    fn emit(&self, event: ChangeEvent) {
        // No subscribers is fine.
        let _ = self.changes.send(event);
    }

    fn page_mut_checked(&mut self, page: usize) -> StudioResult<&mut Page> {
        let count = self.document.page_count();
        self.document
            .page_mut(page)
            .ok_or(StudioError::PageOutOfRange { index: page, count })
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new(800.0, 600.0)
    }
}

impl DocumentEngine for MemoryEngine {
    fn load_document(&mut self, document: Document) {
        self.document = document;
        self.active_page = 0;
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.emit(ChangeEvent::DocumentLoaded);
    }

    fn document(&self) -> &Document {
        &self.document
    }

    fn validate(&self, candidate: &serde_json::Value) -> Vec<ValidationError> {
        validate_document(candidate)
    }

    fn subscribe(&self) -> Subscription {
        Subscription {
            receiver: self.changes.subscribe(),
        }
    }

    fn subscriber_count(&self) -> usize {
        self.changes.receiver_count()
    }

    fn active_page_index(&self) -> Option<usize> {
        (self.active_page < self.document.page_count()).then_some(self.active_page)
    }

    fn set_active_page(&mut self, index: usize) -> StudioResult<()> {
        let count = self.document.page_count();
        if index >= count {
            return Err(StudioError::PageOutOfRange { index, count });
        }
        if index != self.active_page {
            self.active_page = index;
            self.emit(ChangeEvent::ActivePageChanged { page: index });
        }
        Ok(())
    }

    fn add_page(&mut self) -> usize {
        self.save_state();
        self.document.pages.push(Page::new());
        let index = self.document.page_count() - 1;
        self.emit(ChangeEvent::PageAdded { page: index });
        index
    }

    fn add_element(&mut self, page: usize, element: Element) -> StudioResult<()> {
        self.page_mut_checked(page)?;
        self.save_state();
        let id = element.id.clone();
        self.page_mut_checked(page)?.add_element(element);
        self.emit(ChangeEvent::ElementAdded { page, id });
        Ok(())
    }

    fn update_element(
        &mut self,
        page: usize,
        id: &str,
        update: &mut dyn FnMut(&mut Element),
    ) -> StudioResult<()> {
        let target = self
            .page_mut_checked(page)?
            .find(id)
            .ok_or_else(|| StudioError::ElementNotFound(id.to_string()))?;
        if !target.editable {
            return Err(StudioError::ProtectedElement(id.to_string()));
        }
        self.save_state();
        if let Some(element) = self.page_mut_checked(page)?.find_mut(id) {
            update(element);
        }
        self.emit(ChangeEvent::ElementUpdated {
            page,
            id: id.to_string(),
        });
        Ok(())
    }

    fn remove_element(&mut self, page: usize, id: &str) -> StudioResult<Element> {
        let target = self
            .page_mut_checked(page)?
            .find(id)
            .ok_or_else(|| StudioError::ElementNotFound(id.to_string()))?;
        if !target.removable {
            return Err(StudioError::ProtectedElement(id.to_string()));
        }
        self.save_state();
        let removed = self.page_mut_checked(page)?.remove_element(id)?;
        self.emit(ChangeEvent::ElementRemoved {
            page,
            id: id.to_string(),
        });
        Ok(removed)
    }

    fn set_translations(&mut self, translations: Translations) {
        self.translations = translations;
    }

    fn translations(&self) -> &Translations {
        &self.translations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::i18n::Language;
    use crate::ElementKind;

    fn line(id: &str) -> Element {
        Element::new(id, ElementKind::Line { color: "#000".into() })
    }

    #[test]
    fn test_mutations_emit_events_in_order() {
        let mut engine = MemoryEngine::default();
        let mut sub = engine.subscribe();

        engine.add_element(0, line("a")).expect("add");
        engine
            .update_element(0, "a", &mut |e| e.x = 5.0)
            .expect("update");
        engine.remove_element(0, "a").expect("remove");

        assert_eq!(
            sub.poll(),
            Some(Notification::Change(ChangeEvent::ElementAdded {
                page: 0,
                id: "a".into()
            }))
        );
        assert_eq!(
            sub.poll(),
            Some(Notification::Change(ChangeEvent::ElementUpdated {
                page: 0,
                id: "a".into()
            }))
        );
        assert_eq!(
            sub.poll(),
            Some(Notification::Change(ChangeEvent::ElementRemoved {
                page: 0,
                id: "a".into()
            }))
        );
        assert_eq!(sub.poll(), None);
    }

    #[test]
    fn test_dropping_subscription_unsubscribes() {
        let engine = MemoryEngine::default();
        let sub = engine.subscribe();
        assert_eq!(engine.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(engine.subscriber_count(), 0);
    }

    #[test]
    fn test_locked_elements_refuse_edit_and_removal() {
        let mut engine = MemoryEngine::default();
        engine.add_element(0, line("lock").locked()).expect("add");

        assert!(matches!(
            engine.remove_element(0, "lock"),
            Err(StudioError::ProtectedElement(_))
        ));
        assert!(matches!(
            engine.update_element(0, "lock", &mut |e| e.x = 1.0),
            Err(StudioError::ProtectedElement(_))
        ));
        assert!(engine.document().pages[0].find("lock").is_some());
    }

    #[test]
    fn test_page_out_of_range() {
        let mut engine = MemoryEngine::default();
        assert!(matches!(
            engine.add_element(3, line("a")),
            Err(StudioError::PageOutOfRange { index: 3, count: 1 })
        ));
        assert!(engine.set_active_page(1).is_err());
    }

    #[test]
    fn test_active_page_switch_emits_once() {
        let mut engine = MemoryEngine::default();
        let page = engine.add_page();
        let mut sub = engine.subscribe();

        engine.set_active_page(page).expect("switch");
        engine.set_active_page(page).expect("same page");

        assert_eq!(
            sub.poll(),
            Some(Notification::Change(ChangeEvent::ActivePageChanged { page }))
        );
        assert_eq!(sub.poll(), None);
        assert_eq!(engine.active_page_index(), Some(page));
    }

    #[test]
    fn test_undo_redo() {
        let mut engine = MemoryEngine::default();
        engine.add_element(0, line("a")).expect("add");
        assert!(engine.can_undo());

        assert!(engine.undo());
        assert!(engine.document().pages[0].children.is_empty());
        assert!(engine.redo());
        assert!(engine.document().pages[0].find("a").is_some());
        assert!(!engine.redo());
    }

    #[test]
    fn test_history_limit() {
        let mut engine = MemoryEngine::with_history_limit(100.0, 100.0, 2);
        for id in ["a", "b", "c"] {
            engine.add_element(0, line(id)).expect("add");
        }
        assert!(engine.undo());
        assert!(engine.undo());
        assert!(!engine.undo());
        assert_eq!(engine.document().pages[0].children.len(), 1);
    }

    #[test]
    fn test_load_document_resets_history_and_page() {
        let mut engine = MemoryEngine::default();
        let page = engine.add_page();
        engine.set_active_page(page).expect("switch");

        engine.load_document(Document::new(10.0, 10.0));
        assert_eq!(engine.active_page_index(), Some(0));
        assert!(!engine.can_undo());
    }

    #[test]
    fn test_lagging_subscriber_reports_missed() {
        let mut engine = MemoryEngine::default();
        let mut sub = engine.subscribe();
        for i in 0..(CHANGE_CHANNEL_CAPACITY + 10) {
            engine
                .add_element(0, line(&format!("e{i}")))
                .expect("add");
        }
        assert_eq!(sub.poll(), Some(Notification::Missed(10)));
    }

    #[test]
    fn test_translations_slot_last_write_wins() {
        let mut engine = MemoryEngine::default();
        engine.set_translations(Translations::for_language(Language::Fr));
        engine.set_translations(Translations::for_language(Language::Ru));
        assert_eq!(engine.translations().language(), Language::Ru);
    }
}
