//! Branding invariant: a locked watermark element on the active page.
//!
//! The enforcer guarantees *existence* of the protected element: when a scan of
//! the active page's direct children finds no element with the protected id, the
//! canonical element is inserted; when it finds one or more, nothing happens.
//! Insertion therefore never produces a duplicate, no matter how often it runs.

use serde::{Deserialize, Serialize};

use crate::element::{TextAlign, VerticalAlign};
use crate::engine::{DocumentEngine, Notification, Subscription};
use crate::{Element, ElementKind, Page, StudioError, StudioResult};

/// Well-known identifier of the watermark element.
pub const BRANDING_ID: &str = "branding_watermark";

/// Attributes of the protected watermark element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrandingConfig {
    /// Element identifier.
    pub id: String,
    /// Watermark text.
    pub text: String,
    /// Font size.
    pub font_size: f64,
    /// Text color.
    pub fill: String,
    /// Height of the watermark box.
    pub height: f64,
    /// Distance from the page bottom to the top of the box.
    pub bottom_offset: f64,
}

impl Default for BrandingConfig {
    fn default() -> Self {
        Self {
            id: BRANDING_ID.to_string(),
            text: "Created with Priey Design Studio | www.priey.com".to_string(),
            font_size: 32.0,
            fill: "#999999".to_string(),
            height: 50.0,
            bottom_offset: 60.0,
        }
    }
}

impl BrandingConfig {
    /// Build the canonical watermark for a page of the given size.
    ///
    /// # Errors
    ///
    /// Returns an error if the page size is not positive and finite.
    pub fn element_for(&self, page_width: f64, page_height: f64) -> StudioResult<Element> {
        if !(page_width.is_finite() && page_height.is_finite())
            || page_width <= 0.0
            || page_height <= 0.0
        {
            return Err(StudioError::InvalidOperation(format!(
                "cannot place watermark on a {page_width}x{page_height} page"
            )));
        }
        Ok(Element::new(
            self.id.clone(),
            ElementKind::Text {
                text: self.text.clone(),
                font_size: self.font_size,
                font_family: "Roboto".to_string(),
                fill: self.fill.clone(),
                align: TextAlign::Center,
                vertical_align: VerticalAlign::Middle,
            },
        )
        .with_frame(0.0, page_height - self.bottom_offset, page_width, self.height)
        .locked())
    }
}

/// Result of one enforcement pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnsureOutcome {
    /// The protected element was already present.
    Present {
        /// Whether the present element matches the canonical attributes.
        canonical: bool,
    },
    /// The protected element was missing and has been inserted.
    Inserted,
    /// The document has no active page.
    NoActivePage,
    /// The element could not be built or inserted.
    Failed,
}

/// Ensure the protected element exists among the page's direct children.
///
/// # Errors
///
/// Returns an error if the canonical element cannot be built for this page size.
pub fn ensure_protected_element(
    page: &mut Page,
    branding: &BrandingConfig,
    page_width: f64,
    page_height: f64,
) -> StudioResult<EnsureOutcome> {
    if let Some(existing) = page.find(&branding.id) {
        let canonical = branding
            .element_for(page_width, page_height)
            .is_ok_and(|expected| *existing == expected);
        return Ok(EnsureOutcome::Present { canonical });
    }
    page.add_element(branding.element_for(page_width, page_height)?);
    Ok(EnsureOutcome::Inserted)
}

/// Keeps the branding invariant on an engine's active page.
///
/// Holds at most one change subscription; [`InvariantEnforcer::detach`] (or
/// dropping the enforcer) releases it.
#[derive(Debug)]
pub struct InvariantEnforcer {
    branding: BrandingConfig,
    subscription: Option<Subscription>,
}

impl InvariantEnforcer {
    /// Create a detached enforcer.
    #[must_use]
    pub fn new(branding: BrandingConfig) -> Self {
        Self {
            branding,
            subscription: None,
        }
    }

    /// The protected element's attributes.
    #[must_use]
    pub fn branding(&self) -> &BrandingConfig {
        &self.branding
    }

    /// Subscribe to the engine's change stream, replacing any previous subscription.
    pub fn attach<E: DocumentEngine + ?Sized>(&mut self, engine: &E) {
        self.subscription = Some(engine.subscribe());
    }

    /// Release the subscription.
    pub fn detach(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
    }

    /// Whether a subscription is held.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.subscription.is_some()
    }

    /// Run one enforcement pass on the active page.
    pub fn enforce<E: DocumentEngine + ?Sized>(&self, engine: &mut E) -> EnsureOutcome {
        enforce_active_page(&self.branding, engine)
    }

    /// Process pending change notifications one at a time, enforcing after each.
    ///
    /// Returns the number of notifications processed.
    pub fn process_pending<E: DocumentEngine + ?Sized>(&mut self, engine: &mut E) -> usize {
        let Some(subscription) = self.subscription.as_mut() else {
            return 0;
        };
        let mut processed = 0;
        while let Some(notification) = subscription.poll() {
            if let Notification::Missed(missed) = notification {
                tracing::debug!("Enforcer missed {missed} change notifications, rescanning");
            }
            enforce_active_page(&self.branding, engine);
            processed += 1;
        }
        processed
    }

    /// Drop pending notifications without enforcing.
    pub fn discard_pending(&mut self) -> usize {
        self.subscription.as_mut().map_or(0, Subscription::clear)
    }
}

fn enforce_active_page<E: DocumentEngine + ?Sized>(
    branding: &BrandingConfig,
    engine: &mut E,
) -> EnsureOutcome {
    let Some(index) = engine.active_page_index() else {
        return EnsureOutcome::NoActivePage;
    };
    let (width, height) = (engine.document().width, engine.document().height);

    if let Some(existing) = engine.active_page().and_then(|p| p.find(&branding.id)) {
        let canonical = branding
            .element_for(width, height)
            .is_ok_and(|expected| *existing == expected);
        return EnsureOutcome::Present { canonical };
    }

    let element = match branding.element_for(width, height) {
        Ok(element) => element,
        Err(e) => {
            tracing::error!("Failed to build watermark for page {index}: {e}");
            return EnsureOutcome::Failed;
        }
    };
    match engine.add_element(index, element) {
        Ok(()) => {
            tracing::debug!("Inserted watermark on page {index}");
            EnsureOutcome::Inserted
        }
        Err(e) => {
            tracing::error!("Failed to insert watermark on page {index}: {e}");
            EnsureOutcome::Failed
        }
    }
}
