//! Cake day and thank-you detection.
//!
//! Both detectors are decision functions over one post: they read the
//! author's record, apply a fixed list of skip conditions, and reply at most
//! once. A skip is an ordinary outcome, not an error. Errors are reserved for
//! store inconsistencies and collaborator failures, which the worker's
//! recovery loop handles.
//!
//! # Module Structure
//!
//! - [`cakeday`]: wish an account on its anniversary, once per year
//! - [`thanks`]: acknowledge a thank-you reply to one of our wishes
//! - [`ordinal`]: `9` -> `9^th`
//! - [`templates`]: the fixed reply texts

use std::sync::Arc;

use rand::Rng;
use thiserror::Error;

use crate::source::{SentimentScorer, SourceError};
use crate::store::{RecordStore, StoreError};
use crate::types::Username;

pub mod cakeday;
pub mod ordinal;
pub mod templates;
pub mod thanks;

pub use cakeday::{CakedayOutcome, CakedaySkip, assess_cakeday, consider_cakeday};
pub use thanks::{ThanksOutcome, ThanksSkip, consider_thanks};

/// Picks one of `len` templates.
///
/// Injected so tests can assert exact reply texts.
pub trait TemplateChooser: Send + Sync {
    /// Returns an index in `0..len`. `len` is never zero.
    fn choose(&self, len: usize) -> usize;
}

/// Uniformly random template selection.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomChooser;

impl TemplateChooser for RandomChooser {
    fn choose(&self, len: usize) -> usize {
        rand::thread_rng().gen_range(0..len)
    }
}

/// Errors that abort a detection.
#[derive(Debug, Error)]
pub enum DetectError {
    /// Record store failure, including data inconsistency.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Content source or posting failure.
    #[error("content source error: {0}")]
    Source(#[from] SourceError),
}

/// Result type for detection.
pub type Result<T> = std::result::Result<T, DetectError>;

/// Everything the detectors share across communities.
#[derive(Clone)]
pub struct DetectorContext {
    pub store: Arc<RecordStore>,
    pub sentiment: Arc<dyn SentimentScorer>,
    pub chooser: Arc<dyn TemplateChooser>,

    /// The bot's own account, used to recognise its wishes and replies.
    pub bot: Username,
}

impl DetectorContext {
    pub fn new(
        store: Arc<RecordStore>,
        sentiment: Arc<dyn SentimentScorer>,
        chooser: Arc<dyn TemplateChooser>,
        bot: Username,
    ) -> Self {
        DetectorContext {
            store,
            sentiment,
            chooser,
            bot,
        }
    }
}

impl std::fmt::Debug for DetectorContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DetectorContext")
            .field("store", &self.store.path())
            .field("bot", &self.bot)
            .finish_non_exhaustive()
    }
}
