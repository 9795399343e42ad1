//! Text Processing for the Front Desk
//!
//! This crate turns finalized caller utterances into intents:
//! - **Normalization**: trim, lower-case and collapse whitespace
//! - **Intent Classification**: ordered keyword/pattern rules, first match wins
//!
//! # Example
//!
//! ```
//! use front_desk_text_processing::{Intent, IntentClassifier};
//!
//! let classifier = IntentClassifier::default();
//! assert_eq!(classifier.classify("Book a haircut today"), Intent::BookingRequest);
//! ```

pub mod intent;

pub use intent::{
    normalize_utterance, Classification, Intent, IntentClassifier, IntentRule, RuleMatcher,
};
