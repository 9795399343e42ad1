//! Keyword Intent Classification
//!
//! Maps a caller utterance to one of a closed set of front desk intents.
//! Rules live in an ordered table and the first rule that matches wins.
//! There is no scoring and no conversation history: the same utterance
//! always yields the same intent.
//!
//! Because the first match wins, compound utterances resolve to the earliest
//! rule. "book a haircut today" is a [`Intent::BookingRequest`] even though it
//! also names a service and a day. The table order follows the order the
//! checks were first written in and is a candidate for revision; it is kept
//! as is.
//!
//! Matching is plain substring containment on the normalized text, so "hi"
//! also fires inside words like "this".
//!
//! # Example
//!
//! ```
//! use front_desk_text_processing::intent::{Intent, IntentClassifier};
//!
//! let classifier = IntentClassifier::default();
//! let result = classifier.classify_detailed("What is the price of a shave?");
//!
//! assert_eq!(result.intent, Intent::ServiceProvided);
//! assert_eq!(result.matched.as_deref(), Some("shave"));
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Front desk intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Greeting,
    BookingRequest,
    DayProvided,
    TimeOrPeriodProvided,
    ServiceProvided,
    PriceInquiry,
    LocationInquiry,
    CancelOrReschedule,
    Farewell,
    /// No rule matched
    Unrecognized,
}

impl Intent {
    /// Every intent, in rule priority order with the fallback last
    pub const ALL: [Intent; 10] = [
        Intent::Greeting,
        Intent::BookingRequest,
        Intent::DayProvided,
        Intent::TimeOrPeriodProvided,
        Intent::ServiceProvided,
        Intent::PriceInquiry,
        Intent::LocationInquiry,
        Intent::CancelOrReschedule,
        Intent::Farewell,
        Intent::Unrecognized,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Greeting => "greeting",
            Intent::BookingRequest => "booking_request",
            Intent::DayProvided => "day_provided",
            Intent::TimeOrPeriodProvided => "time_or_period_provided",
            Intent::ServiceProvided => "service_provided",
            Intent::PriceInquiry => "price_inquiry",
            Intent::LocationInquiry => "location_inquiry",
            Intent::CancelOrReschedule => "cancel_or_reschedule",
            Intent::Farewell => "farewell",
            Intent::Unrecognized => "unrecognized",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One way a rule can fire
#[derive(Clone)]
pub enum RuleMatcher {
    /// Any keyword contained in the utterance
    Keywords(Vec<String>),
    /// Regex found anywhere in the utterance
    Pattern(Regex),
    /// Arbitrary test on the normalized utterance
    Predicate(fn(&str) -> bool),
}

impl RuleMatcher {
    /// Return the fragment that made this matcher fire
    ///
    /// Predicates report the whole utterance since they have no notion of a fragment.
    pub fn find(&self, text: &str) -> Option<String> {
        match self {
            RuleMatcher::Keywords(words) => words
                .iter()
                .find(|w| text.contains(w.as_str()))
                .cloned(),
            RuleMatcher::Pattern(regex) => regex.find(text).map(|m| m.as_str().to_string()),
            RuleMatcher::Predicate(f) => f(text).then(|| text.to_string()),
        }
    }
}

impl std::fmt::Debug for RuleMatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RuleMatcher::Keywords(words) => f.debug_tuple("Keywords").field(words).finish(),
            RuleMatcher::Pattern(regex) => f.debug_tuple("Pattern").field(&regex.as_str()).finish(),
            RuleMatcher::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// An intent together with the matchers that select it
///
/// A rule fires when any of its matchers fires.
#[derive(Debug, Clone)]
pub struct IntentRule {
    pub intent: Intent,
    pub matchers: Vec<RuleMatcher>,
}

impl IntentRule {
    /// Rule firing on any of the given keywords
    pub fn keywords(intent: Intent, words: &[&str]) -> Self {
        Self {
            intent,
            matchers: vec![RuleMatcher::Keywords(
                words.iter().map(|w| w.to_lowercase()).collect(),
            )],
        }
    }

    /// Rule firing when `predicate` holds for the normalized utterance
    pub fn predicate(intent: Intent, predicate: fn(&str) -> bool) -> Self {
        Self {
            intent,
            matchers: vec![RuleMatcher::Predicate(predicate)],
        }
    }

    /// Also fire when `pattern` is found
    pub fn or_pattern(mut self, pattern: Regex) -> Self {
        self.matchers.push(RuleMatcher::Pattern(pattern));
        self
    }

    /// Fragment of `normalized` that fired this rule, if any
    pub fn find(&self, normalized: &str) -> Option<String> {
        self.matchers.iter().find_map(|m| m.find(normalized))
    }

    pub fn is_match(&self, normalized: &str) -> bool {
        self.find(normalized).is_some()
    }
}

/// Outcome of classifying one utterance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub intent: Intent,
    /// Index of the rule that fired, `None` for the fallback
    pub rule_index: Option<usize>,
    /// Keyword or pattern match that fired the rule
    pub matched: Option<String>,
}

impl Classification {
    fn unrecognized() -> Self {
        Self {
            intent: Intent::Unrecognized,
            rule_index: None,
            matched: None,
        }
    }
}

static DIGITS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]+").unwrap());

/// Standard front desk rule table, in priority order
static STANDARD_RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| {
    vec![
        IntentRule::keywords(Intent::Greeting, &["hello", "hi"]),
        IntentRule::keywords(Intent::BookingRequest, &["book", "appointment"]),
        IntentRule::keywords(
            Intent::DayProvided,
            &[
                "monday",
                "tuesday",
                "wednesday",
                "thursday",
                "friday",
                "saturday",
                "sunday",
                "today",
                "tomorrow",
            ],
        ),
        IntentRule::keywords(
            Intent::TimeOrPeriodProvided,
            &["morning", "afternoon", "evening"],
        )
        .or_pattern(DIGITS.clone()),
        IntentRule::keywords(
            Intent::ServiceProvided,
            &["haircut", "shave", "beard", "color", "combo"],
        ),
        IntentRule::keywords(Intent::PriceInquiry, &["price", "cost", "charge"]),
        IntentRule::keywords(Intent::LocationInquiry, &["location", "address", "where"]),
        IntentRule::keywords(Intent::CancelOrReschedule, &["cancel", "reschedule"]),
        IntentRule::keywords(Intent::Farewell, &["thank", "bye"]),
    ]
});

/// Trim, lower-case and collapse runs of whitespace
pub fn normalize_utterance(utterance: &str) -> String {
    utterance
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Ordered rule classifier
#[derive(Debug, Clone)]
pub struct IntentClassifier {
    rules: Vec<IntentRule>,
}

impl Default for IntentClassifier {
    fn default() -> Self {
        Self::with_rules(STANDARD_RULES.clone())
    }
}

impl IntentClassifier {
    /// Classifier using the standard front desk table
    pub fn new() -> Self {
        Self::default()
    }

    /// Classifier over a custom ordered table
    pub fn with_rules(rules: Vec<IntentRule>) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &[IntentRule] {
        &self.rules
    }

    /// Append a rule at the lowest priority
    pub fn push_rule(&mut self, rule: IntentRule) {
        self.rules.push(rule);
    }

    /// Insert a rule at `index`, shifting lower-priority rules down
    ///
    /// `index` is clamped to the table length.
    pub fn insert_rule(&mut self, index: usize, rule: IntentRule) {
        let index = index.min(self.rules.len());
        self.rules.insert(index, rule);
    }

    /// Classify an utterance
    pub fn classify(&self, utterance: &str) -> Intent {
        self.classify_detailed(utterance).intent
    }

    /// Classify an utterance and report which rule fired
    pub fn classify_detailed(&self, utterance: &str) -> Classification {
        let normalized = normalize_utterance(utterance);

        let result = self
            .rules
            .iter()
            .enumerate()
            .find_map(|(index, rule)| {
                rule.find(&normalized).map(|matched| Classification {
                    intent: rule.intent,
                    rule_index: Some(index),
                    matched: Some(matched),
                })
            })
            .unwrap_or_else(Classification::unrecognized);

        tracing::debug!(
            intent = %result.intent,
            rule = ?result.rule_index,
            matched = ?result.matched,
            "Classified utterance"
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_each_intent_has_a_trigger() {
        let classifier = IntentClassifier::default();
        let cases = [
            ("hello there", Intent::Greeting),
            ("i want to book", Intent::BookingRequest),
            ("next tuesday", Intent::DayProvided),
            ("in the evening", Intent::TimeOrPeriodProvided),
            ("a beard trim", Intent::ServiceProvided),
            ("how much does it cost", Intent::PriceInquiry),
            ("where are you", Intent::LocationInquiry),
            ("i need to cancel", Intent::CancelOrReschedule),
            ("thanks a lot", Intent::Farewell),
            ("qqq", Intent::Unrecognized),
        ];

        for (utterance, expected) in cases {
            assert_eq!(classifier.classify(utterance), expected, "{utterance}");
        }
    }

    #[test]
    fn test_hello_is_always_greeting() {
        let classifier = IntentClassifier::default();
        for utterance in [
            "hello",
            "Hello, I want to book an appointment",
            "hello what is the price",
            "HELLO where are you located",
            "hello, thank you, bye",
        ] {
            assert_eq!(classifier.classify(utterance), Intent::Greeting, "{utterance}");
        }
    }

    #[test]
    fn test_earliest_rule_wins() {
        let classifier = IntentClassifier::default();

        let result = classifier.classify_detailed("book a haircut today");
        assert_eq!(result.intent, Intent::BookingRequest);
        assert_eq!(result.rule_index, Some(1));
        assert_eq!(result.matched.as_deref(), Some("book"));

        // day beats service
        assert_eq!(classifier.classify("haircut on monday"), Intent::DayProvided);
        // service beats price
        assert_eq!(classifier.classify("shave price"), Intent::ServiceProvided);
    }

    #[test]
    fn test_digits_mean_time() {
        let classifier = IntentClassifier::default();

        let result = classifier.classify_detailed("at 5 pm");
        assert_eq!(result.intent, Intent::TimeOrPeriodProvided);
        assert_eq!(result.matched.as_deref(), Some("5"));

        assert_eq!(classifier.classify("around 10:30"), Intent::TimeOrPeriodProvided);
    }

    #[test]
    fn test_substring_matching() {
        let classifier = IntentClassifier::default();
        // "hi" inside "this"
        assert_eq!(classifier.classify("is this open"), Intent::Greeting);
        // "color" inside "colour" does not match, "colored" does
        assert_eq!(classifier.classify("colour"), Intent::Unrecognized);
        assert_eq!(classifier.classify("colored streaks"), Intent::ServiceProvided);
    }

    #[test]
    fn test_case_and_whitespace_normalized() {
        assert_eq!(normalize_utterance("  Good   MORNING \n"), "good morning");

        let classifier = IntentClassifier::default();
        assert_eq!(classifier.classify("  CANCEL  "), Intent::CancelOrReschedule);
    }

    #[test]
    fn test_unrecognized_fallback() {
        let classifier = IntentClassifier::default();
        let result = classifier.classify_detailed("qqq");
        assert_eq!(result.intent, Intent::Unrecognized);
        assert_eq!(result.rule_index, None);
        assert_eq!(result.matched, None);

        assert_eq!(classifier.classify(""), Intent::Unrecognized);
    }

    #[test]
    fn test_classification_ignores_history() {
        let classifier = IntentClassifier::default();
        let first = classifier.classify("monday");
        classifier.classify("book appointment");
        assert_eq!(classifier.classify("monday"), first);
    }

    #[test]
    fn test_reordered_rules() {
        let mut classifier = IntentClassifier::default();
        classifier.insert_rule(0, IntentRule::keywords(Intent::ServiceProvided, &["haircut"]));

        assert_eq!(classifier.classify("book a haircut today"), Intent::ServiceProvided);
        assert_eq!(classifier.rules().len(), 10);
    }

    #[test]
    fn test_custom_predicate_rule() {
        fn shouted(text: &str) -> bool {
            text.ends_with("!!!")
        }

        let mut classifier = IntentClassifier::with_rules(Vec::new());
        classifier.push_rule(IntentRule::predicate(Intent::Farewell, shouted));

        assert_eq!(classifier.classify("enough!!!"), Intent::Farewell);
        assert_eq!(classifier.classify("hello"), Intent::Unrecognized);
    }

    #[test]
    fn test_standard_table_order() {
        let classifier = IntentClassifier::default();
        let order: Vec<Intent> = classifier.rules().iter().map(|r| r.intent).collect();
        assert_eq!(order, Intent::ALL[..9].to_vec());
    }

    #[test]
    fn test_intent_serde_name() {
        let json = serde_json::to_string(&Intent::CancelOrReschedule).unwrap();
        assert_eq!(json, "\"cancel_or_reschedule\"");
        assert_eq!(Intent::TimeOrPeriodProvided.to_string(), "time_or_period_provided");
    }
}
