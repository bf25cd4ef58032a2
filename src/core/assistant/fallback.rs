// Deterministic answers used whenever the completion API is unavailable, plus
// the contact-intent heuristic. Nothing in here touches the network.

use super::models::BusinessProfile;

/// Words in a question that suggest the user wants a person or a booking.
const CONTACT_INTENT_WORDS: &[&str] = &[
    "quote",
    "price",
    "cost",
    "estimate",
    "consultation",
    "appointment",
    "schedule",
    "book",
    "contact",
    "call",
    "phone",
    "visit",
    "come in",
    "get started",
    "interested",
    "sign up",
    "hire",
    "service",
    "when can",
    "available",
    "free time",
    "meet",
    "discuss",
];

/// Phrases in an answer that point the user at the phone or a consultation.
const CONTACT_ANSWER_PHRASES: &[&str] = &["call us", "consultation"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CannedTopic {
    Pricing,
    Hours,
    Warranty,
    Location,
    General,
}

/// Topic rules in priority order; the first rule with a matching keyword wins.
const TOPIC_RULES: &[(CannedTopic, &[&str])] = &[
    (CannedTopic::Pricing, &["price", "cost"]),
    (CannedTopic::Hours, &["hours", "open"]),
    (CannedTopic::Warranty, &["warranty"]),
    (CannedTopic::Location, &["location", "address"]),
];

pub fn classify_topic(question: &str) -> CannedTopic {
    let question = question.to_lowercase();
    TOPIC_RULES
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| question.contains(k)))
        .map(|(topic, _)| *topic)
        .unwrap_or(CannedTopic::General)
}

pub fn canned_answer(topic: CannedTopic, profile: &BusinessProfile) -> String {
    match topic {
        CannedTopic::Pricing => format!(
            "I'd be happy to help with pricing! Our window tinting rates vary based on your vehicle and film selection. Please call us at {} for a free consultation and quote.",
            profile.phone
        ),
        CannedTopic::Hours => format!(
            "We're open {}. You can reach us at {}.",
            profile.hours, profile.phone
        ),
        CannedTopic::Warranty => "We offer a 100% lifetime manufacturer's warranty with nation-wide coverage on all our premium tinting services. This covers any defects in materials or workmanship.".to_string(),
        CannedTopic::Location => format!(
            "We're located at {}. Feel free to call us at {} if you need directions!",
            profile.address, profile.phone
        ),
        CannedTopic::General => format!(
            "Thanks for your question! For the most accurate information about our services, please call us at {} or visit us at {}.",
            profile.phone, profile.address
        ),
    }
}

/// The canned answer for `question`.
pub fn fallback_answer(question: &str, profile: &BusinessProfile) -> String {
    canned_answer(classify_topic(question), profile)
}

/// Returned at the outer boundary when answering failed outright.
pub fn apology_answer(profile: &BusinessProfile) -> String {
    format!(
        "I apologize, but I'm having trouble processing your request right now. Please call us at {} for immediate assistance.",
        profile.phone
    )
}

/// True when the question or the produced answer suggests offering call/quote actions.
pub fn detect_contact_intent(question: &str, answer: &str) -> bool {
    let question = question.to_lowercase();
    let answer = answer.to_lowercase();

    CONTACT_INTENT_WORDS.iter().any(|w| question.contains(w))
        || CONTACT_ANSWER_PHRASES.iter().any(|p| answer.contains(p))
}
