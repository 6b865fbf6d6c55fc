//! Closed word lists used by phrase simplification and normalization

/// Words that carry no meaning of their own inside a data/actor phrase
pub const TRIVIAL_WORDS: &[&str] = &[
    "some", "all", "any", "type", "variety", "category", "example", "more", "such", "other",
    "following", "additional", "certain", "similar", "limited", "various", "detailed", "further",
    "enough", "e.g.", "i.e.", "which", "that",
];

/// Generic data-type heads; a bare one of these is too common to be a term
pub const DATATYPE_KEYWORDS: &[&str] = &[
    "information", "data", "datum", "detail", "identifier", "id", "address", "number", "name",
    "record", "profile", "setting", "preference", "history", "content", "credential", "log",
    "file", "metadata", "signal", "characteristic", "attribute", "statistic", "type",
];

/// Generic actor heads; a bare one of these names no specific entity
pub const ACTOR_KEYWORDS: &[&str] = &[
    "advertiser", "affiliate", "agency", "analytic", "analytics", "app", "application", "broker",
    "business", "carrier", "company", "corporation", "developer", "distributor", "entity", "firm",
    "group", "network", "operator", "organization", "partner", "party", "platform", "processor",
    "provider", "publisher", "retailer", "service", "site", "software", "subsidiary", "vendor",
    "website",
];

/// Lemmas that mean "some unspecified data"
pub const UNSPECIFIC_DATA_LEMMAS: &[&str] = &["data", "datum", "information"];

pub fn is_trivial_word(lemma: &str) -> bool {
    TRIVIAL_WORDS.contains(&lemma)
}

pub fn is_datatype_keyword(term: &str) -> bool {
    DATATYPE_KEYWORDS.contains(&term)
}

pub fn is_actor_keyword(term: &str) -> bool {
    ACTOR_KEYWORDS.contains(&term)
}

pub fn is_unspecific_data(term: &str) -> bool {
    UNSPECIFIC_DATA_LEMMAS.contains(&term)
}
