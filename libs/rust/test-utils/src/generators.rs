//! Shared proptest generators.

use proptest::prelude::*;
use std::time::Duration;

/// Generate plausible email addresses.
pub fn email_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9._-]{0,15}@[a-z][a-z0-9-]{1,10}\\.[a-z]{2,4}"
}

/// Generate a set of distinct email addresses.
pub fn distinct_emails_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::hash_set(email_strategy(), 1..=max).prop_map(|set| set.into_iter().collect())
}

/// Generate account secrets, including non-ASCII ones.
pub fn secret_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[A-Za-z0-9!@#$%^&*]{1,32}",
        "\\PC{1,16}",
    ]
}

/// Generate post bodies within the length limit.
pub fn post_body_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .,!?']{0,140}"
}

/// Generate bodies built from words, some of them banned.
pub fn worded_body_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(
        prop_oneof![
            3 => "[a-z]{1,8}",
            1 => prop::sample::select(vec!["kerfuffle", "Sharbert", "FORNAX"])
                .prop_map(String::from),
        ],
        1..12,
    )
}

/// Generate positive account ids.
pub fn account_id_strategy() -> impl Strategy<Value = u64> {
    1u64..1_000_000
}

/// Generate TTL values (1 minute to 24 hours).
pub fn ttl_strategy() -> impl Strategy<Value = Duration> {
    (60u64..86400).prop_map(Duration::from_secs)
}

/// Generate unix timestamps between 2001 and 2100.
pub fn unix_time_strategy() -> impl Strategy<Value = i64> {
    1_000_000_000i64..4_100_000_000
}

/// Generate `Authorization` header values with no space separator.
pub fn malformed_header_strategy() -> impl Strategy<Value = String> {
    "[A-Za-z0-9._-]{0,64}"
}
