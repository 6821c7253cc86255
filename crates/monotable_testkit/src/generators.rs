//! Property-based test generators using proptest.
//!
//! Strategies deliberately draw from small value pools so generated
//! customers collide on partitions and sort prefixes, which is where the
//! planner and pagination properties get interesting.

use proptest::prelude::*;

use crate::fixtures::Customer;

/// Strategy for customer ids.
pub fn customer_id_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z0-9]{4,12}").expect("invalid regex")
}

/// Strategy for countries, drawn from a small pool.
pub fn country_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["USA", "CAN", "MEX"]).prop_map(str::to_string)
}

/// Strategy for states, drawn from a small pool.
pub fn state_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["UT", "CA", "TX", "NY"]).prop_map(str::to_string)
}

/// Strategy for whole customers.
pub fn customer_strategy() -> impl Strategy<Value = Customer> {
    (
        customer_id_strategy(),
        country_strategy(),
        state_strategy(),
        0i64..100_000,
        prop::string::string_regex("[a-z]{2,8}").expect("invalid regex"),
        prop::string::string_regex("[a-z]{2,8}").expect("invalid regex"),
        prop::option::of(prop::string::string_regex("[a-z]{2,8}@example\\.com").unwrap()),
        any::<bool>(),
    )
        .prop_map(
            |(id, country, state, created_at, first_name, last_name, email, premium)| Customer {
                id,
                country,
                state,
                created_at,
                first_name,
                last_name,
                email,
                premium,
            },
        )
}

/// Strategy for page sizes worth exercising.
pub fn page_size_strategy() -> impl Strategy<Value = u32> {
    1u32..=10
}
