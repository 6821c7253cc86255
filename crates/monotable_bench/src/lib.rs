//! Benchmark utilities.

#![deny(unsafe_code)]
#![warn(missing_docs)]

use monotable_codec::{Item, RecordCodec};
use monotable_testkit::fixtures::{sample_customer, Customer};

/// Generate `count` distinct customers spread over a few partitions.
pub fn generate_customers(count: usize) -> Vec<Customer> {
    (0..count)
        .map(|i| {
            let mut customer = sample_customer(&format!("bench-{i:06}"));
            customer.state = ["UT", "CA", "TX", "NY"][i % 4].to_string();
            customer.created_at = i as i64;
            customer.premium = i % 3 == 0;
            customer
        })
        .collect()
}

/// The item forms of [`generate_customers`].
pub fn generate_items(count: usize) -> Vec<Item> {
    generate_customers(count)
        .iter()
        .map(|customer| customer.to_item().expect("bench customer is valid"))
        .collect()
}
