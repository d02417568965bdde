//! Basic usage example
//!
//! This example folds a stream of keyed write requests into grouped batches
//! using a closure-based profile: requests for the same table coalesce into
//! one outbound batch, at most four tables buffer at once, and at most eight
//! statements ride in one batch.
//!
//! Usage:
//!   RUST_LOG=batchflow=debug cargo run --example basic_usage

use batchflow::{profile_fn, GroupedBatcher, GroupingConfig, SizeLimit};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    // A day of writes: (table, row payload)
    let writes = vec![
        ("users", "alice"),
        ("users", "bob"),
        ("orders", "#1001"),
        ("users", "carol"),
        ("orders", "#1002"),
        ("events", "login"),
        ("events", "logout"),
        ("metrics", "cpu=42"),
        ("sessions", "s-9"), // fifth table: evicts the stalest group
    ];

    let profile = profile_fn(
        // bind: a raw request becomes an INSERT statement
        |(table, row): (&str, &str)| Ok((table, format!("INSERT INTO {table} VALUES ({row})"))),
        // key: statements group by table
        |statement: &(&str, String)| statement.0,
        // assemble: a finished group becomes one wire-level batch
        |statements: &mut Vec<(&str, String)>| {
            let body: Vec<String> = statements.drain(..).map(|(_, sql)| sql).collect();
            Ok(format!("BEGIN BATCH\n  {}\nAPPLY BATCH", body.join("\n  ")))
        },
    );

    let config = GroupingConfig::new()
        .with_max_open_groups(4)
        .with_size_limit(SizeLimit::Statements(8));

    let mut batcher = GroupedBatcher::new(config, profile, writes)?;
    while batcher.has_next() {
        println!("{}\n", batcher.next_unit()?);
    }

    let stats = batcher.stats();
    println!(
        "bound {} statements into {} batches ({} capacity evictions)",
        stats.statements_bound, stats.units_emitted, stats.capacity_evictions
    );

    Ok(())
}
