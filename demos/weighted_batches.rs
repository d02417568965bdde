//! Weighted batching example
//!
//! This example implements [`WriteProfile`] directly to batch log records
//! by shard under a byte-weight budget instead of a statement count: small
//! records pack together, and a record bigger than the whole budget still
//! ships alone instead of wedging the stream.
//!
//! Usage:
//!   RUST_LOG=batchflow=trace cargo run --example weighted_batches

use batchflow::{GroupedBatcher, GroupingConfig, Result, SizeLimit, WriteProfile};

/// One log record headed for a shard.
#[derive(Debug)]
struct Record {
    shard: u8,
    line: String,
}

/// Batches records per shard under a byte budget.
struct ShardProfile;

impl WriteProfile for ShardProfile {
    type Item = Record;
    type Statement = Record;
    type Key = u8;
    type Unit = (u8, usize, usize); // (shard, record count, total bytes)

    fn bind(&mut self, item: Record) -> Result<Record> {
        Ok(item)
    }

    fn key(&self, statement: &Record) -> u8 {
        statement.shard
    }

    fn weight(&self, statement: &Record) -> usize {
        statement.line.len()
    }

    fn assemble(&mut self, statements: &mut Vec<Record>) -> Result<(u8, usize, usize)> {
        let shard = statements[0].shard;
        let count = statements.len();
        let bytes = statements.iter().map(|r| r.line.len()).sum();
        statements.clear();
        Ok((shard, count, bytes))
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let records = vec![
        Record { shard: 0, line: "short".into() },
        Record { shard: 0, line: "also short".into() },
        Record { shard: 1, line: "x".repeat(200) }, // oversized: ships alone
        Record { shard: 0, line: "one more".into() },
        Record { shard: 1, line: "tail".into() },
    ];

    let config = GroupingConfig::new()
        .with_max_open_groups(8)
        .with_size_limit(SizeLimit::Weight(64));

    let mut batcher = GroupedBatcher::new(config, ShardProfile, records)?;
    while batcher.has_next() {
        let (shard, count, bytes) = batcher.next_unit()?;
        println!("shard {shard}: {count} records, {bytes} bytes");
    }

    Ok(())
}
