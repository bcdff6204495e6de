//! Batch partitioner
//!
//! Splits a table into fixed-size, order-preserving batches. Batch `i`
//! holds records `[i*size, min((i+1)*size, len))`; the final batch may be
//! shorter and no batch is ever empty. Pure and deterministic, which is what
//! makes per-batch counts reproducible across runs.

use crate::models::{Batch, TableKind, ToolRecord};
use std::num::NonZeroUsize;

pub fn partition(table: TableKind, records: &[ToolRecord], size: NonZeroUsize) -> Vec<Batch<'_>> {
    records
        .chunks(size.get())
        .enumerate()
        .map(|(index, chunk)| Batch {
            index,
            table,
            offset: index * size.get(),
            records: chunk,
        })
        .collect()
}

/// Number of batches `partition` will produce
pub fn batch_count(len: usize, size: NonZeroUsize) -> usize {
    len.div_ceil(size.get())
}
