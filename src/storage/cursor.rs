//! Merge Cursor
//!
//! K-way merge over the memtable snapshot and every SSTable, yielding each
//! live key once in ascending byte order.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::memtable::{MemTableEntry, MemTableIterator};

use super::SSTableIterator;

/// One source of sorted entries
enum Source {
    Memory(MemTableIterator),
    Table(SSTableIterator),
}

impl Source {
    fn next(&mut self) -> Option<Result<(Vec<u8>, MemTableEntry)>> {
        match self {
            Source::Memory(it) => it.next().map(Ok),
            Source::Table(it) => it.next(),
        }
    }
}

/// Heap item ordered by (key, source rank); lower rank = newer
struct HeapItem {
    key: Vec<u8>,
    rank: usize,
    entry: MemTableEntry,
}

impl PartialEq for HeapItem {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && self.rank == other.rank
    }
}

impl Eq for HeapItem {}

impl PartialOrd for HeapItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for HeapItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.rank.cmp(&other.rank))
    }
}

/// Iterator over live `(key, value)` pairs across all engine layers
///
/// Sources are ranked newest first: the memtable snapshot, then SSTables
/// from newest to oldest. For duplicate keys only the newest version is
/// considered; a tombstone hides every older version. The first I/O error
/// ends iteration.
pub struct MergeCursor {
    sources: Vec<Source>,
    heap: BinaryHeap<Reverse<HeapItem>>,
    primed: bool,
    failed: bool,
}

impl MergeCursor {
    /// Build a cursor; `tables` must be ordered newest first
    pub fn new(memtable: MemTableIterator, tables: Vec<SSTableIterator>) -> Self {
        let mut sources = Vec::with_capacity(tables.len() + 1);
        sources.push(Source::Memory(memtable));
        sources.extend(tables.into_iter().map(Source::Table));
        Self {
            sources,
            heap: BinaryHeap::new(),
            primed: false,
            failed: false,
        }
    }

    /// Pull the next entry of `rank` into the heap
    fn advance(&mut self, rank: usize) -> Result<()> {
        if let Some(item) = self.sources[rank].next() {
            let (key, entry) = item?;
            self.heap.push(Reverse(HeapItem { key, rank, entry }));
        }
        Ok(())
    }

    fn prime(&mut self) -> Result<()> {
        for rank in 0..self.sources.len() {
            self.advance(rank)?;
        }
        self.primed = true;
        Ok(())
    }

    fn step(&mut self) -> Result<Option<(Vec<u8>, Vec<u8>)>> {
        if !self.primed {
            self.prime()?;
        }

        while let Some(Reverse(newest)) = self.heap.pop() {
            self.advance(newest.rank)?;

            // Drop older versions of the same key
            while let Some(Reverse(top)) = self.heap.peek() {
                if top.key != newest.key {
                    break;
                }
                let rank = top.rank;
                self.heap.pop();
                self.advance(rank)?;
            }

            match newest.entry {
                MemTableEntry::Value(value) => return Ok(Some((newest.key, value))),
                MemTableEntry::Tombstone => continue,
            }
        }

        Ok(None)
    }
}

impl Iterator for MergeCursor {
    type Item = Result<(Vec<u8>, Vec<u8>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        match self.step() {
            Ok(Some(pair)) => Some(Ok(pair)),
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}
