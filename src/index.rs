//! Index access: segment readers, posting iterators and an in-memory index.

pub mod memory;
pub mod reader;

pub use memory::{MemoryIndex, MemoryIndexBuilder, MemorySegment};
pub use reader::{
    BasicPostingIterator, FieldStats, IndexReader, PostingIterator, ReaderTermInfo, TERMINATED,
};
