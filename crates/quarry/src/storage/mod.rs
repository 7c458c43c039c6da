//! Tiered persistence: bronze, silver, rejects, and gold partitions.

mod format;
mod layout;
#[cfg(feature = "parquet")]
mod parquet;
mod reader;
mod writer;

pub use format::{Column, PartitionFormat, PartitionRecord, PartitionRow};
pub use layout::{Layout, Tier, EMPTY_MARKER};
pub use reader::{read_partition, Partition};
pub use writer::{BronzeWriter, GoldPolicy, TierPaths, TierWriter};
