pub mod ingest;
pub mod partitions;
pub mod query;

pub use ingest::{batch as ingest_batch, one as ingest_one, stream as ingest_stream};
pub use partitions::list as list_partitions;
pub use query::run as query;
