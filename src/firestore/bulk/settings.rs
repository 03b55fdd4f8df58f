use crate::firestore::constants::MAX_BATCH_WRITES;
use crate::util::RetryPolicy;

pub const DEFAULT_EXPORT_PAGE_SIZE: u32 = 1_000;
pub const DEFAULT_EXPORT_CONCURRENCY: usize = 10;
pub const DEFAULT_COLLECTION_IDS_PAGE_SIZE: u32 = 300;
pub const DEFAULT_WRITE_CONCURRENCY: usize = 5;
pub const DEFAULT_DELETE_PAGE_SIZE: u32 = 1_000;

/// Tuning knobs shared by export, import and delete.
///
/// `batch_size` never exceeds [`MAX_BATCH_WRITES`], the most writes one
/// `batchWrite` call accepts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BulkSettings {
    pub export_page_size: u32,
    pub export_concurrency: usize,
    pub collection_ids_page_size: u32,
    pub batch_size: usize,
    pub write_concurrency: usize,
    pub delete_page_size: u32,
    pub retry: RetryPolicy,
}

impl Default for BulkSettings {
    fn default() -> Self {
        Self {
            export_page_size: DEFAULT_EXPORT_PAGE_SIZE,
            export_concurrency: DEFAULT_EXPORT_CONCURRENCY,
            collection_ids_page_size: DEFAULT_COLLECTION_IDS_PAGE_SIZE,
            batch_size: MAX_BATCH_WRITES,
            write_concurrency: DEFAULT_WRITE_CONCURRENCY,
            delete_page_size: DEFAULT_DELETE_PAGE_SIZE,
            retry: RetryPolicy::default(),
        }
    }
}

impl BulkSettings {
    pub fn with_export_page_size(mut self, page_size: u32) -> Self {
        self.export_page_size = page_size.max(1);
        self
    }

    pub fn with_export_concurrency(mut self, limit: usize) -> Self {
        self.export_concurrency = limit.max(1);
        self
    }

    pub fn with_collection_ids_page_size(mut self, page_size: u32) -> Self {
        self.collection_ids_page_size = page_size.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.clamp(1, MAX_BATCH_WRITES);
        self
    }

    pub fn with_write_concurrency(mut self, limit: usize) -> Self {
        self.write_concurrency = limit.max(1);
        self
    }

    pub fn with_delete_page_size(mut self, page_size: u32) -> Self {
        self.delete_page_size = page_size.max(1);
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
