// Session-scoped dataset cache.
//
// Each file is read at most once per `DatasetCache`; the cache is owned by
// the caller and handed to the pages, so its lifetime is the session's.
use crate::error::Result;
use crate::loader::{self, LoadReport};
use crate::types::{OrdersDataset, ReviewsDataset};
use once_cell::unsync::OnceCell;
use std::path::PathBuf;
use tracing::debug;

pub struct DatasetCache {
    orders_path: PathBuf,
    reviews_path: PathBuf,
    orders: OnceCell<(OrdersDataset, LoadReport)>,
    reviews: OnceCell<(ReviewsDataset, LoadReport)>,
}

impl DatasetCache {
    pub fn new(orders_path: PathBuf, reviews_path: PathBuf) -> Self {
        DatasetCache {
            orders_path,
            reviews_path,
            orders: OnceCell::new(),
            reviews: OnceCell::new(),
        }
    }

    /// Orders dataset, loading it on first use. A failed load is not cached,
    /// so fixing the file and retrying works within the same session.
    pub fn orders(&self) -> Result<&(OrdersDataset, LoadReport)> {
        if self.orders.get().is_some() {
            debug!("orders served from cache");
        }
        self.orders
            .get_or_try_init(|| loader::load_orders(&self.orders_path))
    }

    pub fn reviews(&self) -> Result<&(ReviewsDataset, LoadReport)> {
        if self.reviews.get().is_some() {
            debug!("reviews served from cache");
        }
        self.reviews
            .get_or_try_init(|| loader::load_reviews(&self.reviews_path))
    }
}
