use chrono::NaiveDate;
use uuid::Uuid;

use super::{check_page_size, DEFAULT_PAGE_SIZE};
use crate::client::ApiClient;
use crate::error::ApiError;
use crate::pagination::PageShape;
use crate::params::{LifecycleState, Sort};
use crate::request::RequestBuilder;
use crate::types::Transaction;

pub const TRANSACTIONS_MAX_PAGE_SIZE: u32 = 50;

#[derive(Debug, Clone)]
pub struct TransactionSearch {
    pub lifecycle_states: Vec<LifecycleState>,
    /// Only transactions closed on or after this date.
    pub closed_after: Option<NaiveDate>,
    pub sort: Option<Sort>,
    pub page_size: u32,
}

impl Default for TransactionSearch {
    fn default() -> Self {
        Self {
            lifecycle_states: Vec::new(),
            closed_after: None,
            sort: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TransactionsApi<'a> {
    client: &'a ApiClient,
}

impl<'a> TransactionsApi<'a> {
    pub(crate) fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub fn get_transaction(&self, transaction_id: Uuid) -> Result<Transaction, ApiError> {
        self.client.execute_json(
            &RequestBuilder::get("/api/v1/transactions/{transactionId}").path_arg(transaction_id),
        )
    }

    pub fn search_transactions(
        &self,
        search: &TransactionSearch,
    ) -> Result<impl Iterator<Item = Result<Transaction, ApiError>> + 'a, ApiError> {
        check_page_size("transactions", search.page_size, TRANSACTIONS_MAX_PAGE_SIZE)?;
        let request = RequestBuilder::get("/api/v1/transactions/search")
            .query("lifecycleState", &search.lifecycle_states)
            .query("closedAfter", &search.closed_after)
            .sort(search.sort.as_ref());
        self.client
            .paginate(request, search.page_size, PageShape::default())
    }

    /// Download the transaction summary as a PDF.
    pub fn download_pdf(&self, transaction_id: Uuid) -> Result<Vec<u8>, ApiError> {
        self.client.execute_bytes(
            &RequestBuilder::get("/api/v1/transactions/{transactionId}/pdf")
                .path_arg(transaction_id)
                .header("Accept", "application/pdf"),
        )
    }
}
