//! Thin per-resource clients built on `ApiClient`.
//!
//! Each method only shapes a `RequestBuilder` and decodes the response;
//! retry, classification and pagination all come from the client. Maximum
//! page sizes differ between resource families, so each family carries its
//! own limit and oversized requests fail before any network call.

mod agents;
mod teams;
mod transactions;

pub use agents::{AgentSearch, AgentsApi, AGENTS_MAX_PAGE_SIZE};
pub use teams::{TeamSearch, TeamsApi, TEAMS_MAX_PAGE_SIZE};
pub use transactions::{TransactionSearch, TransactionsApi, TRANSACTIONS_MAX_PAGE_SIZE};

use crate::error::ApiError;

pub const DEFAULT_PAGE_SIZE: u32 = 20;

fn check_page_size(family: &str, page_size: u32, max: u32) -> Result<(), ApiError> {
    if page_size == 0 || page_size > max {
        return Err(ApiError::validation(format!(
            "{family} page size must be between 1 and {max}, got {page_size}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_bounds() {
        assert!(check_page_size("teams", 1, 100).is_ok());
        assert!(check_page_size("teams", 100, 100).is_ok());
        assert!(check_page_size("teams", 0, 100).is_err());
        let err = check_page_size("transactions", 51, 50).unwrap_err();
        assert!(err.message().contains("between 1 and 50"));
    }
}
