//! RPC service layer: the four wire operations, mapping adapter results and
//! errors onto the generated protobuf types.

use std::sync::Arc;

use tonic::{Request, Response, Status};

use crate::error::LedgerError;
use crate::models::{AccountRecord, TransactionRecord};
use crate::vault::VaultStorage;

pub mod pb {
    tonic::include_proto!("account_service");
}

use pb::account_service_server::AccountService;
pub use pb::account_service_server::AccountServiceServer;

pub struct LedgerService {
    storage: Arc<VaultStorage>,
}

impl LedgerService {
    pub fn new(storage: Arc<VaultStorage>) -> Self {
        Self { storage }
    }
}

/// Map adapter errors to client-facing status codes. Storage detail stays in
/// server logs; clients get an opaque internal error.
fn status_from(err: LedgerError) -> Status {
    match err {
        LedgerError::InvalidInput(message) => Status::invalid_argument(message),
        LedgerError::DuplicateKey => Status::already_exists("duplicate key"),
        LedgerError::NotImplemented(op) => Status::unimplemented(op),
        err @ LedgerError::Storage { .. } => {
            tracing::error!(error = %err, "storage failure");
            Status::internal("storage failure")
        }
    }
}

/// Reconstruct the wire enum from its stored string name. An unknown name
/// falls back to the zero-valued enumerant; the mismatch is logged so a
/// corrupt document does not fail the whole page silently.
fn transaction_type_by_name(name: &str, id: &str) -> pb::TransactionType {
    pb::TransactionType::from_str_name(name).unwrap_or_else(|| {
        tracing::warn!(stored = %name, document = %id, "unknown transaction type name");
        pb::TransactionType::Deposit
    })
}

#[tonic::async_trait]
impl AccountService for LedgerService {
    async fn list_accounts(
        &self,
        request: Request<pb::ListAccountsRequest>,
    ) -> Result<Response<pb::ListAccountsResponse>, Status> {
        let req = request.into_inner();
        // pagination inputs pass through unmodified; callers own their sanity
        let (accounts, total_count) = self
            .storage
            .list_accounts(req.page_size, req.page_number)
            .await
            .map_err(status_from)?;

        let accounts = accounts
            .into_iter()
            .map(|a| pb::Account {
                id: a.id,
                number: a.number,
                name: a.name,
                address: a.address,
                iban: a.iban,
            })
            .collect();

        Ok(Response::new(pb::ListAccountsResponse {
            page_size: req.page_size,
            page_number: req.page_number,
            total_count,
            accounts,
        }))
    }

    async fn list_transactions(
        &self,
        request: Request<pb::ListTransactionsRequest>,
    ) -> Result<Response<pb::ListTransactionsResponse>, Status> {
        let req = request.into_inner();
        let (transactions, total_count) = self
            .storage
            .list_transactions(&req.account_number, req.page_size, req.page_number)
            .await
            .map_err(status_from)?;

        let transactions = transactions
            .into_iter()
            .map(|t| {
                let kind = transaction_type_by_name(&t.kind, &t.id);
                pb::Transaction {
                    id: t.id,
                    account_number: t.account_number,
                    amount: t.amount,
                    r#type: kind as i32,
                }
            })
            .collect();

        Ok(Response::new(pb::ListTransactionsResponse {
            page_size: req.page_size,
            page_number: req.page_number,
            total_count,
            transactions,
        }))
    }

    async fn create_account(
        &self,
        request: Request<pb::Account>,
    ) -> Result<Response<pb::CreateAccountResponse>, Status> {
        let req = request.into_inner();
        let record = AccountRecord {
            id: String::new(),
            number: req.number,
            name: req.name,
            address: req.address,
            iban: req.iban,
        };

        match self.storage.add_account(record).await {
            Ok(id) => Ok(Response::new(pb::CreateAccountResponse { id })),
            Err(LedgerError::DuplicateKey) => {
                Err(Status::already_exists("account number already exists"))
            }
            Err(err) => Err(status_from(err)),
        }
    }

    async fn create_transaction(
        &self,
        request: Request<pb::Transaction>,
    ) -> Result<Response<pb::CreateTransactionResponse>, Status> {
        let req = request.into_inner();
        let kind = pb::TransactionType::try_from(req.r#type)
            .map_err(|_| Status::invalid_argument("unknown transaction type"))?;

        let record = TransactionRecord {
            id: String::new(),
            account_number: req.account_number,
            amount: req.amount,
            kind: kind.as_str_name().to_string(),
        };

        let id = self
            .storage
            .add_transaction(record)
            .await
            .map_err(status_from)?;
        Ok(Response::new(pb::CreateTransactionResponse { id }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transaction_type_round_trips_through_names() {
        for kind in [pb::TransactionType::Deposit, pb::TransactionType::Withdrawal] {
            assert_eq!(transaction_type_by_name(kind.as_str_name(), "doc-1"), kind);
        }
    }

    #[test]
    fn unknown_type_name_falls_back_to_the_zero_valued_enumerant() {
        assert_eq!(
            transaction_type_by_name("REFUND", "doc-1"),
            pb::TransactionType::Deposit
        );
    }

    #[test]
    fn status_mapping_hides_storage_detail() {
        let status = status_from(LedgerError::storage(
            "search",
            "accounts",
            "500 internal vault detail",
        ));
        assert_eq!(status.code(), tonic::Code::Internal);
        assert!(!status.message().contains("vault detail"));
    }

    #[test]
    fn status_mapping_keeps_client_errors_distinguishable() {
        assert_eq!(
            status_from(LedgerError::invalid_input("amount is zero")).code(),
            tonic::Code::InvalidArgument
        );
        assert_eq!(
            status_from(LedgerError::DuplicateKey).code(),
            tonic::Code::AlreadyExists
        );
        assert_eq!(
            status_from(LedgerError::NotImplemented("list")).code(),
            tonic::Code::Unimplemented
        );
    }
}
