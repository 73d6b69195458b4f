use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::LedgerError;

/// Capability shared by every record stored as a document: it serializes to
/// and from a JSON document and can be validated before any network call.
///
/// The paginated search/decode logic in the storage adapter is written once
/// against this trait instead of per record type.
pub trait DocumentRecord: Serialize + DeserializeOwned + Send + Sync {
    /// Check field-level rules, reporting the first violated one.
    fn validate(&self) -> Result<(), LedgerError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountRecord {
    /// Store-assigned identifier, populated only on read. Never sent on
    /// write paths.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Caller-assigned business key, unique across accounts (enforced by the
    /// store's unique index).
    pub number: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub iban: String,
}

impl DocumentRecord for AccountRecord {
    fn validate(&self) -> Result<(), LedgerError> {
        if self.number.is_empty() {
            return Err(LedgerError::invalid_input("account number is empty"));
        }
        if self.name.is_empty() {
            return Err(LedgerError::invalid_input("account name is empty"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// References an account by its `number`. Not enforced as a foreign key;
    /// referential integrity is deliberately out of scope.
    pub account_number: String,
    /// Signed; the sign carries direction. Zero is invalid.
    pub amount: i64,
    /// Stored as the wire enum's string name.
    #[serde(rename = "type")]
    pub kind: String,
}

impl DocumentRecord for TransactionRecord {
    fn validate(&self) -> Result<(), LedgerError> {
        if self.account_number.is_empty() {
            return Err(LedgerError::invalid_input("account number is empty"));
        }
        if self.amount == 0 {
            return Err(LedgerError::invalid_input("amount is zero"));
        }
        if self.kind.is_empty() {
            return Err(LedgerError::invalid_input("transaction type is empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account(number: &str, name: &str) -> AccountRecord {
        AccountRecord {
            number: number.to_string(),
            name: name.to_string(),
            ..Default::default()
        }
    }

    fn transaction(account_number: &str, amount: i64, kind: &str) -> TransactionRecord {
        TransactionRecord {
            account_number: account_number.to_string(),
            amount,
            kind: kind.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn valid_account_passes() {
        assert!(account("ACC-1", "Alice").validate().is_ok());
    }

    #[test]
    fn account_requires_number_and_name() {
        assert!(matches!(
            account("", "Alice").validate(),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            account("ACC-1", "").validate(),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn first_violated_account_rule_wins() {
        let err = account("", "").validate().unwrap_err();
        assert_eq!(err.to_string(), "invalid input: account number is empty");
    }

    #[test]
    fn transaction_rejects_zero_amount() {
        assert!(matches!(
            transaction("ACC-1", 0, "DEPOSIT").validate(),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn transaction_allows_negative_amounts() {
        assert!(transaction("ACC-1", -250, "WITHDRAWAL").validate().is_ok());
    }

    #[test]
    fn transaction_requires_account_number_and_type() {
        assert!(matches!(
            transaction("", 100, "DEPOSIT").validate(),
            Err(LedgerError::InvalidInput(_))
        ));
        assert!(matches!(
            transaction("ACC-1", 100, "").validate(),
            Err(LedgerError::InvalidInput(_))
        ));
    }

    #[test]
    fn record_id_is_not_serialized_on_write() {
        let doc = serde_json::to_value(account("ACC-1", "Alice")).unwrap();
        assert!(doc.get("id").is_none());
    }

    #[test]
    fn transaction_kind_maps_to_type_field() {
        let doc = serde_json::to_value(transaction("ACC-1", 100, "DEPOSIT")).unwrap();
        assert_eq!(doc["type"], "DEPOSIT");
    }
}
