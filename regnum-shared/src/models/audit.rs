/// Audit log entries
///
/// Audit rows are appended inside the same transaction as the change they
/// describe. `new_values` must never contain secrets such as password hashes.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE audit_log (
///     audit_id BIGSERIAL PRIMARY KEY,
///     user_id BIGINT REFERENCES users (user_id),
///     action VARCHAR(64) NOT NULL,
///     table_name VARCHAR(64) NOT NULL,
///     record_id BIGINT,
///     new_values JSONB,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use serde_json::Value;

use crate::db::gateway::QueryDescriptor;

/// Audited action kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    UserRegistration,
    CreateInventoryItem,
}

impl AuditAction {
    /// Value stored in the `action` column
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::UserRegistration => "USER_REGISTRATION",
            AuditAction::CreateInventoryItem => "CREATE_INVENTORY_ITEM",
        }
    }
}

/// An audit row waiting to be written
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEntry {
    /// Acting user, if known
    pub user_id: Option<i64>,

    /// What happened
    pub action: AuditAction,

    /// Table the change landed in
    pub table_name: &'static str,

    /// Non-secret snapshot of the new values
    pub new_values: Value,
}

impl AuditEntry {
    /// Insert statement referencing the row most recently inserted into
    /// `table_name` on the same connection
    ///
    /// Only meaningful inside a transaction, after the insert it refers to.
    pub fn insert_for_last_row(&self, id_column: &str) -> QueryDescriptor {
        QueryDescriptor::new(format!(
            "INSERT INTO audit_log (user_id, action, table_name, record_id, new_values) \
             VALUES ($1, $2, $3, currval(pg_get_serial_sequence('{table}', '{column}')), $4)",
            table = self.table_name,
            column = id_column,
        ))
        .bind(self.user_id)
        .bind(self.action.as_str())
        .bind(self.table_name)
        .bind(self.new_values.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::gateway::SqlParam;
    use serde_json::json;

    fn entry() -> AuditEntry {
        AuditEntry {
            user_id: Some(2),
            action: AuditAction::CreateInventoryItem,
            table_name: "pharmaceuticals",
            new_values: json!({ "drugName": "Amoxicillin" }),
        }
    }

    #[test]
    fn test_action_names() {
        assert_eq!(AuditAction::UserRegistration.as_str(), "USER_REGISTRATION");
        assert_eq!(AuditAction::CreateInventoryItem.as_str(), "CREATE_INVENTORY_ITEM");
    }

    #[test]
    fn test_insert_for_last_row_uses_sequence() {
        let descriptor = entry().insert_for_last_row("drug_id");

        assert!(descriptor
            .statement
            .contains("currval(pg_get_serial_sequence('pharmaceuticals', 'drug_id'))"));
        assert_eq!(
            descriptor.params,
            vec![
                SqlParam::Int(Some(2)),
                SqlParam::Text(Some("CREATE_INVENTORY_ITEM".to_string())),
                SqlParam::Text(Some("pharmaceuticals".to_string())),
                SqlParam::Json(Some(json!({ "drugName": "Amoxicillin" }))),
            ]
        );
    }
}
