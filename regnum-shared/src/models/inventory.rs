/// Pharmaceutical inventory
///
/// An inventory item is a pharmaceutical joined with its category, its stock
/// level at a clinic and the supplier linked to it. Listing is scoped by the
/// caller's role: clinics see their own stock, suppliers see the drugs they
/// supply, everyone else sees all active pharmaceuticals.
///
/// Creating an item writes the pharmaceutical, its first stock level, the
/// optional supplier link and an audit row in one transaction.

use chrono::{Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::authorization::{require_organization, AuthzError};
use crate::auth::jwt::SessionClaims;
use crate::db::gateway::{decode_records, DataGateway, DbError, QueryDescriptor};
use crate::models::audit::{AuditAction, AuditEntry};
use crate::models::user::Role;

const LIST_INVENTORY: &str = r#"SELECT
    d.drug_id AS "id",
    d.drug_name AS "drugName",
    d.generic_name AS "genericName",
    pc.category_name AS "category",
    s.supplier_name AS "supplier",
    sl.current_stock AS "quantity",
    sl.min_threshold AS "reorderLevel",
    d.unit_price AS "unitPrice",
    DATE(sl.created_at) AS "lastUpdated",
    sl.stock_status AS "stockStatus",
    sl.expiry_date AS "expiryDate",
    d.rfid_tag AS "rfidTag"
FROM pharmaceuticals d
LEFT JOIN pharmaceutical_categories pc ON d.category_id = pc.category_id
LEFT JOIN stock_levels sl ON d.drug_id = sl.drug_id
LEFT JOIN supplier_drug_links sdl ON d.drug_id = sdl.drug_id
LEFT JOIN suppliers s ON sdl.supplier_id = s.supplier_id
WHERE d.is_active = TRUE"#;

const DRUG_SEQUENCE: &str = "currval(pg_get_serial_sequence('pharmaceuticals', 'drug_id'))";

/// Stock status recorded with each stock level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StockStatus {
    Low,
    Normal,
}

impl StockStatus {
    /// Low when a positive threshold is set and the quantity is at or below it
    pub fn classify(quantity: i64, min_threshold: i64) -> Self {
        if min_threshold > 0 && quantity <= min_threshold {
            StockStatus::Low
        } else {
            StockStatus::Normal
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StockStatus::Low => "Low",
            StockStatus::Normal => "Normal",
        }
    }
}

/// One row of the inventory listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub id: i64,
    pub drug_name: String,
    pub generic_name: Option<String>,
    pub category: Option<String>,
    pub supplier: Option<String>,
    /// None when the drug has no stock level yet
    pub quantity: Option<i64>,
    pub reorder_level: Option<i64>,
    pub unit_price: f64,
    pub last_updated: Option<NaiveDate>,
    pub stock_status: Option<StockStatus>,
    pub expiry_date: Option<NaiveDate>,
    pub rfid_tag: Option<String>,
}

/// Which inventory rows a caller may list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryScope {
    All,
    /// Stock held at this clinic
    Clinic(i64),
    /// Drugs linked to this supplier
    Supplier(i64),
}

impl InventoryScope {
    /// Derives the scope from verified claims
    ///
    /// # Errors
    ///
    /// Clinic and Supplier callers without an organization get
    /// `AuthzError::MissingOrganization` instead of an unfiltered listing.
    pub fn for_claims(claims: &SessionClaims) -> Result<Self, AuthzError> {
        match claims.role {
            Role::Clinic => Ok(InventoryScope::Clinic(require_organization(claims)?)),
            Role::Supplier => Ok(InventoryScope::Supplier(require_organization(claims)?)),
            _ => Ok(InventoryScope::All),
        }
    }

    /// Listing statement, ordered by drug name
    pub fn list_statement(&self) -> QueryDescriptor {
        let (filter, organization_id) = match self {
            InventoryScope::All => ("", None),
            InventoryScope::Clinic(id) => (" AND sl.clinic_id = $1", Some(*id)),
            InventoryScope::Supplier(id) => (" AND s.supplier_id = $1", Some(*id)),
        };

        let descriptor =
            QueryDescriptor::new(format!("{LIST_INVENTORY}{filter} ORDER BY d.drug_name ASC"));

        match organization_id {
            Some(id) => descriptor.bind(id),
            None => descriptor,
        }
    }
}

/// Lists inventory visible within `scope`
pub async fn list_inventory(
    db: &dyn DataGateway,
    scope: InventoryScope,
) -> Result<Vec<InventoryItem>, DbError> {
    let rows = db.query(&scope.list_statement()).await?;
    decode_records(rows)
}

/// Input for creating an inventory item
#[derive(Debug, Clone, PartialEq)]
pub struct NewInventoryItem {
    pub drug_name: String,
    pub generic_name: Option<String>,
    pub category_id: i64,
    pub unit_price: f64,
    pub box_price: Option<f64>,
    pub expiration_period_months: Option<i32>,
    pub unit_type: Option<String>,
    pub rfid_tag: Option<String>,
    pub quantity: i64,
    pub min_threshold: i64,
    pub supplier_id: Option<i64>,
    /// Clinic that holds the initial stock
    pub clinic_id: i64,
    /// User recorded in the audit log
    pub created_by: i64,
}

impl NewInventoryItem {
    /// Ordered statements for the creation transaction
    ///
    /// The first statement returns the new `drug_id`. Later statements refer
    /// to it through the `pharmaceuticals` sequence.
    pub fn statements(&self, today: NaiveDate) -> Vec<QueryDescriptor> {
        let status = StockStatus::classify(self.quantity, self.min_threshold);
        let mut statements = Vec::with_capacity(4);

        statements.push(
            QueryDescriptor::new(
                "INSERT INTO pharmaceuticals \
                 (drug_name, generic_name, category_id, unit_price, box_price, \
                  expiration_period_months, unit_type, rfid_tag) \
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
                 RETURNING drug_id",
            )
            .bind(self.drug_name.as_str())
            .bind(self.generic_name.as_deref())
            .bind(self.category_id)
            .bind(self.unit_price)
            .bind(self.box_price)
            .bind(self.expiration_period_months)
            .bind(self.unit_type.as_deref())
            .bind(self.rfid_tag.as_deref()),
        );

        statements.push(
            QueryDescriptor::new(format!(
                "INSERT INTO stock_levels \
                 (drug_id, clinic_id, date_id, current_stock, min_threshold, stock_status) \
                 VALUES ({DRUG_SEQUENCE}, $1, $2, $3, $4, $5)"
            ))
            .bind(self.clinic_id)
            .bind(date_id(today))
            .bind(self.quantity)
            .bind(self.min_threshold)
            .bind(status.as_str()),
        );

        if let Some(supplier_id) = self.supplier_id {
            statements.push(
                QueryDescriptor::new(format!(
                    "INSERT INTO supplier_drug_links (supplier_id, drug_id) VALUES ($1, {DRUG_SEQUENCE})"
                ))
                .bind(supplier_id),
            );
        }

        let audit = AuditEntry {
            user_id: Some(self.created_by),
            action: AuditAction::CreateInventoryItem,
            table_name: "pharmaceuticals",
            new_values: json!({
                "drugName": self.drug_name,
                "genericName": self.generic_name,
                "quantity": self.quantity,
                "unitPrice": self.unit_price,
                "clinicId": self.clinic_id,
            }),
        };
        statements.push(audit.insert_for_last_row("drug_id"));

        statements
    }

    /// Creates the item dated `today` and returns its `drug_id`
    pub async fn create_on(&self, db: &dyn DataGateway, today: NaiveDate) -> Result<i64, DbError> {
        let outcomes = db.transaction(&self.statements(today)).await?;

        outcomes
            .first()
            .and_then(|outcome| outcome.rows.first())
            .and_then(|row| row.get("drug_id"))
            .and_then(|id| id.as_i64())
            .ok_or(DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    /// Creates the item dated with the current UTC day
    pub async fn create(&self, db: &dyn DataGateway) -> Result<i64, DbError> {
        self.create_on(db, Utc::now().date_naive()).await
    }
}

/// `YYYYMMDD` key used by the stock level date dimension
pub fn date_id(day: NaiveDate) -> i32 {
    day.year() * 10_000 + day.month() as i32 * 100 + day.day() as i32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::gateway::SqlParam;

    fn claims(role: Role, organization_id: Option<i64>) -> SessionClaims {
        SessionClaims {
            user_id: 1,
            email: "caller@example.com".to_string(),
            role,
            organization_id,
            iat: 0,
            exp: i64::MAX,
        }
    }

    fn item(supplier_id: Option<i64>) -> NewInventoryItem {
        NewInventoryItem {
            drug_name: "Amoxicillin".to_string(),
            generic_name: Some("amoxicillin".to_string()),
            category_id: 3,
            unit_price: 0.45,
            box_price: Some(12.0),
            expiration_period_months: Some(24),
            unit_type: Some("capsule".to_string()),
            rfid_tag: None,
            quantity: 40,
            min_threshold: 50,
            supplier_id,
            clinic_id: 5,
            created_by: 2,
        }
    }

    #[test]
    fn test_stock_status_classification() {
        assert_eq!(StockStatus::classify(40, 50), StockStatus::Low);
        assert_eq!(StockStatus::classify(50, 50), StockStatus::Low);
        assert_eq!(StockStatus::classify(51, 50), StockStatus::Normal);
        assert_eq!(StockStatus::classify(0, 10), StockStatus::Low);
        assert_eq!(StockStatus::classify(0, 0), StockStatus::Normal);
    }

    #[test]
    fn test_scope_for_roles() {
        assert_eq!(
            InventoryScope::for_claims(&claims(Role::Clinic, Some(5))),
            Ok(InventoryScope::Clinic(5))
        );
        assert_eq!(
            InventoryScope::for_claims(&claims(Role::Supplier, Some(8))),
            Ok(InventoryScope::Supplier(8))
        );
        assert_eq!(
            InventoryScope::for_claims(&claims(Role::Pharmacist, None)),
            Ok(InventoryScope::All)
        );
        assert_eq!(
            InventoryScope::for_claims(&claims(Role::Admin, Some(1))),
            Ok(InventoryScope::All)
        );
    }

    #[test]
    fn test_scope_requires_organization() {
        assert_eq!(
            InventoryScope::for_claims(&claims(Role::Clinic, None)),
            Err(AuthzError::MissingOrganization)
        );
        assert_eq!(
            InventoryScope::for_claims(&claims(Role::Supplier, None)),
            Err(AuthzError::MissingOrganization)
        );
    }

    #[test]
    fn test_list_statement_filters() {
        let all = InventoryScope::All.list_statement();
        assert!(all.params.is_empty());
        assert!(!all.statement.contains("$1"));
        assert!(all.statement.ends_with("ORDER BY d.drug_name ASC"));

        let clinic = InventoryScope::Clinic(5).list_statement();
        assert!(clinic.statement.contains("sl.clinic_id = $1"));
        assert_eq!(clinic.params, vec![SqlParam::Int(Some(5))]);

        let supplier = InventoryScope::Supplier(8).list_statement();
        assert!(supplier.statement.contains("s.supplier_id = $1"));
        assert_eq!(supplier.params, vec![SqlParam::Int(Some(8))]);
    }

    #[test]
    fn test_inventory_item_decodes_listing_row() {
        let record = json!({
            "id": 7,
            "drugName": "Amoxicillin",
            "genericName": null,
            "category": "Antibiotics",
            "supplier": null,
            "quantity": 40,
            "reorderLevel": 50,
            "unitPrice": 0.45,
            "lastUpdated": "2024-03-01",
            "stockStatus": "Low",
            "expiryDate": null,
            "rfidTag": null
        })
        .as_object()
        .cloned()
        .unwrap();

        let items: Vec<InventoryItem> = decode_records(vec![record]).unwrap();
        assert_eq!(items[0].stock_status, Some(StockStatus::Low));
        assert_eq!(items[0].last_updated, NaiveDate::from_ymd_opt(2024, 3, 1));
    }

    #[test]
    fn test_date_id() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(date_id(day), 20240309);
    }

    #[test]
    fn test_creation_statements_with_supplier() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let statements = item(Some(8)).statements(day);

        assert_eq!(statements.len(), 4);
        assert!(statements[0].statement.contains("RETURNING drug_id"));
        assert_eq!(statements[0].params.len(), 8);
        assert_eq!(statements[0].params[7], SqlParam::Text(None));

        assert!(statements[1].statement.starts_with("INSERT INTO stock_levels"));
        assert_eq!(
            statements[1].params,
            vec![
                SqlParam::Int(Some(5)),
                SqlParam::Int(Some(20240309)),
                SqlParam::Int(Some(40)),
                SqlParam::Int(Some(50)),
                SqlParam::Text(Some("Low".to_string())),
            ]
        );

        assert!(statements[2].statement.starts_with("INSERT INTO supplier_drug_links"));
        assert!(statements[3].statement.starts_with("INSERT INTO audit_log"));
    }

    #[test]
    fn test_creation_statements_without_supplier() {
        let day = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        let statements = item(None).statements(day);

        assert_eq!(statements.len(), 3);
        assert!(statements
            .iter()
            .all(|s| !s.statement.contains("supplier_drug_links")));
    }
}
