/// Inventory endpoints
///
/// - `GET /api/inventory` - List active pharmaceuticals visible to the caller
/// - `POST /api/inventory` - Create a pharmaceutical with its first stock level
///
/// Clinic callers only see stock held at their clinic and supplier callers
/// only see drugs linked to them. A Clinic or Supplier session without an
/// organization is refused rather than shown everything.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use regnum_shared::{
    auth::{
        authorization::{require_organization_access, require_role, AuthzError},
        jwt::SessionClaims,
    },
    models::{
        inventory::{self, InventoryItem, InventoryScope, NewInventoryItem},
        user::Role,
    },
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Roles allowed to create inventory items
pub const INVENTORY_WRITERS: [Role; 4] = [Role::Admin, Role::Supplier, Role::Pharmacist, Role::Clinic];

/// Inventory listing response
#[derive(Debug, Serialize, Deserialize)]
pub struct InventoryListResponse {
    pub success: bool,
    pub data: Vec<InventoryItem>,
}

/// Create inventory item request
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateInventoryRequest {
    #[validate(length(min = 1, max = 255, message = "Drug name is required"))]
    pub drug_name: String,

    #[validate(length(max = 255, message = "Generic name must be at most 255 characters"))]
    pub generic_name: Option<String>,

    #[validate(range(min = 1, message = "Category is required"))]
    pub category_id: i64,

    #[validate(range(exclusive_min = 0.0, message = "Unit price must be greater than zero"))]
    pub unit_price: f64,

    #[validate(range(min = 0.0, message = "Box price must not be negative"))]
    pub box_price: Option<f64>,

    #[validate(range(min = 0, message = "Expiration period must not be negative"))]
    pub expiration_period_months: Option<i32>,

    #[validate(length(max = 64, message = "Unit type must be at most 64 characters"))]
    pub unit_type: Option<String>,

    #[validate(length(max = 128, message = "RFID tag must be at most 128 characters"))]
    pub rfid_tag: Option<String>,

    /// Initial stock, 0 when omitted
    #[validate(range(min = 0, message = "Quantity must not be negative"))]
    pub quantity: Option<i64>,

    /// Reorder level, 0 when omitted
    #[validate(range(min = 0, message = "Minimum threshold must not be negative"))]
    pub min_threshold: Option<i64>,

    /// Supplier to link the drug to
    pub supplier_id: Option<i64>,

    /// Clinic holding the stock; defaults to the caller's organization
    pub clinic_id: Option<i64>,
}

/// Identifier of a created item
#[derive(Debug, Serialize, Deserialize)]
pub struct CreatedItem {
    pub id: i64,
}

/// Create inventory item response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateInventoryResponse {
    pub success: bool,
    pub message: String,
    pub data: CreatedItem,
}

/// List inventory visible to the caller
///
/// # Errors
///
/// - `401 Unauthorized`: Missing or invalid token
/// - `403 Forbidden`: Clinic or Supplier session without an organization
pub async fn list_inventory(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
) -> ApiResult<Json<InventoryListResponse>> {
    let scope = InventoryScope::for_claims(&claims)?;

    let items = inventory::list_inventory(state.db.as_ref(), scope).await?;

    tracing::debug!(
        user_id = claims.user_id,
        scope = ?scope,
        items = items.len(),
        "Inventory listed"
    );

    Ok(Json(InventoryListResponse {
        success: true,
        data: items,
    }))
}

/// Create an inventory item
///
/// ```text
/// POST /api/inventory
/// Authorization: Bearer <token>
/// Content-Type: application/json
///
/// {
///   "drugName": "Amoxicillin",
///   "categoryId": 3,
///   "unitPrice": 0.45,
///   "quantity": 40,
///   "minThreshold": 50,
///   "supplierId": 8
/// }
/// ```
///
/// The pharmaceutical, its stock level, the optional supplier link and the
/// audit row are written in one transaction.
///
/// # Errors
///
/// - `403 Forbidden`: Role not allowed, or the clinic belongs to another
///   organization
/// - `422 Unprocessable Entity`: Field validation failed
/// - `400 Bad Request`: Unknown category, supplier or clinic
pub async fn create_inventory_item(
    State(state): State<AppState>,
    Extension(claims): Extension<SessionClaims>,
    Json(req): Json<CreateInventoryRequest>,
) -> ApiResult<(StatusCode, Json<CreateInventoryResponse>)> {
    require_role(&claims, &INVENTORY_WRITERS)?;
    req.validate()?;

    let clinic_id = req
        .clinic_id
        .or(claims.organization_id)
        .ok_or(AuthzError::MissingOrganization)?;
    require_organization_access(&claims, Some(clinic_id))?;

    let drug_name = req.drug_name.trim().to_string();
    if drug_name.is_empty() {
        return Err(ApiError::ValidationError(vec![
            ValidationErrorDetail::new("drug_name", "Drug name is required"),
        ]));
    }

    let item = NewInventoryItem {
        drug_name,
        generic_name: req.generic_name,
        category_id: req.category_id,
        unit_price: req.unit_price,
        box_price: req.box_price,
        expiration_period_months: req.expiration_period_months,
        unit_type: req.unit_type,
        rfid_tag: req.rfid_tag,
        quantity: req.quantity.unwrap_or(0),
        min_threshold: req.min_threshold.unwrap_or(0),
        supplier_id: req.supplier_id,
        clinic_id,
        created_by: claims.user_id,
    };

    let drug_id = item.create(state.db.as_ref()).await?;

    tracing::info!(
        user_id = claims.user_id,
        drug_id,
        clinic_id,
        "Inventory item created"
    );

    Ok((
        StatusCode::CREATED,
        Json(CreateInventoryResponse {
            success: true,
            message: "Inventory item created successfully".to_string(),
            data: CreatedItem { id: drug_id },
        }),
    ))
}
