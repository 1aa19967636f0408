//! In-memory stand-in for the product lifecycle API.
//!
//! Products own their catalog entry, pricing plans, support configuration,
//! support change requests and approval requests. Catalog and support are
//! kept as loose JSON objects and PATCH merges top-level keys, which is all
//! the client tests need. Errors use the `{"errors":[{code,message}]}` shape.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub product_name: String,
    pub tax_assessment: String,
    pub product_type: String,
    pub material_agreement: bool,
    pub state: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProduct {
    pub product_name: String,
    pub tax_assessment: String,
    pub product_type: String,
    #[serde(default)]
    pub material_agreement: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProduct {
    pub product_name: Option<String>,
    pub tax_assessment: Option<String>,
    pub material_agreement: Option<bool>,
}

#[derive(Deserialize)]
pub struct Reason {
    pub reason: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Plan {
    pub id: Uuid,
    pub product_id: Uuid,
    pub description: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Deserialize)]
pub struct CreatePlan {
    pub description: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Deserialize)]
pub struct UpdatePlan {
    pub description: Option<String>,
    pub label: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequest {
    pub id: Uuid,
    pub product_id: Uuid,
    pub state: String,
    pub change: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct ChangeBody {
    pub change: Map<String, Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: Uuid,
    pub change_request_id: Uuid,
    pub state: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub id: Uuid,
    pub product_id: Uuid,
    pub kind: String,
    pub state: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub label: String,
    pub description: String,
    pub learn_more_link: String,
}

struct ProductRecord {
    product: Product,
    catalog: Map<String, Value>,
    plans: Vec<Plan>,
    support: Map<String, Value>,
    changes: Vec<ChangeRequest>,
    reviews: Vec<Review>,
    approvals: Vec<Approval>,
}

impl ProductRecord {
    fn new(product: Product) -> Self {
        Self {
            product,
            catalog: Map::new(),
            plans: Vec::new(),
            support: Map::new(),
            changes: Vec::new(),
            reviews: Vec::new(),
            approvals: Vec::new(),
        }
    }
}

pub struct AppState {
    products: RwLock<HashMap<Uuid, ProductRecord>>,
    badges: Vec<Badge>,
}

pub type Db = Arc<AppState>;

/// Error response in the API's `errors` envelope.
#[derive(Debug)]
pub struct Failure {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl Failure {
    fn not_found(what: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            code: "not_found",
            message: format!("{what} not found"),
        }
    }

    fn conflict(message: String) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            code: "invalid_state",
            message,
        }
    }
}

impl IntoResponse for Failure {
    fn into_response(self) -> Response {
        let body = json!({
            "errors": [{"code": self.code, "message": self.message}],
            "status_code": self.status.as_u16(),
        });
        (self.status, Json(body)).into_response()
    }
}

fn seed_badges() -> Vec<Badge> {
    vec![
        Badge {
            id: "7a4b3c2d-0000-4000-8000-000000000001".to_string(),
            label: "IBM Cloud Satellite".to_string(),
            description: "Runs on IBM Cloud Satellite locations".to_string(),
            learn_more_link: "https://cloud.ibm.com/docs/satellite".to_string(),
        },
        Badge {
            id: "7a4b3c2d-0000-4000-8000-000000000002".to_string(),
            label: "Security and Compliance".to_string(),
            description: "Validated against the financial services controls".to_string(),
            learn_more_link: "https://cloud.ibm.com/docs/security-compliance".to_string(),
        },
    ]
}

pub fn app() -> Router {
    let db: Db = Arc::new(AppState {
        products: RwLock::new(HashMap::new()),
        badges: seed_badges(),
    });
    Router::new()
        .route("/products", get(list_products).post(create_product))
        .route("/products/badges", get(list_badges))
        .route("/products/badges/{badge_id}", get(get_badge))
        .route(
            "/products/{product_id}",
            get(get_product).patch(update_product).delete(delete_product),
        )
        .route("/products/{product_id}/publish", post(publish_product))
        .route("/products/{product_id}/suspend", post(suspend_product))
        .route("/products/{product_id}/deprecate", post(deprecate_product))
        .route("/products/{product_id}/restore", post(restore_product))
        .route(
            "/products/{product_id}/approvals",
            get(list_approvals).post(request_product_approval),
        )
        .route("/products/{product_id}/catalog", get(get_catalog).patch(update_catalog))
        .route("/products/{product_id}/catalog/approvals", post(request_catalog_approval))
        .route("/products/{product_id}/plans", get(list_plans).post(create_plan))
        .route(
            "/products/{product_id}/plans/{plan_id}",
            get(get_plan).patch(update_plan).delete(delete_plan),
        )
        .route("/products/{product_id}/support", get(get_support).patch(update_support))
        .route("/products/{product_id}/support/approvals", post(request_support_approval))
        .route(
            "/products/{product_id}/support/changes",
            get(list_changes).post(create_change),
        )
        .route(
            "/products/{product_id}/support/changes/{change_id}",
            get(get_change).patch(update_change),
        )
        .route(
            "/products/{product_id}/support/changes/{change_id}/reviews",
            get(list_reviews).post(request_review),
        )
        .route(
            "/products/{product_id}/support/changes/{change_id}/merge",
            post(merge_change),
        )
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

type Reply<T> = Result<Json<T>, Failure>;

// --- products ---

async fn list_products(State(db): State<Db>) -> Json<Value> {
    let products = db.products.read().await;
    let list: Vec<&Product> = products.values().map(|r| &r.product).collect();
    Json(json!({ "products": list }))
}

async fn create_product(
    State(db): State<Db>,
    Json(input): Json<CreateProduct>,
) -> (StatusCode, Json<Product>) {
    let product = Product {
        id: Uuid::new_v4(),
        product_name: input.product_name,
        tax_assessment: input.tax_assessment,
        product_type: input.product_type,
        material_agreement: input.material_agreement,
        state: "draft".to_string(),
    };
    info!(id = %product.id, "product created");
    db.products
        .write()
        .await
        .insert(product.id, ProductRecord::new(product.clone()));
    (StatusCode::CREATED, Json(product))
}

async fn get_product(State(db): State<Db>, Path(id): Path<Uuid>) -> Reply<Product> {
    let products = db.products.read().await;
    let record = products.get(&id).ok_or_else(|| Failure::not_found("product"))?;
    Ok(Json(record.product.clone()))
}

async fn update_product(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<UpdateProduct>,
) -> Reply<Product> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let product = &mut record.product;
    if let Some(name) = input.product_name {
        product.product_name = name;
    }
    if let Some(tax) = input.tax_assessment {
        product.tax_assessment = tax;
    }
    if let Some(agreement) = input.material_agreement {
        product.material_agreement = agreement;
    }
    Ok(Json(product.clone()))
}

async fn delete_product(State(db): State<Db>, Path(id): Path<Uuid>) -> Result<StatusCode, Failure> {
    let mut products = db.products.write().await;
    products
        .remove(&id)
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or_else(|| Failure::not_found("product"))
}

/// Move a product to `to` if its current state is one of `from`.
async fn transition(db: &Db, id: Uuid, from: &[&str], to: &str, reason: Option<&str>) -> Reply<Product> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let product = &mut record.product;
    if !from.contains(&product.state.as_str()) {
        return Err(Failure::conflict(format!(
            "cannot move product from {} to {to}",
            product.state
        )));
    }
    debug!(%id, from = %product.state, to, ?reason, "product state change");
    product.state = to.to_string();
    Ok(Json(product.clone()))
}

async fn publish_product(State(db): State<Db>, Path(id): Path<Uuid>) -> Reply<Product> {
    transition(&db, id, &["draft"], "published", None).await
}

async fn suspend_product(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<Reason>,
) -> Reply<Product> {
    transition(&db, id, &["published"], "suspended", Some(&input.reason)).await
}

async fn deprecate_product(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<Reason>,
) -> Reply<Product> {
    transition(&db, id, &["published", "suspended"], "deprecated", Some(&input.reason)).await
}

async fn restore_product(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<Reason>,
) -> Reply<Product> {
    transition(&db, id, &["suspended", "deprecated"], "published", Some(&input.reason)).await
}

// --- badges ---

async fn list_badges(State(db): State<Db>) -> Json<Value> {
    Json(json!({ "badges": db.badges }))
}

async fn get_badge(State(db): State<Db>, Path(id): Path<String>) -> Reply<Badge> {
    db.badges
        .iter()
        .find(|b| b.id == id)
        .cloned()
        .map(Json)
        .ok_or_else(|| Failure::not_found("badge"))
}

// --- catalog ---

async fn get_catalog(State(db): State<Db>, Path(id): Path<Uuid>) -> Reply<Map<String, Value>> {
    let products = db.products.read().await;
    let record = products.get(&id).ok_or_else(|| Failure::not_found("product"))?;
    Ok(Json(record.catalog.clone()))
}

async fn update_catalog(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<Map<String, Value>>,
) -> Reply<Map<String, Value>> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    record.catalog.extend(input);
    Ok(Json(record.catalog.clone()))
}

// --- approvals ---

async fn add_approval(db: &Db, id: Uuid, kind: &str) -> Result<(StatusCode, Json<Approval>), Failure> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let approval = Approval {
        id: Uuid::new_v4(),
        product_id: id,
        kind: kind.to_string(),
        state: "requested".to_string(),
    };
    record.approvals.push(approval.clone());
    Ok((StatusCode::CREATED, Json(approval)))
}

async fn request_product_approval(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Approval>), Failure> {
    add_approval(&db, id, "product").await
}

async fn request_catalog_approval(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Approval>), Failure> {
    add_approval(&db, id, "catalog").await
}

async fn request_support_approval(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Approval>), Failure> {
    add_approval(&db, id, "support").await
}

async fn list_approvals(State(db): State<Db>, Path(id): Path<Uuid>) -> Reply<Value> {
    let products = db.products.read().await;
    let record = products.get(&id).ok_or_else(|| Failure::not_found("product"))?;
    Ok(Json(json!({ "approvals": record.approvals })))
}

// --- plans ---

async fn list_plans(State(db): State<Db>, Path(id): Path<Uuid>) -> Reply<Value> {
    let products = db.products.read().await;
    let record = products.get(&id).ok_or_else(|| Failure::not_found("product"))?;
    Ok(Json(json!({ "plans": record.plans })))
}

async fn create_plan(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<CreatePlan>,
) -> Result<(StatusCode, Json<Plan>), Failure> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let plan = Plan {
        id: Uuid::new_v4(),
        product_id: id,
        description: input.description,
        label: input.label,
        kind: input.kind,
        url: input.url,
    };
    record.plans.push(plan.clone());
    Ok((StatusCode::CREATED, Json(plan)))
}

async fn get_plan(State(db): State<Db>, Path((id, plan_id)): Path<(Uuid, Uuid)>) -> Reply<Plan> {
    let products = db.products.read().await;
    let record = products.get(&id).ok_or_else(|| Failure::not_found("product"))?;
    record
        .plans
        .iter()
        .find(|p| p.id == plan_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| Failure::not_found("pricing plan"))
}

async fn update_plan(
    State(db): State<Db>,
    Path((id, plan_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<UpdatePlan>,
) -> Reply<Plan> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let plan = record
        .plans
        .iter_mut()
        .find(|p| p.id == plan_id)
        .ok_or_else(|| Failure::not_found("pricing plan"))?;
    if let Some(description) = input.description {
        plan.description = description;
    }
    if let Some(label) = input.label {
        plan.label = label;
    }
    if let Some(kind) = input.kind {
        plan.kind = kind;
    }
    if let Some(url) = input.url {
        plan.url = url;
    }
    Ok(Json(plan.clone()))
}

async fn delete_plan(
    State(db): State<Db>,
    Path((id, plan_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, Failure> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let before = record.plans.len();
    record.plans.retain(|p| p.id != plan_id);
    if record.plans.len() == before {
        return Err(Failure::not_found("pricing plan"));
    }
    Ok(StatusCode::NO_CONTENT)
}

// --- support ---

async fn get_support(State(db): State<Db>, Path(id): Path<Uuid>) -> Reply<Map<String, Value>> {
    let products = db.products.read().await;
    let record = products.get(&id).ok_or_else(|| Failure::not_found("product"))?;
    Ok(Json(record.support.clone()))
}

async fn update_support(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<Map<String, Value>>,
) -> Reply<Map<String, Value>> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    record.support.extend(input);
    Ok(Json(record.support.clone()))
}

// --- support change requests ---

async fn list_changes(State(db): State<Db>, Path(id): Path<Uuid>) -> Reply<Value> {
    let products = db.products.read().await;
    let record = products.get(&id).ok_or_else(|| Failure::not_found("product"))?;
    Ok(Json(json!({ "changes": record.changes })))
}

async fn create_change(
    State(db): State<Db>,
    Path(id): Path<Uuid>,
    Json(input): Json<ChangeBody>,
) -> Result<(StatusCode, Json<ChangeRequest>), Failure> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let change = ChangeRequest {
        id: Uuid::new_v4(),
        product_id: id,
        state: "draft".to_string(),
        change: input.change,
    };
    record.changes.push(change.clone());
    Ok((StatusCode::CREATED, Json(change)))
}

fn find_change(record: &mut ProductRecord, change_id: Uuid) -> Result<&mut ChangeRequest, Failure> {
    record
        .changes
        .iter_mut()
        .find(|c| c.id == change_id)
        .ok_or_else(|| Failure::not_found("change request"))
}

async fn get_change(
    State(db): State<Db>,
    Path((id, change_id)): Path<(Uuid, Uuid)>,
) -> Reply<ChangeRequest> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    Ok(Json(find_change(record, change_id)?.clone()))
}

async fn update_change(
    State(db): State<Db>,
    Path((id, change_id)): Path<(Uuid, Uuid)>,
    Json(input): Json<ChangeBody>,
) -> Reply<ChangeRequest> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let change = find_change(record, change_id)?;
    if change.state == "merged" {
        return Err(Failure::conflict("change request already merged".to_string()));
    }
    change.change = input.change;
    Ok(Json(change.clone()))
}

async fn list_reviews(
    State(db): State<Db>,
    Path((id, change_id)): Path<(Uuid, Uuid)>,
) -> Reply<Value> {
    let products = db.products.read().await;
    let record = products.get(&id).ok_or_else(|| Failure::not_found("product"))?;
    if !record.changes.iter().any(|c| c.id == change_id) {
        return Err(Failure::not_found("change request"));
    }
    let reviews: Vec<&Review> = record
        .reviews
        .iter()
        .filter(|r| r.change_request_id == change_id)
        .collect();
    Ok(Json(json!({ "reviews": reviews })))
}

async fn request_review(
    State(db): State<Db>,
    Path((id, change_id)): Path<(Uuid, Uuid)>,
) -> Result<(StatusCode, Json<Review>), Failure> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let change = find_change(record, change_id)?;
    if change.state == "merged" {
        return Err(Failure::conflict("change request already merged".to_string()));
    }
    change.state = "in_review".to_string();
    let review = Review {
        id: Uuid::new_v4(),
        change_request_id: change_id,
        state: "requested".to_string(),
    };
    record.reviews.push(review.clone());
    Ok((StatusCode::CREATED, Json(review)))
}

async fn merge_change(
    State(db): State<Db>,
    Path((id, change_id)): Path<(Uuid, Uuid)>,
) -> Reply<ChangeRequest> {
    let mut products = db.products.write().await;
    let record = products.get_mut(&id).ok_or_else(|| Failure::not_found("product"))?;
    let change = find_change(record, change_id)?;
    if change.state == "merged" {
        return Err(Failure::conflict("change request already merged".to_string()));
    }
    change.state = "merged".to_string();
    let merged = change.clone();
    record.support.extend(merged.change.clone());
    info!(%id, change = %change_id, "support change merged");
    Ok(Json(merged))
}
