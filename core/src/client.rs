//! Request builder and service client for the product lifecycle API.
//!
//! # Design
//! `build_request` interprets one row of the operation table against a
//! `Params` value and produces an `HttpRequest`; it is pure and
//! deterministic. `PartnerCenterSell` pairs it with a `Transport`: each
//! operation method validates, builds, and returns exactly what the transport
//! returns. The client keeps no state of its own between calls; the retry
//! toggle is forwarded to the transport it owns.

use serde_json::{Map, Value};
use tracing::debug;

use crate::config::{ServiceOptions, DEFAULT_SERVICE_NAME};
use crate::error::ApiError;
use crate::http::{DetailedResponse, HttpRequest};
use crate::operation::{Operation, OperationSpec};
use crate::params::Params;
use crate::transport::{HttpTransport, RetryPolicy, Transport};

const JSON: &str = "application/json";

/// Validate `params` against `spec` and assemble the request descriptor.
pub fn build_request(spec: &OperationSpec, params: &Params) -> Result<HttpRequest, ApiError> {
    let missing: Vec<String> = spec
        .required
        .iter()
        .filter(|name| !params.contains(name))
        .map(|name| name.to_string())
        .collect();
    if !missing.is_empty() {
        debug!(operation = spec.name, ?missing, "rejected before send");
        return Err(ApiError::MissingParameters(missing));
    }

    let path_params = spec
        .path_params
        .iter()
        .filter_map(|name| Some((name.to_string(), plain_text(params.get(name)?))))
        .collect();

    let query = spec
        .query
        .iter()
        .filter_map(|name| Some((name.to_string(), plain_text(params.get(name)?))))
        .collect();

    let body = spec.body.map(|fields| {
        let mut body = Map::new();
        for field in fields {
            if let Some(value) = params.get(field.local) {
                body.insert(field.wire.to_string(), value.clone());
            }
        }
        Value::Object(body)
    });

    let mut headers = vec![("Accept".to_string(), JSON.to_string())];
    if body.is_some() {
        headers.push(("Content-Type".to_string(), JSON.to_string()));
    }
    for (name, value) in params.headers() {
        let existing = headers.iter().position(|(k, _)| k.eq_ignore_ascii_case(name));
        match existing {
            Some(index) => headers[index] = (name.clone(), value.clone()),
            None => headers.push((name.clone(), value.clone())),
        }
    }

    let request = HttpRequest {
        operation: spec.name,
        method: spec.method,
        path: spec.path,
        path_params,
        query,
        headers,
        body,
    };
    debug!(operation = spec.name, method = %request.method, path = %request.render_path(), "built request");
    Ok(request)
}

/// Path and query values go out as bare text: strings verbatim, other
/// scalars in their JSON form, arrays comma separated.
fn plain_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(plain_text).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

/// Client for the partner center sell (product lifecycle) service.
#[derive(Debug, Clone)]
pub struct PartnerCenterSell<T = HttpTransport> {
    transport: T,
}

impl PartnerCenterSell<HttpTransport> {
    pub fn new(options: ServiceOptions) -> Result<Self, ApiError> {
        Ok(Self::with_transport(HttpTransport::new(options)?))
    }

    /// Configure from `PARTNER_CENTER_SELL_*` environment variables.
    pub fn from_env() -> Result<Self, ApiError> {
        Self::new(ServiceOptions::from_env(DEFAULT_SERVICE_NAME)?)
    }
}

impl<T: Transport> PartnerCenterSell<T> {
    pub fn with_transport(transport: T) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn enable_retries(&mut self, policy: RetryPolicy) {
        self.transport.enable_retries(policy);
    }

    pub fn disable_retries(&mut self) {
        self.transport.disable_retries();
    }

    /// Build the descriptor for `operation` without sending it.
    pub fn build(&self, operation: Operation, params: &Params) -> Result<HttpRequest, ApiError> {
        build_request(operation.spec(), params)
    }

    /// Build and send one request. Transport errors are returned untouched.
    pub async fn call(&self, operation: Operation, params: Params) -> Result<DetailedResponse, ApiError> {
        let request = self.build(operation, &params)?;
        self.transport.send(request).await
    }
}

macro_rules! operation_methods {
    ($($(#[$doc:meta])* $method:ident => $operation:ident;)*) => {
        impl<T: Transport> PartnerCenterSell<T> {
            $(
                $(#[$doc])*
                pub async fn $method(&self, params: Params) -> Result<DetailedResponse, ApiError> {
                    self.call(Operation::$operation, params).await
                }
            )*
        }
    };
}

operation_methods! {
    /// `GET /products`
    list_products => ListProducts;
    /// `POST /products`; requires `productName`, `taxAssessment`, `productType`.
    create_product => CreateProduct;
    get_product => GetProduct;
    update_product => UpdateProduct;
    delete_product => DeleteProduct;
    publish_product => PublishProduct;
    /// Requires `productId` and `reason`.
    suspend_product => SuspendProduct;
    /// Requires `productId` and `reason`.
    deprecate_product => DeprecateProduct;
    /// Requires `productId` and `reason`.
    restore_product => RestoreProduct;
    list_badges => ListBadges;
    get_badge => GetBadge;
    get_catalog => GetCatalog;
    update_catalog => UpdateCatalog;
    request_catalog_approval => RequestCatalogApproval;
    list_plans => ListPlans;
    /// Requires `productId`, `description`, `label`, `type` and `url`.
    create_plan => CreatePlan;
    get_plan => GetPlan;
    update_plan => UpdatePlan;
    delete_plan => DeletePlan;
    get_support => GetSupport;
    /// `supportDetails`, `supportEscalation` and `supportType` are sent as
    /// `support_details`, `support_escalation` and `support_type`.
    update_support => UpdateSupport;
    list_support_change_requests => ListSupportChangeRequests;
    create_support_change_request => CreateSupportChangeRequest;
    get_support_change_request => GetSupportChangeRequest;
    update_support_change_request => UpdateSupportChangeRequest;
    list_support_change_request_reviews => ListSupportChangeRequestReviews;
    request_support_change_request_review => RequestSupportChangeRequestReview;
    merge_support_change_request => MergeSupportChangeRequest;
    request_support_approval => RequestSupportApproval;
    request_product_approval => RequestProductApproval;
    list_product_approvals => ListProductApprovals;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::HttpMethod;
    use serde_json::json;

    fn product_id() -> &'static str {
        "9fab83da-98cb-4f18-a7ba-b6f0435c9673"
    }

    #[test]
    fn list_products_produces_correct_request() {
        let req = build_request(Operation::ListProducts.spec(), &Params::new()).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.render_path(), "/products");
        assert!(req.body.is_none());
        assert_eq!(
            req.headers,
            vec![("Accept".to_string(), "application/json".to_string())]
        );
    }

    #[test]
    fn create_product_produces_correct_request() {
        let params = Params::new()
            .set("productName", "testString")
            .set("taxAssessment", "SOFTWARE")
            .set("productType", "SOFTWARE")
            .set("materialAgreement", true);
        let req = build_request(Operation::CreateProduct.spec(), &params).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "/products");
        assert_eq!(req.header("Content-Type"), Some("application/json"));
        assert_eq!(
            req.body,
            Some(json!({
                "productName": "testString",
                "taxAssessment": "SOFTWARE",
                "productType": "SOFTWARE",
                "materialAgreement": true
            }))
        );
    }

    #[test]
    fn missing_parameters_are_listed_in_table_order() {
        let params = Params::new().set("productName", "x");
        let err = build_request(Operation::CreateProduct.spec(), &params).unwrap_err();
        match err {
            ApiError::MissingParameters(names) => {
                assert_eq!(names, vec!["taxAssessment", "productType"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn null_required_parameter_is_missing() {
        let params = Params::new().set("productId", Value::Null);
        let err = build_request(Operation::GetProduct.spec(), &params).unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameters: productId");
    }

    #[test]
    fn absent_body_fields_are_omitted() {
        let params = Params::new()
            .set("productId", product_id())
            .set("productName", "renamed")
            .set("taxAssessment", Value::Null);
        let req = build_request(Operation::UpdateProduct.spec(), &params).unwrap();
        assert_eq!(req.body, Some(json!({"productName": "renamed"})));
        assert_eq!(req.path_param("productId"), Some(product_id()));
    }

    #[test]
    fn body_operation_without_fields_still_sends_object() {
        let params = Params::new().set("productId", product_id());
        let req = build_request(Operation::UpdateCatalog.spec(), &params).unwrap();
        assert_eq!(req.body, Some(json!({})));
        assert_eq!(req.header("Content-Type"), Some("application/json"));
    }

    #[test]
    fn params_outside_the_body_map_are_not_sent() {
        let params = Params::new()
            .set("productId", product_id())
            .set("reason", "eol")
            .set("unrelated", 1);
        let req = build_request(Operation::DeprecateProduct.spec(), &params).unwrap();
        assert_eq!(req.body, Some(json!({"reason": "eol"})));
    }

    #[test]
    fn post_without_body_omits_content_type() {
        let params = Params::new().set("productId", product_id());
        let req = build_request(Operation::PublishProduct.spec(), &params).unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert!(req.body.is_none());
        assert_eq!(req.header("Content-Type"), None);
    }

    #[test]
    fn caller_headers_override_defaults_in_place() {
        let params = Params::new()
            .set("productId", product_id())
            .set("reason", "r")
            .header("accept", "fake/accept")
            .header("Content-Type", "fake/contentType")
            .header("X-Correlation-Id", "abc");
        let req = build_request(Operation::SuspendProduct.spec(), &params).unwrap();
        assert_eq!(
            req.headers,
            vec![
                ("accept".to_string(), "fake/accept".to_string()),
                ("Content-Type".to_string(), "fake/contentType".to_string()),
                ("X-Correlation-Id".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn non_string_path_values_are_stringified() {
        let params = Params::new().set("badgeId", 42);
        let req = build_request(Operation::GetBadge.spec(), &params).unwrap();
        assert_eq!(req.render_path(), "/products/badges/42");
    }

    #[test]
    fn query_fields_are_copied_in_table_order() {
        let spec = OperationSpec::new("listThings", HttpMethod::Get, "/things")
            .query(&["limit", "tags", "start"]);
        let params = Params::new()
            .set("start", "abc")
            .set("limit", 10)
            .set("tags", json!(["a", "b"]));
        let req = build_request(&spec, &params).unwrap();
        assert_eq!(
            req.query,
            vec![
                ("limit".to_string(), "10".to_string()),
                ("tags".to_string(), "a,b".to_string()),
                ("start".to_string(), "abc".to_string()),
            ]
        );
    }

    #[test]
    fn construction_is_deterministic() {
        let params = Params::new()
            .set("productId", "P")
            .set("pricingPlanId", "X")
            .set("description", "d")
            .header("X-Trace", "1");
        let a = build_request(Operation::UpdatePlan.spec(), &params).unwrap();
        let b = build_request(Operation::UpdatePlan.spec(), &params).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn get_plan_renders_both_path_params() {
        let params = Params::new().set("productId", "P").set("pricingPlanId", "X");
        let req = build_request(Operation::GetPlan.spec(), &params).unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.render_path(), "/products/P/plans/X");
    }
}
