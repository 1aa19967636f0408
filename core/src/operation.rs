//! Declarative table of every remote operation.
//!
//! # Design
//! Each `Operation` maps to one static `OperationSpec`: method, path
//! template, path parameter names, required parameter names, query fields and
//! the body field map. The request builder interprets these rows; no
//! operation has code of its own. Required lists are spelled out per row,
//! path parameters included, and body renames are listed literally because
//! the wire names do not follow a single rule.

use crate::http::HttpMethod;

/// One body field: the parameter name the caller uses and the JSON key sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyField {
    pub local: &'static str,
    pub wire: &'static str,
}

const fn same(name: &'static str) -> BodyField {
    BodyField {
        local: name,
        wire: name,
    }
}

const fn renamed(local: &'static str, wire: &'static str) -> BodyField {
    BodyField { local, wire }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationSpec {
    pub name: &'static str,
    pub method: HttpMethod,
    pub path: &'static str,
    pub path_params: &'static [&'static str],
    pub required: &'static [&'static str],
    pub query: &'static [&'static str],
    /// `None` for operations that never send a body.
    pub body: Option<&'static [BodyField]>,
}

impl OperationSpec {
    pub const fn new(name: &'static str, method: HttpMethod, path: &'static str) -> Self {
        Self {
            name,
            method,
            path,
            path_params: &[],
            required: &[],
            query: &[],
            body: None,
        }
    }

    pub const fn path_params(mut self, names: &'static [&'static str]) -> Self {
        self.path_params = names;
        self
    }

    pub const fn required(mut self, names: &'static [&'static str]) -> Self {
        self.required = names;
        self
    }

    pub const fn query(mut self, names: &'static [&'static str]) -> Self {
        self.query = names;
        self
    }

    pub const fn body(mut self, fields: &'static [BodyField]) -> Self {
        self.body = Some(fields);
        self
    }
}

const PRODUCT: &[&str] = &["productId"];
const BADGE: &[&str] = &["badgeId"];
const PLAN: &[&str] = &["productId", "pricingPlanId"];
const CHANGE: &[&str] = &["productId", "changeRequestId"];

const REASON_BODY: &[BodyField] = &[same("reason")];
const PLAN_BODY: &[BodyField] = &[same("description"), same("label"), same("type"), same("url")];
const CHANGE_BODY: &[BodyField] = &[same("change")];

macro_rules! operation_table {
    ($($variant:ident => $spec:expr,)*) => {
        /// Every operation the service exposes.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Operation {
            $($variant,)*
        }

        impl Operation {
            pub const ALL: &'static [Operation] = &[$(Operation::$variant,)*];

            pub fn spec(self) -> &'static OperationSpec {
                match self {
                    $(Operation::$variant => {
                        static SPEC: OperationSpec = $spec;
                        &SPEC
                    })*
                }
            }
        }
    };
}

use HttpMethod::{Delete, Get, Patch, Post};

operation_table! {
    ListProducts => OperationSpec::new("listProducts", Get, "/products"),
    CreateProduct => OperationSpec::new("createProduct", Post, "/products")
        .required(&["productName", "taxAssessment", "productType"])
        .body(&[
            same("productName"),
            same("taxAssessment"),
            same("productType"),
            same("materialAgreement"),
        ]),
    GetProduct => OperationSpec::new("getProduct", Get, "/products/{productId}")
        .path_params(PRODUCT)
        .required(PRODUCT),
    UpdateProduct => OperationSpec::new("updateProduct", Patch, "/products/{productId}")
        .path_params(PRODUCT)
        .required(PRODUCT)
        .body(&[same("materialAgreement"), same("productName"), same("taxAssessment")]),
    DeleteProduct => OperationSpec::new("deleteProduct", Delete, "/products/{productId}")
        .path_params(PRODUCT)
        .required(PRODUCT),
    PublishProduct => OperationSpec::new("publishProduct", Post, "/products/{productId}/publish")
        .path_params(PRODUCT)
        .required(PRODUCT),
    SuspendProduct => OperationSpec::new("suspendProduct", Post, "/products/{productId}/suspend")
        .path_params(PRODUCT)
        .required(&["productId", "reason"])
        .body(REASON_BODY),
    DeprecateProduct => OperationSpec::new("deprecateProduct", Post, "/products/{productId}/deprecate")
        .path_params(PRODUCT)
        .required(&["productId", "reason"])
        .body(REASON_BODY),
    RestoreProduct => OperationSpec::new("restoreProduct", Post, "/products/{productId}/restore")
        .path_params(PRODUCT)
        .required(&["productId", "reason"])
        .body(REASON_BODY),
    ListBadges => OperationSpec::new("listBadges", Get, "/products/badges"),
    GetBadge => OperationSpec::new("getBadge", Get, "/products/badges/{badgeId}")
        .path_params(BADGE)
        .required(BADGE),
    GetCatalog => OperationSpec::new("getCatalog", Get, "/products/{productId}/catalog")
        .path_params(PRODUCT)
        .required(PRODUCT),
    UpdateCatalog => OperationSpec::new("updateCatalog", Patch, "/products/{productId}/catalog")
        .path_params(PRODUCT)
        .required(PRODUCT)
        .body(&[
            same("catalogId"),
            same("description"),
            same("iconUrl"),
            same("keywords"),
            same("pricingModel"),
            same("category"),
            same("providerType"),
            same("label"),
            same("name"),
            same("provider"),
            same("tags"),
            same("documentationUrl"),
            same("highlights"),
            same("longDescription"),
            same("media"),
        ]),
    RequestCatalogApproval => OperationSpec::new(
        "requestCatalogApproval",
        Post,
        "/products/{productId}/catalog/approvals",
    )
    .path_params(PRODUCT)
    .required(PRODUCT),
    ListPlans => OperationSpec::new("listPlans", Get, "/products/{productId}/plans")
        .path_params(PRODUCT)
        .required(PRODUCT),
    CreatePlan => OperationSpec::new("createPlan", Post, "/products/{productId}/plans")
        .path_params(PRODUCT)
        .required(&["productId", "description", "label", "type", "url"])
        .body(PLAN_BODY),
    GetPlan => OperationSpec::new("getPlan", Get, "/products/{productId}/plans/{pricingPlanId}")
        .path_params(PLAN)
        .required(PLAN),
    UpdatePlan => OperationSpec::new("updatePlan", Patch, "/products/{productId}/plans/{pricingPlanId}")
        .path_params(PLAN)
        .required(PLAN)
        .body(PLAN_BODY),
    DeletePlan => OperationSpec::new("deletePlan", Delete, "/products/{productId}/plans/{pricingPlanId}")
        .path_params(PLAN)
        .required(PLAN),
    GetSupport => OperationSpec::new("getSupport", Get, "/products/{productId}/support")
        .path_params(PRODUCT)
        .required(PRODUCT),
    UpdateSupport => OperationSpec::new("updateSupport", Patch, "/products/{productId}/support")
        .path_params(PRODUCT)
        .required(PRODUCT)
        .body(&[
            same("escalationContacts"),
            same("locations"),
            renamed("supportDetails", "support_details"),
            renamed("supportEscalation", "support_escalation"),
            renamed("supportType", "support_type"),
            same("url"),
        ]),
    ListSupportChangeRequests => OperationSpec::new(
        "listSupportChangeRequests",
        Get,
        "/products/{productId}/support/changes",
    )
    .path_params(PRODUCT)
    .required(PRODUCT),
    CreateSupportChangeRequest => OperationSpec::new(
        "createSupportChangeRequest",
        Post,
        "/products/{productId}/support/changes",
    )
    .path_params(PRODUCT)
    .required(&["productId", "change"])
    .body(CHANGE_BODY),
    GetSupportChangeRequest => OperationSpec::new(
        "getSupportChangeRequest",
        Get,
        "/products/{productId}/support/changes/{changeRequestId}",
    )
    .path_params(CHANGE)
    .required(CHANGE),
    UpdateSupportChangeRequest => OperationSpec::new(
        "updateSupportChangeRequest",
        Patch,
        "/products/{productId}/support/changes/{changeRequestId}",
    )
    .path_params(CHANGE)
    .required(&["productId", "changeRequestId", "change"])
    .body(CHANGE_BODY),
    ListSupportChangeRequestReviews => OperationSpec::new(
        "listSupportChangeRequestReviews",
        Get,
        "/products/{productId}/support/changes/{changeRequestId}/reviews",
    )
    .path_params(CHANGE)
    .required(CHANGE),
    RequestSupportChangeRequestReview => OperationSpec::new(
        "requestSupportChangeRequestReview",
        Post,
        "/products/{productId}/support/changes/{changeRequestId}/reviews",
    )
    .path_params(CHANGE)
    .required(CHANGE),
    MergeSupportChangeRequest => OperationSpec::new(
        "mergeSupportChangeRequest",
        Post,
        "/products/{productId}/support/changes/{changeRequestId}/merge",
    )
    .path_params(CHANGE)
    .required(CHANGE),
    RequestSupportApproval => OperationSpec::new(
        "requestSupportApproval",
        Post,
        "/products/{productId}/support/approvals",
    )
    .path_params(PRODUCT)
    .required(PRODUCT),
    RequestProductApproval => OperationSpec::new(
        "requestProductApproval",
        Post,
        "/products/{productId}/approvals",
    )
    .path_params(PRODUCT)
    .required(PRODUCT),
    ListProductApprovals => OperationSpec::new(
        "listProductApprovals",
        Get,
        "/products/{productId}/approvals",
    )
    .path_params(PRODUCT)
    .required(PRODUCT),
}

impl Operation {
    pub fn name(self) -> &'static str {
        self.spec().name
    }

    /// Look an operation up by its wire-level name, e.g. `getPlan`.
    pub fn from_name(name: &str) -> Option<Operation> {
        Operation::ALL.iter().copied().find(|op| op.name() == name)
    }
}
