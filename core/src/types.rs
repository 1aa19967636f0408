//! Request and response models for the product lifecycle API.
//!
//! # Design
//! These are wire shapes only; nothing here is persisted or mutated by the
//! client. Product, catalog and plan fields are camelCase on the wire while
//! the support structures use snake_case, so each type declares its own
//! renaming. Optional fields are skipped when `None` and unknown fields are
//! ignored, which lets the same type serve as a partial request value and as
//! a response.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a product. Transitions happen server-side only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductState {
    Draft,
    Published,
    Suspended,
    Deprecated,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub product_name: String,
    pub tax_assessment: String,
    pub product_type: String,
    #[serde(default)]
    pub material_agreement: bool,
    pub state: ProductState,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductList {
    pub products: Vec<Product>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HighlightSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MediaSection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// `image`, `youtube`, `video_mp_4`, ...
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Marketplace metadata for a product.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub keywords: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pricing_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub provider_type: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub documentation_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub highlights: Vec<HighlightSection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub long_description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub media: Vec<MediaSection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingPlan {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    pub description: String,
    pub label: String,
    /// e.g. `byol`.
    #[serde(rename = "type")]
    pub kind: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanList {
    pub plans: Vec<PricingPlan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EscalationContact {
    pub email: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportAvailabilityTimes {
    /// Day of the week, 1 = Monday.
    pub day: u8,
    pub start_time: String,
    pub end_time: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportAvailability {
    pub always_available: bool,
    #[serde(default)]
    pub times: Vec<SupportAvailabilityTimes>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
}

/// A waiting time such as "2 hours".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportTimeInterval {
    /// `hour`, `day`, ...
    #[serde(rename = "type")]
    pub unit: String,
    pub value: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability: Option<SupportAvailability>,
    pub contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_wait_time: Option<SupportTimeInterval>,
    /// `email`, `phone`, `chat`, ...
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportEscalation {
    pub contact: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub escalation_wait_time: Option<SupportTimeInterval>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_wait_time: Option<SupportTimeInterval>,
}

/// Support configuration of a product, also the payload of a change request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Support {
    #[serde(
        rename = "escalationContacts",
        default,
        skip_serializing_if = "Vec::is_empty"
    )]
    pub escalation_contacts: Vec<EscalationContact>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub locations: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub process_i18n: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub support_details: Vec<SupportDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_escalation: Option<SupportEscalation>,
    /// `ibm`, `third-party`, `community`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A proposed support configuration awaiting review and merge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupportChangeRequest {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_id: Option<String>,
    /// `draft`, `in_review`, `merged`.
    pub state: String,
    pub change: Support,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRequestList {
    pub changes: Vec<SupportChangeRequest>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRequestReview {
    pub id: String,
    pub change_request_id: String,
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewList {
    pub reviews: Vec<ChangeRequestReview>,
}

/// A certification badge from the read-only badge catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub learn_more_link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BadgeList {
    pub badges: Vec<Badge>,
}

/// Tracks the approval of a product, catalog or support change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRequest {
    pub id: String,
    pub product_id: String,
    /// `product`, `catalog` or `support`.
    pub kind: String,
    /// `requested`, `approved`, `rejected`.
    pub state: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApprovalList {
    pub approvals: Vec<ApprovalRequest>,
}
