//! Type registry: the closed sets of entity types, predicates and metrics
//!
//! Pure data. The extraction prompt embeds these lists verbatim and the
//! validator checks model output against them.

use serde::Serialize;

pub const ENTITY_TYPES: &[&str] = &[
    "COMPANY",
    "SUBSIDIARY",
    "HOLDING_COMPANY",
    "JOINT_VENTURE",
    "MARKET",
    "PRODUCT",
    "SERVICE",
    "SEGMENT",
    "BRAND",
    "ASSET",
    "ASSET_NETWORK",
    "FACILITY",
    "PROJECT",
    "PERSON",
    "ROLE",
    "BOARD",
    "REGULATOR",
    "GOVERNMENT_BODY",
    "EXCHANGE",
    "TICKER",
    "FINANCIAL_INSTRUMENT",
    "INVESTOR",
    "LENDER",
    "AUDITOR",
    "GEOGRAPHY",
    "INDUSTRY",
    "RISK_FACTOR",
    "LITIGATION",
    "DOCUMENT",
    "PAGE",
];

pub const METRIC_TYPES: &[&str] = &[
    "REVENUE",
    "PROFIT",
    "LOSS",
    "EBITDA",
    "NET_INCOME",
    "OPERATING_INCOME",
    "MARGIN",
    "DEMAND",
    "SUPPLY",
    "PRICE",
    "GROWTH_RATE",
    "CAPACITY",
    "PRODUCTION",
    "VOLUME",
    "COUNT",
    "MARKET_SHARE",
    "OWNERSHIP_PERCENTAGE",
    "SHARE_COUNT",
    "MARKET_CAPITALIZATION",
    "DEBT",
    "FUNDING_AMOUNT",
    "INVESTMENT_AMOUNT",
    "TAX",
    "FINE_AMOUNT",
    "DIVIDEND",
    "CAPEX",
    "CASH_FLOW",
    "ASSETS",
    "LIABILITIES",
    "EQUITY",
    "EMPLOYEE_COUNT",
];

/// Links an entity to one of its measurements inside the structured graph.
pub const HAS_MEASUREMENT: &str = "HAS_MEASUREMENT";
/// Links a node to a reporting period inside the structured graph.
pub const REPORTED_IN_PERIOD: &str = "REPORTED_IN_PERIOD";

/// Structural predicates that must never survive into resolved triplets.
pub const GENERIC_PREDICATES: &[&str] = &[HAS_MEASUREMENT, REPORTED_IN_PERIOD];

pub const PREDICATE_TYPES: &[&str] = &[
    // ownership and structure
    "OWNS",
    "OWNED_BY",
    "SUBSIDIARY_OF",
    "PARENT_OF",
    "AFFILIATE_OF",
    "PART_OF_GROUP",
    "JOINT_VENTURE_WITH",
    "MERGED_WITH",
    "ACQUIRED",
    "ACQUIRED_BY",
    "DIVESTED",
    // people
    "APPOINTED_AS",
    "SERVES_AS",
    "MEMBER_OF_BOARD",
    // financial results
    "REPORTED_REVENUE",
    "REPORTED_PROFIT",
    "REPORTED_LOSS",
    "REPORTED_EBITDA",
    // equity and listing
    "ISSUED_SHARES",
    "LISTED_ON",
    "HAS_TICKER",
    // funding
    "RAISED_FUNDS",
    "FUNDED_BY",
    "BORROWED_FROM",
    "ISSUED_DEBT",
    "INVESTED_IN",
    "ACQUIRED_STAKE_IN",
    // commercial
    "OFFERS_PRODUCT",
    "OFFERS_SERVICE",
    "SUPPLIES",
    "SUPPLIED_BY",
    // geography
    "HEADQUARTERED_IN",
    "REGISTERED_IN",
    "OPERATES_IN",
    // regulatory
    "REGULATED_BY",
    "FILED_WITH",
    "FINED_BY",
    "HAS_RISK_FACTOR",
    "HAS_LITIGATION",
    "AUDITED_BY",
    "PAID_TAX",
    // structural
    REPORTED_IN_PERIOD,
    HAS_MEASUREMENT,
    // provenance
    "EXTRACTED_FROM_DOCUMENT",
    "EXTRACTED_FROM_PAGE",
];

pub fn is_entity_type(s: &str) -> bool {
    ENTITY_TYPES.contains(&s)
}

pub fn is_metric_type(s: &str) -> bool {
    METRIC_TYPES.contains(&s)
}

pub fn is_predicate(s: &str) -> bool {
    PREDICATE_TYPES.contains(&s)
}

pub fn is_generic_predicate(s: &str) -> bool {
    GENERIC_PREDICATES.contains(&s)
}

/// Predicates that may appear in resolved output.
pub fn concrete_predicates() -> impl Iterator<Item = &'static str> {
    PREDICATE_TYPES
        .iter()
        .copied()
        .filter(|p| !is_generic_predicate(p))
}

/// Snapshot of the registry as served by the `allowed-types` endpoint.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct AllowedTypes {
    pub entity_types: Vec<&'static str>,
    pub predicate_types: Vec<&'static str>,
    pub metric_types: Vec<&'static str>,
}

impl AllowedTypes {
    pub fn current() -> Self {
        Self {
            entity_types: ENTITY_TYPES.to_vec(),
            predicate_types: PREDICATE_TYPES.to_vec(),
            metric_types: METRIC_TYPES.to_vec(),
        }
    }
}
