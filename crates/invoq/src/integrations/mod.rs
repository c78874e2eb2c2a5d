//! Contracts for collaborators outside the pipeline: supplier directory and
//! accounting-system header overrides.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::IntegrationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SupplierStatus {
    Active,
    PendingReview,
    Inactive,
}

impl SupplierStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SupplierStatus::Active => "ACTIVE",
            SupplierStatus::PendingReview => "PENDING_REVIEW",
            SupplierStatus::Inactive => "INACTIVE",
        }
    }
}

impl FromStr for SupplierStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(SupplierStatus::Active),
            "PENDING_REVIEW" => Ok(SupplierStatus::PendingReview),
            "INACTIVE" => Ok(SupplierStatus::Inactive),
            other => Err(format!("unknown supplier status '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSupplier {
    pub supplier_id: String,
    pub name: String,
    pub status: SupplierStatus,
}

/// Maps an extracted supplier name to a tenant supplier record.
#[async_trait]
pub trait SupplierResolver: Send + Sync {
    async fn resolve(
        &self,
        name: &str,
        tenant_id: &str,
    ) -> Result<ResolvedSupplier, IntegrationError>;
}

/// Header fields an accounting system says are authoritative.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderOverride {
    pub invoice_date: Option<NaiveDate>,
    pub supplier_name: Option<String>,
}

#[async_trait]
pub trait AccountingOverrideLookup: Send + Sync {
    async fn find_by_external_ref(
        &self,
        tenant_id: &str,
        external_ref: &str,
    ) -> Result<Option<HeaderOverride>, IntegrationError>;
}

/// Lookup for deployments without an accounting integration.
#[derive(Debug, Default, Clone)]
pub struct NoAccountingOverrides;

#[async_trait]
impl AccountingOverrideLookup for NoAccountingOverrides {
    async fn find_by_external_ref(
        &self,
        _tenant_id: &str,
        _external_ref: &str,
    ) -> Result<Option<HeaderOverride>, IntegrationError> {
        Ok(None)
    }
}

/// Supplier names compare case- and whitespace-insensitively.
pub fn normalize_supplier_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
