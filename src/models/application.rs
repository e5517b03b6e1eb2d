// src/models/application.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

// Mapeia o CREATE TYPE application_status do banco
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[sqlx(type_name = "application_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Draft,
    Submitted,
    UnderReview,
    SentToInsurer,
    PendingInsurerReview,
    ReviewApplication,
    AwaitingInformation,
    Approved,
    Declined,
    Cancelled,
    Withdrawn,
}

impl ApplicationStatus {
    pub const ALL: [ApplicationStatus; 11] = [
        ApplicationStatus::Draft,
        ApplicationStatus::Submitted,
        ApplicationStatus::UnderReview,
        ApplicationStatus::SentToInsurer,
        ApplicationStatus::PendingInsurerReview,
        ApplicationStatus::ReviewApplication,
        ApplicationStatus::AwaitingInformation,
        ApplicationStatus::Approved,
        ApplicationStatus::Declined,
        ApplicationStatus::Cancelled,
        ApplicationStatus::Withdrawn,
    ];

    /// Status "resolvidos": são os que podem ser a aplicação ativa de um ClientDebtor.
    pub fn is_resolved(&self) -> bool {
        matches!(
            self,
            ApplicationStatus::Approved
                | ApplicationStatus::Declined
                | ApplicationStatus::Withdrawn
                | ApplicationStatus::Cancelled
        )
    }
}

// Pedido de limite de crédito
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    #[serde(rename = "_id")]
    pub id: Uuid,
    /// Número legível (ex: "APP-000123")
    pub application_id: String,
    pub client_id: Uuid,
    pub debtor_id: Uuid,
    pub client_debtor_id: Option<Uuid>,
    pub status: ApplicationStatus,
    pub credit_limit: Decimal,
    pub is_endorsed_limit: bool,
    pub approval_or_declining_date: Option<DateTime<Utc>>,
    pub created_by_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_final_statuses_are_resolved() {
        let resolved: Vec<_> = ApplicationStatus::ALL
            .into_iter()
            .filter(ApplicationStatus::is_resolved)
            .collect();
        assert_eq!(
            resolved,
            vec![
                ApplicationStatus::Approved,
                ApplicationStatus::Declined,
                ApplicationStatus::Cancelled,
                ApplicationStatus::Withdrawn,
            ]
        );
    }

    #[test]
    fn status_serializes_screaming_snake() {
        let json = serde_json::to_string(&ApplicationStatus::PendingInsurerReview).unwrap();
        assert_eq!(json, "\"PENDING_INSURER_REVIEW\"");
    }
}
