//! Frontend Models
//!
//! Data structures matching backend entities. The backend speaks
//! snake_case JSON with table-prefixed keys (`stage_id`, `stage_name`).

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub type FunnelId = u32;
pub type StageId = u32;
pub type DealId = u32;
pub type UserId = u32;

/// Funnel data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Funnel {
    #[serde(rename = "funnel_id")]
    pub id: FunnelId,
    #[serde(rename = "funnel_name", default)]
    pub name: String,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub is_shared: bool,
}

/// Stage data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stage {
    #[serde(rename = "stage_id")]
    pub id: StageId,
    #[serde(default)]
    pub funnel_id: FunnelId,
    #[serde(rename = "stage_name")]
    pub name: String,
    #[serde(default)]
    pub position: i32,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub is_won: bool,
    #[serde(default)]
    pub probability: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Stage {
    /// Terminal stage for deals that fell through
    pub fn is_lost(&self) -> bool {
        self.is_closed && !self.is_won
    }

    /// Terminal stage for deals that closed successfully
    pub fn is_won_terminal(&self) -> bool {
        self.is_closed && self.is_won
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRef {
    pub account_id: u32,
    #[serde(default)]
    pub account_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactRef {
    pub contact_id: u32,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

impl ContactRef {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

/// Deal (opportunity) data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deal {
    #[serde(rename = "opportunity_id")]
    pub id: DealId,
    #[serde(rename = "opportunity_name", default)]
    pub name: String,
    #[serde(default, deserialize_with = "de_amount")]
    pub amount: f64,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub stage_id: Option<StageId>,
    #[serde(default)]
    pub account: Option<AccountRef>,
    #[serde(default)]
    pub contact: Option<ContactRef>,
    #[serde(default)]
    pub is_closed: bool,
    #[serde(default)]
    pub lost_reason: Option<String>,
    #[serde(default)]
    pub close_date: Option<String>,
}

impl Deal {
    /// "Account, Contact" line shown under the deal name
    pub fn counterparty(&self) -> Option<String> {
        let account = self.account.as_ref().map(|a| a.account_name.clone());
        let contact = self.contact.as_ref().map(ContactRef::full_name);
        match (account, contact) {
            (Some(a), Some(c)) => Some(format!("{a}, {c}")),
            (Some(a), None) => Some(a),
            (None, Some(c)) => Some(c),
            (None, None) => None,
        }
    }
}

/// User data structure (matches backend)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub user_id: UserId,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl User {
    pub fn display_name(&self) -> String {
        if !self.username.is_empty() {
            return self.username.clone();
        }
        let full = format!(
            "{} {}",
            self.first_name.as_deref().unwrap_or_default(),
            self.last_name.as_deref().unwrap_or_default()
        );
        full.trim().to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: u32,
    #[serde(default)]
    pub account_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub owner_id: Option<UserId>,
    #[serde(default)]
    pub is_deleted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub contact_id: u32,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub account: Option<AccountRef>,
    #[serde(default)]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub assigned_to: Option<UserId>,
    #[serde(default)]
    pub is_completed: bool,
}

/// In-app notification (task reminders and the like)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
}

// ========================
// Reports
// ========================

/// One stage of `GET /reports/funnel`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelStageRow {
    #[serde(default)]
    pub stage_name: String,
    #[serde(default, deserialize_with = "de_count")]
    pub count: u32,
    #[serde(rename = "totalAmount", default, deserialize_with = "de_amount")]
    pub total_amount: f64,
    /// Percent of the previous stage; absent for the first one
    #[serde(default, deserialize_with = "de_opt_number")]
    pub conversion_rate: Option<f64>,
}

/// One owner of `GET /reports/performance`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRow {
    #[serde(rename = "owner_name", default)]
    pub owner_name: String,
    #[serde(default, deserialize_with = "de_count")]
    pub total_deals: u32,
    #[serde(default, deserialize_with = "de_count")]
    pub won_deals: u32,
    #[serde(default, deserialize_with = "de_count")]
    pub lost_deals: u32,
    /// Percent
    #[serde(default, deserialize_with = "de_amount")]
    pub win_rate: f64,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub avg_deal_value: Option<f64>,
    #[serde(default, deserialize_with = "de_amount")]
    pub total_revenue: f64,
}

/// `GET /reports/revenue`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueSummary {
    #[serde(default, deserialize_with = "de_amount")]
    pub total_revenue: f64,
    #[serde(default, deserialize_with = "de_opt_number")]
    pub avg_deal_value: Option<f64>,
    #[serde(default, deserialize_with = "de_count")]
    pub total_won_deals: u32,
    /// Percent
    #[serde(default, deserialize_with = "de_amount")]
    pub win_rate: f64,
}

/// `GET /reports/deal-trend`: closed deals per period
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DealTrend {
    #[serde(default)]
    pub periods: Vec<TrendPeriod>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPeriod {
    #[serde(default)]
    pub label: String,
    #[serde(default, deserialize_with = "de_count")]
    pub total: u32,
    /// Percent against the previous period
    #[serde(rename = "changeFromPrevious", default, deserialize_with = "de_amount")]
    pub change_from_previous: f64,
    #[serde(rename = "byEmployee", default)]
    pub by_employee: Vec<EmployeeCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmployeeCount {
    #[serde(default)]
    pub owner_name: String,
    #[serde(default, deserialize_with = "de_count")]
    pub count: u32,
}

/// Decoded access-token payload. Never verified client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claims {
    #[serde(deserialize_with = "de_id")]
    pub sub: UserId,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

/// Access/refresh token pair returned by login and refresh
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPair {
    pub access_token: String,
    /// Older backends answer login with the access token alone
    #[serde(default)]
    pub refresh_token: String,
}

// ========================
// Request Payloads
// ========================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewStage {
    pub stage_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<i32>,
    pub is_closed: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub is_won: bool,
}

impl NewStage {
    pub fn open(name: impl Into<String>) -> Self {
        Self { stage_name: name.into(), position: None, is_closed: false, is_won: false }
    }
}

/// One entry of the bulk `PATCH /funnels/{id}/stages` body
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageUpdate {
    pub stage_id: StageId,
    pub position: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub probability: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_closed: Option<bool>,
}

impl StageUpdate {
    /// Name, position, probability and closed flag
    pub fn full(stage: &Stage) -> Self {
        Self {
            stage_id: stage.id,
            position: stage.position,
            stage_name: Some(stage.name.clone()),
            probability: stage.probability,
            is_closed: Some(stage.is_closed),
        }
    }

    /// Position only
    pub fn position(stage: &Stage) -> Self {
        Self { stage_id: stage.id, position: stage.position, stage_name: None, probability: None, is_closed: None }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealStageChange {
    pub stage_id: StageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lost_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewDeal {
    pub opportunity_name: String,
    pub amount: f64,
    pub funnel_id: FunnelId,
    pub stage_id: StageId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_date: Option<String>,
    pub is_closed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAccount {
    pub account_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewContact {
    pub first_name: String,
    pub last_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_id: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<UserId>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTask {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<UserId>,
}

/// Empty form inputs become absent fields rather than empty strings
pub fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Amounts arrive as numbers or as numeric strings (Postgres `numeric`)
fn de_amount<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64().unwrap_or_default(),
        Some(Value::String(s)) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    })
}

fn de_opt_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// SQL counts come back as strings from `bigint` columns
fn de_count<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
    let value = de_amount(deserializer)?;
    Ok(if value.is_finite() && value > 0.0 { value.round() as u32 } else { 0 })
}

/// Token subjects arrive as numbers or numeric strings
fn de_id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<UserId, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .and_then(|n| UserId::try_from(n).ok())
            .ok_or_else(|| serde::de::Error::custom("subject id out of range")),
        Value::String(s) => s.trim().parse().map_err(serde::de::Error::custom),
        other => Err(serde::de::Error::custom(format!("unexpected subject id: {other}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deal_amount_accepts_numbers_and_strings() {
        let deals: Vec<Deal> = serde_json::from_str(
            r#"[
                {"opportunity_id": 1, "opportunity_name": "A", "amount": 1500, "stage_id": 2},
                {"opportunity_id": 2, "opportunity_name": "B", "amount": "2500.50", "stage_id": 2},
                {"opportunity_id": 3, "opportunity_name": "C", "amount": null},
                {"opportunity_id": 4, "opportunity_name": "D"}
            ]"#,
        )
        .unwrap();
        let amounts: Vec<f64> = deals.iter().map(|d| d.amount).collect();
        assert_eq!(amounts, vec![1500.0, 2500.5, 0.0, 0.0]);
        assert_eq!(deals[0].stage_id, Some(2));
        assert_eq!(deals[3].stage_id, None);
    }

    #[test]
    fn test_counterparty_line() {
        let mut deal: Deal = serde_json::from_str(
            r#"{"opportunity_id": 1, "opportunity_name": "A",
                "account": {"account_id": 4, "account_name": "Acme"},
                "contact": {"contact_id": 9, "first_name": "Ivan", "last_name": "Petrov"}}"#,
        )
        .unwrap();
        assert_eq!(deal.counterparty().as_deref(), Some("Acme, Ivan Petrov"));
        deal.account = None;
        assert_eq!(deal.counterparty().as_deref(), Some("Ivan Petrov"));
        deal.contact = None;
        assert_eq!(deal.counterparty(), None);
    }

    #[test]
    fn test_stage_update_shapes() {
        let stage = Stage {
            id: 7,
            funnel_id: 1,
            name: "Переговоры".to_string(),
            position: 2,
            is_closed: false,
            is_won: false,
            probability: Some(40),
            color: None,
        };
        let full = serde_json::to_value(StageUpdate::full(&stage)).unwrap();
        assert_eq!(
            full,
            serde_json::json!({"stage_id": 7, "position": 2, "stage_name": "Переговоры", "probability": 40, "is_closed": false})
        );
        let position = serde_json::to_value(StageUpdate::position(&stage)).unwrap();
        assert_eq!(position, serde_json::json!({"stage_id": 7, "position": 2}));
    }

    #[test]
    fn test_lost_reason_omitted_when_absent() {
        let change = DealStageChange { stage_id: 3, lost_reason: None };
        assert_eq!(serde_json::to_value(change).unwrap(), serde_json::json!({"stage_id": 3}));
    }

    #[test]
    fn test_report_rows_decode() {
        let rows: Vec<FunnelStageRow> = serde_json::from_str(
            r#"[
                {"stage_name": "Новая", "count": "4", "totalAmount": "1200.50", "conversion_rate": null},
                {"stage_name": "Переговоры", "count": 2, "totalAmount": 800, "conversion_rate": "50.00"}
            ]"#,
        )
        .unwrap();
        assert_eq!((rows[0].count, rows[0].total_amount, rows[0].conversion_rate), (4, 1200.5, None));
        assert_eq!(rows[1].conversion_rate, Some(50.0));

        let performance: PerformanceRow = serde_json::from_str(
            r#"{"owner_name": "Олег", "totalDeals": "5", "wonDeals": 3, "lostDeals": 1,
                "winRate": 75, "avgDealValue": null, "totalRevenue": "3000"}"#,
        )
        .unwrap();
        assert_eq!(performance.owner_name, "Олег");
        assert_eq!((performance.total_deals, performance.won_deals, performance.lost_deals), (5, 3, 1));
        assert_eq!(performance.avg_deal_value, None);
        assert_eq!(performance.total_revenue, 3000.0);

        let trend: DealTrend = serde_json::from_str(
            r#"{"periods": [{"label": "2025-03-01", "total": 3, "changeFromPrevious": -25,
                "byEmployee": [{"owner_name": "Олег", "count": "2"}]}]}"#,
        )
        .unwrap();
        assert_eq!(trend.periods[0].change_from_previous, -25.0);
        assert_eq!(trend.periods[0].by_employee[0].count, 2);
    }

    #[test]
    fn test_notification_optional_fields() {
        let notification: Notification = serde_json::from_str(r#"{"id": 3, "title": "Позвонить"}"#).unwrap();
        assert_eq!(notification.message, None);
        assert_eq!(notification.due_date, None);
    }

    #[test]
    fn test_claims_subject_as_string_or_number() {
        let a: Claims = serde_json::from_str(r#"{"sub": 12, "roles": ["manager"]}"#).unwrap();
        let b: Claims = serde_json::from_str(r#"{"sub": "12"}"#).unwrap();
        assert_eq!(a.sub, 12);
        assert_eq!(b.sub, 12);
        assert!(b.roles.is_empty());
    }
}
