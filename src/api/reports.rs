//! Report Endpoints
//!
//! Backend-computed reports for a funnel and period, and their
//! spreadsheet exports.

use chrono::NaiveDate;
use tracing::debug;

use super::client::ApiClient;
use crate::error::ApiError;
use crate::models::{DealTrend, FunnelStageRow, PerformanceRow, RevenueSummary};
use crate::report::{ReportExport, ReportFile, ReportQuery};

/// Everything the report page shows, fetched together
#[derive(Debug, Clone, PartialEq)]
pub struct ReportBundle {
    pub funnel: Vec<FunnelStageRow>,
    pub performance: Vec<PerformanceRow>,
    pub revenue: RevenueSummary,
    pub trend: DealTrend,
}

pub async fn funnel_report(api: &ApiClient, query: &ReportQuery) -> Result<Vec<FunnelStageRow>, ApiError> {
    api.get(&format!("/reports/funnel{}", query.query_string())).await
}

pub async fn performance_report(api: &ApiClient, query: &ReportQuery) -> Result<Vec<PerformanceRow>, ApiError> {
    api.get(&format!("/reports/performance{}", query.query_string())).await
}

pub async fn revenue_report(api: &ApiClient, query: &ReportQuery) -> Result<RevenueSummary, ApiError> {
    api.get(&format!("/reports/revenue{}", query.query_string())).await
}

pub async fn deal_trend_report(api: &ApiClient, query: &ReportQuery) -> Result<DealTrend, ApiError> {
    api.get(&format!("/reports/deal-trend{}", query.query_string())).await
}

/// All four reports; the first failure fails the bundle
pub async fn load_reports(api: &ApiClient, query: &ReportQuery) -> Result<ReportBundle, ApiError> {
    let (funnel, performance, revenue, trend) = futures::try_join!(
        funnel_report(api, query),
        performance_report(api, query),
        revenue_report(api, query),
        deal_trend_report(api, query),
    )?;
    Ok(ReportBundle { funnel, performance, revenue, trend })
}

/// Download an export. The server's file name wins when it sends one.
pub async fn export_report(
    api: &ApiClient,
    export: ReportExport,
    query: &ReportQuery,
    today: NaiveDate,
) -> Result<ReportFile, ApiError> {
    let response = api.get_raw(&format!("{}{}", export.path(), query.query_string())).await?;
    let name = response.attachment.unwrap_or_else(|| export.file_name(query.period, today));
    debug!(%name, bytes = response.body.len(), "report exported");
    Ok(ReportFile { name, bytes: response.body })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{HttpRequest, HttpResponse, MemoryStorage, Transport};
    use crate::report::ReportPeriod;
    use async_trait::async_trait;
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Answers by path prefix and records every request
    struct Routes {
        routes: Vec<(&'static str, HttpResponse)>,
        requests: Rc<RefCell<Vec<String>>>,
    }

    #[async_trait(?Send)]
    impl Transport for Routes {
        async fn send(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
            self.requests.borrow_mut().push(request.path.clone());
            let response = self
                .routes
                .iter()
                .find(|(prefix, _)| request.path.starts_with(prefix))
                .map(|(_, response)| response.clone())
                .unwrap_or_else(|| HttpResponse::new(404, r#"{"message":"not found"}"#));
            Ok(response)
        }
    }

    fn client(routes: Vec<(&'static str, HttpResponse)>) -> (ApiClient, Rc<RefCell<Vec<String>>>) {
        let requests = Rc::new(RefCell::new(Vec::new()));
        let transport = Routes { routes, requests: Rc::clone(&requests) };
        (ApiClient::new(transport, MemoryStorage::with_tokens("access", "refresh")), requests)
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 7).unwrap()
    }

    #[tokio::test]
    async fn test_load_reports_scopes_every_request() {
        let (api, requests) = client(vec![
            ("/reports/funnel", HttpResponse::new(200, r#"[{"stage_name":"Новая","count":2,"totalAmount":100}]"#)),
            ("/reports/performance", HttpResponse::new(200, "[]")),
            ("/reports/revenue", HttpResponse::new(200, r#"{"totalRevenue":"900","totalWonDeals":3,"winRate":60}"#)),
            ("/reports/deal-trend", HttpResponse::new(200, r#"{"periods":[]}"#)),
        ]);

        let bundle = load_reports(&api, &ReportQuery::new(25, ReportPeriod::Month)).await.unwrap();

        assert_eq!(bundle.funnel[0].count, 2);
        assert_eq!(bundle.revenue.total_revenue, 900.0);
        assert_eq!(bundle.revenue.total_won_deals, 3);
        assert!(bundle.trend.periods.is_empty());
        let mut sent = requests.borrow().clone();
        sent.sort();
        assert_eq!(
            sent,
            vec![
                "/reports/deal-trend?funnel_id=25&period=month",
                "/reports/funnel?funnel_id=25&period=month",
                "/reports/performance?funnel_id=25&period=month",
                "/reports/revenue?funnel_id=25&period=month",
            ]
        );
    }

    #[tokio::test]
    async fn test_load_reports_fails_as_a_whole() {
        let (api, _) = client(vec![
            ("/reports/funnel", HttpResponse::new(200, "[]")),
            ("/reports/performance", HttpResponse::new(500, r#"{"message":"db down"}"#)),
            ("/reports/revenue", HttpResponse::new(200, "{}")),
            ("/reports/deal-trend", HttpResponse::new(200, "{}")),
        ]);

        let result = load_reports(&api, &ReportQuery::new(1, ReportPeriod::Week)).await;

        assert_eq!(result, Err(ApiError::Status { status: 500, message: "db down".to_string() }));
    }

    #[tokio::test]
    async fn test_export_names_file_from_period_or_server() {
        let bytes = vec![0x50, 0x4b, 0x03, 0x04];
        let (api, requests) = client(vec![
            ("/reports/export/revenue", HttpResponse::new(200, bytes.clone())),
            ("/reports/export/funnel", HttpResponse::new(200, bytes.clone()).with_attachment("funnel_25.xlsx")),
        ]);
        let query = ReportQuery::new(25, ReportPeriod::Year);

        let revenue = export_report(&api, ReportExport::Revenue, &query, today()).await.unwrap();
        assert_eq!(revenue.name, "Отчет_по_доходу_год_2025_2025-05-07.xlsx");
        assert_eq!(revenue.bytes, bytes);

        let funnel = export_report(&api, ReportExport::Funnel, &query, today()).await.unwrap();
        assert_eq!(funnel.name, "funnel_25.xlsx");

        assert_eq!(requests.borrow()[0], "/reports/export/revenue?funnel_id=25&period=year");
    }

    #[tokio::test]
    async fn test_failed_export_reports_backend_message() {
        let (api, _) = client(vec![("/reports/export", HttpResponse::new(403, r#"{"message":"Forbidden"}"#))]);
        let query = ReportQuery::new(25, ReportPeriod::Week);

        let result = export_report(&api, ReportExport::DealTrend, &query, today()).await;

        assert_eq!(result, Err(ApiError::Status { status: 403, message: "Forbidden".to_string() }));
    }
}
