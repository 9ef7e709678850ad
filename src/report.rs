//! Reports
//!
//! Report periods and exports for the backend reports, helpers for
//! displaying them, and a summary computed from a loaded board for when
//! the backend reports are unavailable.

use chrono::{Datelike, NaiveDate};
use percent_encoding::{utf8_percent_encode, NON_ALPHANUMERIC};

use crate::funnel::FunnelBoard;
use crate::models::{DealTrend, FunnelId, FunnelStageRow, PerformanceRow, StageId};

/// Stage left out of the funnel bars; it would dwarf the open stages
pub const LOST_STAGE_REPORT_NAME: &str = "Закрыта и нереализована";

const MONTHS: [&str; 12] = [
    "январь", "февраль", "март", "апрель", "май", "июнь", "июль", "август", "сентябрь", "октябрь", "ноябрь", "декабрь",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportPeriod {
    Day,
    #[default]
    Week,
    Month,
    Quarter,
    Year,
    /// Either bound may still be unset while the user picks dates
    Custom { start: Option<NaiveDate>, end: Option<NaiveDate> },
}

impl ReportPeriod {
    pub const PRESETS: [ReportPeriod; 5] =
        [ReportPeriod::Day, ReportPeriod::Week, ReportPeriod::Month, ReportPeriod::Quarter, ReportPeriod::Year];

    /// Value of the `period` query parameter
    pub fn key(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Quarter => "quarter",
            Self::Year => "year",
            Self::Custom { .. } => "custom",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::PRESETS
            .into_iter()
            .find(|period| period.key() == key)
            .or_else(|| (key == "custom").then_some(Self::Custom { start: None, end: None }))
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Day => "Сегодня",
            Self::Week => "Неделя",
            Self::Month => "Месяц",
            Self::Quarter => "Квартал",
            Self::Year => "Год",
            Self::Custom { .. } => "Произвольный",
        }
    }

    /// Part of an export's file name, relative to `today`
    pub fn file_label(self, today: NaiveDate) -> String {
        match self {
            Self::Day => format!("день_{}-{}", today.day(), today.month()),
            Self::Week => format!("неделя_{}", today.format("%Y-%m-%d")),
            Self::Month => format!("месяц_{}_{}", MONTHS[today.month0() as usize], today.year()),
            Self::Quarter => format!("квартал_Q{}_{}", today.month0() / 3 + 1, today.year()),
            Self::Year => format!("год_{}", today.year()),
            Self::Custom { start: Some(start), end: Some(end) } => {
                format!("с_{}_по_{}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
            }
            Self::Custom { .. } => "период_не_установлен".to_string(),
        }
    }
}

/// Funnel and period every report request is scoped to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportQuery {
    pub funnel_id: FunnelId,
    pub period: ReportPeriod,
}

impl ReportQuery {
    pub fn new(funnel_id: FunnelId, period: ReportPeriod) -> Self {
        Self { funnel_id, period }
    }

    /// `?funnel_id=..&period=..`, plus the bounds of a custom period
    pub fn query_string(&self) -> String {
        let mut query = format!("?funnel_id={}&period={}", self.funnel_id, self.period.key());
        if let ReportPeriod::Custom { start, end } = self.period {
            for (name, date) in [("startDate", start), ("endDate", end)] {
                if let Some(date) = date {
                    let value = date.format("%Y-%m-%d").to_string();
                    query.push_str(&format!("&{name}={}", utf8_percent_encode(&value, NON_ALPHANUMERIC)));
                }
            }
        }
        query
    }

    /// A custom period is only sent once both bounds are picked
    pub fn is_complete(&self) -> bool {
        !matches!(self.period, ReportPeriod::Custom { start: None, .. } | ReportPeriod::Custom { end: None, .. })
    }
}

/// Spreadsheet exports offered by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportExport {
    Funnel,
    Performance,
    FunnelWithConversion,
    Revenue,
    DealTrend,
}

impl ReportExport {
    pub const ALL: [ReportExport; 5] = [
        ReportExport::Funnel,
        ReportExport::Performance,
        ReportExport::FunnelWithConversion,
        ReportExport::Revenue,
        ReportExport::DealTrend,
    ];

    pub fn path(self) -> &'static str {
        match self {
            Self::Funnel => "/reports/export/funnel",
            Self::Performance => "/reports/export/performance",
            Self::FunnelWithConversion => "/reports/export/funnel-with-conversion",
            Self::Revenue => "/reports/export/revenue",
            Self::DealTrend => "/reports/export/deal-trend",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::Funnel => "Этапы воронки",
            Self::Performance => "Отчет по эффективности",
            Self::FunnelWithConversion => "Воронка продаж",
            Self::Revenue => "Доход",
            Self::DealTrend => "Динамика закрытий",
        }
    }

    fn file_prefix(self) -> &'static str {
        match self {
            Self::Funnel => "Воронка",
            Self::Performance => "Эффективность",
            Self::FunnelWithConversion => "Воронка_с_конверсией",
            Self::Revenue => "Отчет_по_доходу",
            Self::DealTrend => "Динамика_закрытий",
        }
    }

    /// Name used when the server does not suggest one
    pub fn file_name(self, period: ReportPeriod, today: NaiveDate) -> String {
        format!("{}_{}_{}.xlsx", self.file_prefix(), period.file_label(today), today.format("%Y-%m-%d"))
    }
}

/// Downloaded export, ready to hand to the browser
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

pub const XLSX_MIME: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

// ========================
// Backend report display
// ========================

/// Funnel bar: label and width relative to the largest stage (0..=1)
#[derive(Debug, Clone, PartialEq)]
pub struct FunnelBar {
    pub label: String,
    pub share: f64,
    pub conversion: String,
}

pub fn funnel_bars(rows: &[FunnelStageRow]) -> Vec<FunnelBar> {
    let shown: Vec<&FunnelStageRow> = rows.iter().filter(|row| row.stage_name != LOST_STAGE_REPORT_NAME).collect();
    let max = shown.iter().map(|row| row.count).max().unwrap_or(0);
    shown
        .into_iter()
        .map(|row| FunnelBar {
            label: format!("{} ({})", row.stage_name, row.count),
            share: if max == 0 { 0.0 } else { f64::from(row.count) / f64::from(max) },
            conversion: row.conversion_rate.map_or_else(|| "-".to_string(), |rate| format!("{rate}%")),
        })
        .collect()
}

/// One point of the closing trend
#[derive(Debug, Clone, PartialEq)]
pub struct TrendPoint {
    pub label: String,
    pub total: u32,
    pub change: f64,
}

impl DealTrend {
    /// Owners appearing in any period, in first-seen order
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = Vec::new();
        for entry in self.periods.iter().flat_map(|period| period.by_employee.iter()) {
            if !owners.contains(&entry.owner_name) {
                owners.push(entry.owner_name.clone());
            }
        }
        owners
    }

    /// Totals per period, for everyone or for one owner
    pub fn series(&self, owner: Option<&str>) -> Vec<TrendPoint> {
        self.periods
            .iter()
            .map(|period| {
                let total = match owner {
                    None => period.total,
                    Some(owner) => period
                        .by_employee
                        .iter()
                        .find(|entry| entry.owner_name == owner)
                        .map_or(0, |entry| entry.count),
                };
                TrendPoint { label: period.label.clone(), total, change: period.change_from_previous }
            })
            .collect()
    }
}

/// "+12%", "-5%", "0%"
pub fn format_change(change: f64) -> String {
    let sign = if change > 0.0 { "+" } else { "" };
    format!("{sign}{change}%")
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PerformanceMetric {
    #[default]
    WonDeals,
    Revenue,
    WinRate,
}

impl PerformanceMetric {
    pub const ALL: [PerformanceMetric; 3] =
        [PerformanceMetric::WonDeals, PerformanceMetric::Revenue, PerformanceMetric::WinRate];

    pub fn key(self) -> &'static str {
        match self {
            Self::WonDeals => "wonDeals",
            Self::Revenue => "totalRevenue",
            Self::WinRate => "winRate",
        }
    }

    pub fn title(self) -> &'static str {
        match self {
            Self::WonDeals => "Выигранные сделки",
            Self::Revenue => "Стоимость сделок",
            Self::WinRate => "Конверсия (%)",
        }
    }

    pub fn value(self, row: &PerformanceRow) -> f64 {
        match self {
            Self::WonDeals => f64::from(row.won_deals),
            Self::Revenue => row.total_revenue,
            Self::WinRate => row.win_rate,
        }
    }

    /// Bar widths relative to the best owner (0..=1)
    pub fn shares(self, rows: &[PerformanceRow]) -> Vec<f64> {
        let max = rows.iter().map(|row| self.value(row)).fold(0.0, f64::max);
        rows.iter()
            .map(|row| if max > 0.0 { self.value(row) / max } else { 0.0 })
            .collect()
    }
}

// ========================
// Board summary
// ========================

#[derive(Debug, Clone, PartialEq)]
pub struct StageSummary {
    pub stage_id: StageId,
    pub name: String,
    pub count: usize,
    pub amount: f64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FunnelReport {
    pub stages: Vec<StageSummary>,
    pub won_count: usize,
    pub won_amount: f64,
    pub lost_count: usize,
    pub lost_amount: f64,
    /// Sum over open stages
    pub open_amount: f64,
}

impl FunnelReport {
    pub fn from_board(board: &FunnelBoard) -> Self {
        let mut report = Self::default();
        for column in &board.columns {
            report.stages.push(StageSummary {
                stage_id: column.stage.id,
                name: column.stage.name.clone(),
                count: column.count,
                amount: column.total,
            });
            if column.stage.is_won_terminal() {
                report.won_count += column.count;
                report.won_amount += column.total;
            } else if column.stage.is_lost() {
                report.lost_count += column.count;
                report.lost_amount += column.total;
            } else {
                report.open_amount += column.total;
            }
        }
        report
    }

    /// won / (won + lost), `None` until something has closed
    pub fn win_rate(&self) -> Option<f64> {
        let closed = self.won_count + self.lost_count;
        (closed > 0).then(|| self.won_count as f64 / closed as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::funnel::fixtures::{deal, funnel, stage, terminal_stage};
    use crate::models::{EmployeeCount, TrendPeriod};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_query_string() {
        assert_eq!(ReportQuery::new(25, ReportPeriod::Week).query_string(), "?funnel_id=25&period=week");

        let custom = ReportPeriod::Custom { start: Some(date(2025, 1, 1)), end: Some(date(2025, 3, 31)) };
        let query = ReportQuery::new(3, custom);
        assert_eq!(query.query_string(), "?funnel_id=3&period=custom&startDate=2025%2D01%2D01&endDate=2025%2D03%2D31");
        assert!(query.is_complete());

        let half = ReportQuery::new(3, ReportPeriod::Custom { start: Some(date(2025, 1, 1)), end: None });
        assert!(!half.is_complete());
        assert_eq!(half.query_string(), "?funnel_id=3&period=custom&startDate=2025%2D01%2D01");
    }

    #[test]
    fn test_period_keys_round_trip_presets() {
        for period in ReportPeriod::PRESETS {
            assert_eq!(ReportPeriod::from_key(period.key()), Some(period));
        }
        assert_eq!(ReportPeriod::from_key("custom"), Some(ReportPeriod::Custom { start: None, end: None }));
        assert_eq!(ReportPeriod::from_key("decade"), None);
    }

    #[test]
    fn test_export_file_names() {
        let today = date(2025, 5, 7);
        assert_eq!(
            ReportExport::Performance.file_name(ReportPeriod::Month, today),
            "Эффективность_месяц_май_2025_2025-05-07.xlsx"
        );
        assert_eq!(
            ReportExport::DealTrend.file_name(ReportPeriod::Quarter, today),
            "Динамика_закрытий_квартал_Q2_2025_2025-05-07.xlsx"
        );
        assert_eq!(ReportPeriod::Day.file_label(today), "день_7-5");
        assert_eq!(ReportPeriod::Week.file_label(today), "неделя_2025-05-07");
        assert_eq!(ReportPeriod::Year.file_label(today), "год_2025");
        let custom = ReportPeriod::Custom { start: Some(date(2025, 1, 1)), end: Some(date(2025, 2, 1)) };
        assert_eq!(custom.file_label(today), "с_2025-01-01_по_2025-02-01");
        assert_eq!(ReportPeriod::Custom { start: None, end: None }.file_label(today), "период_не_установлен");
    }

    #[test]
    fn test_funnel_bars_skip_lost_stage() {
        let row = |name: &str, count, rate| FunnelStageRow {
            stage_name: name.to_string(),
            count,
            total_amount: 0.0,
            conversion_rate: rate,
        };
        let bars = funnel_bars(&[
            row("Новая", 8, None),
            row("Переговоры", 4, Some(50.0)),
            row(LOST_STAGE_REPORT_NAME, 20, Some(12.5)),
        ]);

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].label, "Новая (8)");
        assert_eq!((bars[0].share, bars[1].share), (1.0, 0.5));
        assert_eq!((bars[0].conversion.as_str(), bars[1].conversion.as_str()), ("-", "50%"));
    }

    #[test]
    fn test_trend_series_per_owner() {
        let employee = |name: &str, count| EmployeeCount { owner_name: name.to_string(), count };
        let trend = DealTrend {
            periods: vec![
                TrendPeriod {
                    label: "2025-03-01".to_string(),
                    total: 3,
                    change_from_previous: 0.0,
                    by_employee: vec![employee("Олег", 2), employee("Анна", 1)],
                },
                TrendPeriod {
                    label: "2025-03-08".to_string(),
                    total: 4,
                    change_from_previous: 33.3,
                    by_employee: vec![employee("Анна", 4)],
                },
            ],
        };

        assert_eq!(trend.owners(), vec!["Олег".to_string(), "Анна".to_string()]);
        let all: Vec<u32> = trend.series(None).iter().map(|p| p.total).collect();
        assert_eq!(all, vec![3, 4]);
        let oleg: Vec<u32> = trend.series(Some("Олег")).iter().map(|p| p.total).collect();
        assert_eq!(oleg, vec![2, 0]);
        assert_eq!(format_change(33.3), "+33.3%");
        assert_eq!(format_change(-5.0), "-5%");
        assert_eq!(format_change(0.0), "0%");
    }

    #[test]
    fn test_performance_shares() {
        let row = |won, revenue| PerformanceRow {
            owner_name: String::new(),
            total_deals: 10,
            won_deals: won,
            lost_deals: 0,
            win_rate: 0.0,
            avg_deal_value: None,
            total_revenue: revenue,
        };
        let rows = vec![row(2, 500.0), row(4, 250.0)];
        assert_eq!(PerformanceMetric::WonDeals.shares(&rows), vec![0.5, 1.0]);
        assert_eq!(PerformanceMetric::Revenue.shares(&rows), vec![1.0, 0.5]);
        assert_eq!(PerformanceMetric::WinRate.shares(&rows), vec![0.0, 0.0]);
    }

    #[test]
    fn test_report_totals() {
        let board = FunnelBoard::assemble(
            funnel(1),
            vec![
                stage(1, 1, "Новая"),
                terminal_stage(2, 2, "Успешно", true),
                terminal_stage(3, 3, "Проиграна", false),
            ],
            vec![
                deal(1, Some(1), 100.0, 1),
                deal(2, Some(1), 50.0, 1),
                deal(3, Some(2), 1000.0, 1),
                deal(4, Some(3), 10.0, 1),
                deal(5, Some(3), 20.0, 1),
                deal(6, Some(2), 500.0, 1),
            ],
            None,
        );

        let report = FunnelReport::from_board(&board);

        assert_eq!(report.stages.len(), 3);
        assert_eq!(report.stages[0].count, 2);
        assert_eq!(report.open_amount, 150.0);
        assert_eq!((report.won_count, report.won_amount), (2, 1500.0));
        assert_eq!((report.lost_count, report.lost_amount), (2, 30.0));
        assert_eq!(report.win_rate(), Some(0.5));
    }

    #[test]
    fn test_no_closed_deals_has_no_win_rate() {
        let board = FunnelBoard::assemble(funnel(1), vec![stage(1, 1, "Новая")], vec![deal(1, Some(1), 5.0, 1)], None);
        assert_eq!(FunnelReport::from_board(&board).win_rate(), None);
    }
}
