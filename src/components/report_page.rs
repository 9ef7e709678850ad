//! Report Page Component
//!
//! Backend reports for the loaded funnel and a chosen period: revenue,
//! funnel stages with conversion, closing trend and per-owner
//! performance, each exportable as a spreadsheet. When the reports cannot
//! be fetched, a summary of the loaded board is shown instead.

use chrono::Local;
use leptos::prelude::*;
use leptos::task::spawn_local;
use tracing::warn;
use wasm_bindgen::{JsCast, JsValue};

use super::funnel_board::{load_board, use_board_store};
use crate::api::{self, ReportBundle};
use crate::context::use_app_context;
use crate::error::ApiError;
use crate::funnel::{deals_label, format_amount, format_date, parse_date};
use crate::models::{DealTrend, FunnelStageRow, PerformanceRow, RevenueSummary};
use crate::report::{
    format_change, funnel_bars, FunnelReport, PerformanceMetric, ReportExport, ReportFile, ReportPeriod, ReportQuery,
    XLSX_MIME,
};

#[component]
pub fn ReportPage() -> impl IntoView {
    let ctx = use_app_context();
    let (board_store, state) = use_board_store(ctx);
    load_board(ctx, board_store);

    let (period, set_period) = signal(ReportPeriod::default());
    let (bundle, set_bundle) = signal(None::<ReportBundle>);
    let (loading, set_loading) = signal(false);
    let (failure, set_failure) = signal(None::<String>);

    let query = Memo::new(move |_| {
        let funnel_id = state.with(|s| s.board.as_ref().map(|board| board.funnel.id))?;
        Some(ReportQuery::new(funnel_id, period.get()))
    });
    let fallback = Memo::new(move |_| state.with(|s| s.board.as_ref().map(FunnelReport::from_board)));

    // Refetch on funnel or period change; a stale response is dropped
    Effect::new(move |_| {
        let Some(current) = query.get().filter(ReportQuery::is_complete) else {
            return;
        };
        set_loading.set(true);
        let api = ctx.api();
        spawn_local(async move {
            let result = api::load_reports(&api, &current).await;
            if query.try_get_untracked().flatten() != Some(current) {
                return;
            }
            match result {
                Ok(reports) => {
                    let _ = set_bundle.try_set(Some(reports));
                    let _ = set_failure.try_set(None);
                }
                Err(ApiError::Cancelled) => {}
                Err(err) => {
                    warn!(error = %err, "could not load reports");
                    let _ = set_bundle.try_set(None);
                    let _ = set_failure.try_set(Some(err.user_message()));
                }
            }
            let _ = set_loading.try_set(false);
        });
    });

    let export = move |kind: ReportExport| {
        let Some(current) = query.get_untracked() else {
            return;
        };
        let api = ctx.api();
        spawn_local(async move {
            let today = Local::now().date_naive();
            match api::export_report(&api, kind, &current, today).await {
                Ok(file) => {
                    if let Err(err) = save_file(&file) {
                        warn!(?err, name = %file.name, "could not hand the export to the browser");
                        ctx.notify_error("Не удалось сохранить файл");
                    }
                }
                Err(err) => ctx.notify_error(format!("Не удалось выгрузить отчёт: {}", err.user_message())),
            }
        });
    };

    let on_period = move |ev: web_sys::Event| {
        let Some(next) = ReportPeriod::from_key(&event_target_value(&ev)) else {
            return;
        };
        set_period.update(|current| {
            // Keep picked dates when custom is chosen again
            if !matches!((*current, next), (ReportPeriod::Custom { .. }, ReportPeriod::Custom { .. })) {
                *current = next;
            }
        });
    };

    let set_bound = move |is_start: bool, value: String| {
        set_period.update(|current| {
            if let ReportPeriod::Custom { start, end } = current {
                let date = parse_date(&value);
                if is_start {
                    *start = date;
                } else {
                    *end = date;
                }
            }
        });
    };

    view! {
        <div class="entity-page report-page">
            <div class="entity-toolbar">
                <h2>"Отчёты"</h2>
                <select class="report-period" on:change=on_period>
                    <option value="custom" selected=move || matches!(period.get(), ReportPeriod::Custom { .. })>
                        {ReportPeriod::Custom { start: None, end: None }.title()}
                    </option>
                    {ReportPeriod::PRESETS
                        .into_iter()
                        .map(|preset| {
                            view! {
                                <option value=preset.key() selected=move || period.get() == preset>
                                    {preset.title()}
                                </option>
                            }
                        })
                        .collect_view()}
                </select>
                <Show when=move || matches!(period.get(), ReportPeriod::Custom { .. })>
                    <label>
                        "С"
                        <input type="date" on:change=move |ev| set_bound(true, event_target_value(&ev)) />
                    </label>
                    <label>
                        "по"
                        <input type="date" on:change=move |ev| set_bound(false, event_target_value(&ev)) />
                    </label>
                </Show>
            </div>

            <div class="report-exports">
                {ReportExport::ALL
                    .into_iter()
                    .map(|kind| {
                        view! {
                            <button
                                class="secondary-btn"
                                disabled=move || query.get().is_none()
                                on:click=move |_| export(kind)
                            >
                                {kind.title()}
                            </button>
                        }
                    })
                    .collect_view()}
            </div>

            <Show when=move || loading.get() || state.with(|s| s.loading && s.board.is_none())>
                <div class="funnel-loading">"Загрузка…"</div>
            </Show>

            {move || {
                bundle
                    .get()
                    .map(|reports| {
                        view! {
                            <RevenueCards revenue=reports.revenue />
                            <FunnelSection rows=reports.funnel />
                            <TrendSection trend=reports.trend />
                            <PerformanceSection rows=reports.performance />
                        }
                    })
            }}

            {move || {
                failure
                    .get()
                    .map(|message| {
                        view! {
                            <div class="form-error">{format!("Не удалось загрузить данные отчётов: {message}")}</div>
                            {fallback.get().map(|report| view! { <BoardSummary report=report /> })}
                        }
                    })
            }}
        </div>
    }
}

/// Offer the file to the user through a temporary object URL
fn save_file(file: &ReportFile) -> Result<(), JsValue> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(file.bytes.as_slice()));
    let options = web_sys::BlobPropertyBag::new();
    options.set_type(XLSX_MIME);
    let blob = web_sys::Blob::new_with_u8_array_sequence_and_options(&parts, &options)?;
    let url = web_sys::Url::create_object_url_with_blob(&blob)?;

    let document = web_sys::window()
        .and_then(|window| window.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let link = document.create_element("a")?.dyn_into::<web_sys::HtmlAnchorElement>()?;
    link.set_href(&url);
    link.set_download(&file.name);
    link.click();
    web_sys::Url::revoke_object_url(&url)
}

#[component]
fn RevenueCards(revenue: RevenueSummary) -> impl IntoView {
    let average = revenue.avg_deal_value.map_or_else(|| "—".to_string(), format_amount);
    view! {
        <div class="report-cards">
            <div class="report-card won">
                <div class="report-label">"Доход"</div>
                <div class="report-amount">{format_amount(revenue.total_revenue)}</div>
            </div>
            <div class="report-card">
                <div class="report-label">"Выиграно"</div>
                <div class="report-value">{deals_label(revenue.total_won_deals as usize)}</div>
            </div>
            <div class="report-card">
                <div class="report-label">"Средний чек"</div>
                <div class="report-amount">{average}</div>
            </div>
            <div class="report-card rate">
                <div class="report-label">"Конверсия"</div>
                <div class="report-value">{format!("{}%", revenue.win_rate)}</div>
            </div>
        </div>
    }
}

#[component]
fn FunnelSection(rows: Vec<FunnelStageRow>) -> impl IntoView {
    let bars = funnel_bars(&rows);
    let empty = rows.is_empty();

    view! {
        <section class="report-section">
            <h3>"Воронка продаж"</h3>
            <table class="entity-table">
                <thead>
                    <tr>
                        <th>"Этап"</th>
                        <th>"Сделки"</th>
                        <th>"Сумма"</th>
                    </tr>
                </thead>
                <tbody>
                    {empty.then(|| view! { <tr><td colspan="3">"Нет данных о воронке"</td></tr> })}
                    {rows
                        .into_iter()
                        .map(|row| {
                            view! {
                                <tr>
                                    <td>{row.stage_name}</td>
                                    <td>{row.count}</td>
                                    <td>{format_amount(row.total_amount)}</td>
                                </tr>
                            }
                        })
                        .collect_view()}
                </tbody>
            </table>
            <div class="report-bars">
                {bars
                    .into_iter()
                    .map(|bar| {
                        view! {
                            <div class="report-bar-row">
                                <span class="report-bar-label">{bar.label}</span>
                                <div class="report-bar" style=format!("width: {:.0}%", bar.share * 100.0)></div>
                                <span class="report-bar-note">{bar.conversion}</span>
                            </div>
                        }
                    })
                    .collect_view()}
            </div>
        </section>
    }
}

#[component]
fn TrendSection(trend: DealTrend) -> impl IntoView {
    let (owner, set_owner) = signal(None::<String>);
    let owners = trend.owners();
    let trend = StoredValue::new(trend);
    let points = move || trend.with_value(|trend| owner.with(|owner| trend.series(owner.as_deref())));

    view! {
        <section class="report-section">
            <h3>"Динамика закрытий"</h3>
            <select on:change=move |ev| {
                let value = event_target_value(&ev);
                set_owner.set((!value.is_empty()).then_some(value));
            }>
                <option value="">"Все менеджеры"</option>
                {owners.into_iter().map(|name| view! { <option value=name.clone()>{name.clone()}</option> }).collect_view()}
            </select>
            <table class="entity-table">
                <thead>
                    <tr>
                        <th>"Дата"</th>
                        <th>"Сделок"</th>
                        <th>"Изменение (%)"</th>
                    </tr>
                </thead>
                <tbody>
                    {move || {
                        points()
                            .into_iter()
                            .map(|point| {
                                let class = if point.change > 0.0 {
                                    "trend-up"
                                } else if point.change < 0.0 {
                                    "trend-down"
                                } else {
                                    ""
                                };
                                view! {
                                    <tr>
                                        <td>{format_date(&point.label)}</td>
                                        <td>{point.total}</td>
                                        <td class=class>{format_change(point.change)}</td>
                                    </tr>
                                }
                            })
                            .collect_view()
                    }}
                </tbody>
            </table>
        </section>
    }
}

#[component]
fn PerformanceSection(rows: Vec<PerformanceRow>) -> impl IntoView {
    let (metric, set_metric) = signal(PerformanceMetric::default());
    let rows = StoredValue::new(rows);

    let bars = move || {
        let metric = metric.get();
        rows.with_value(|rows| {
            metric
                .shares(rows)
                .into_iter()
                .zip(rows.iter())
                .map(|(share, row)| {
                    let value = metric.value(row);
                    view! {
                        <div class="report-bar-row">
                            <span class="report-bar-label">{row.owner_name.clone()}</span>
                            <div class="report-bar" style=format!("width: {:.0}%", share * 100.0)></div>
                            <span class="report-bar-note">{value.to_string()}</span>
                        </div>
                    }
                })
                .collect_view()
        })
    };

    view! {
        <section class="report-section">
            <h3>"Эффективность менеджеров"</h3>
            <table class="entity-table">
                <thead>
                    <tr>
                        <th>"Менеджер"</th>
                        <th>"Всего сделок"</th>
                        <th>"Выиграно"</th>
                        <th>"Проиграно"</th>
                        <th>"Конверсия"</th>
                        <th>"Средний чек"</th>
                        <th>"Доход"</th>
                    </tr>
                </thead>
                <tbody>
                    {rows
                        .with_value(Vec::is_empty)
                        .then(|| view! { <tr><td colspan="7">"Нет данных об эффективности"</td></tr> })}
                    {rows
                        .get_value()
                        .into_iter()
                        .map(|row| {
                            view! {
                                <tr>
                                    <td>{row.owner_name}</td>
                                    <td>{row.total_deals}</td>
                                    <td>{row.won_deals}</td>
                                    <td>{row.lost_deals}</td>
                                    <td>{format!("{}%", row.win_rate)}</td>
                                    <td>{row.avg_deal_value.map_or_else(|| "-".to_string(), format_amount)}</td>
                                    <td>{format_amount(row.total_revenue)}</td>
                                </tr>
                            }
                        })
                        .collect_view()}
                </tbody>
            </table>
            <select on:change=move |ev| {
                let key = event_target_value(&ev);
                if let Some(next) = PerformanceMetric::ALL.into_iter().find(|m| m.key() == key) {
                    set_metric.set(next);
                }
            }>
                {PerformanceMetric::ALL
                    .into_iter()
                    .map(|m| view! { <option value=m.key()>{m.title()}</option> })
                    .collect_view()}
            </select>
            <div class="report-bars">{bars}</div>
        </section>
    }
}

/// Figures from the loaded board
#[component]
fn BoardSummary(report: FunnelReport) -> impl IntoView {
    let win_rate = report
        .win_rate()
        .map(|rate| format!("{:.0}%", rate * 100.0))
        .unwrap_or_else(|| "—".to_string());

    view! {
        <section class="report-section">
            <h3>"Сводка по доске"</h3>
            <div class="report-cards">
                <div class="report-card won">
                    <div class="report-label">"Успешные"</div>
                    <div class="report-value">{deals_label(report.won_count)}</div>
                    <div class="report-amount">{format_amount(report.won_amount)}</div>
                </div>
                <div class="report-card lost">
                    <div class="report-label">"Проигранные"</div>
                    <div class="report-value">{deals_label(report.lost_count)}</div>
                    <div class="report-amount">{format_amount(report.lost_amount)}</div>
                </div>
                <div class="report-card open">
                    <div class="report-label">"В работе"</div>
                    <div class="report-amount">{format_amount(report.open_amount)}</div>
                </div>
                <div class="report-card rate">
                    <div class="report-label">"Конверсия"</div>
                    <div class="report-value">{win_rate}</div>
                </div>
            </div>
            <table class="entity-table report-stages">
                <thead>
                    <tr>
                        <th>"Этап"</th>
                        <th>"Сделки"</th>
                        <th>"Сумма"</th>
                    </tr>
                </thead>
                <tbody>
                    {report
                        .stages
                        .into_iter()
                        .map(|stage| {
                            view! {
                                <tr>
                                    <td>{stage.name}</td>
                                    <td>{stage.count}</td>
                                    <td>{format_amount(stage.amount)}</td>
                                </tr>
                            }
                        })
                        .collect_view()}
                </tbody>
            </table>
        </section>
    }
}
