//! Output formatting and display logic for serpwatch reports

use serde::Serialize;

use crate::core::constants::output_formats;
use crate::core::error::Result;
use crate::core::types::Percent;
use crate::engine::SourceOutcome;
use crate::insights::{
    CannibalizationReport, CtrAnalysis, DecayReport, DropAlertReport, IndexingHealthReport,
    KeywordDiff, PageHealthDashboard, PeriodComparison, QuickWinReport, SearchTypeBreakdown,
    SerpFeatureTrends,
};
use crate::ui::color::{Colors, colorize, colorize_change};

/// A report that can be drawn as a text table.
pub trait Tabular {
    fn title(&self) -> String;

    fn headers(&self) -> Vec<&'static str>;

    fn rows(&self) -> Vec<Vec<String>>;

    /// Lines printed under the table.
    fn summary(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Render `report` in `format` (text or JSON).
pub fn render<R>(report: &R, format: &str) -> Result<String>
where
    R: Serialize + Tabular,
{
    match format {
        output_formats::JSON => Ok(serde_json::to_string_pretty(report)?),
        _ => Ok(render_text(report)),
    }
}

/// Display a report on stdout
pub fn display_report<R>(report: &R, format: &str) -> Result<()>
where
    R: Serialize + Tabular,
{
    println!("{}", render(report, format)?);
    Ok(())
}

pub fn render_text(report: &dyn Tabular) -> String {
    let mut out = String::new();
    let title_style = format!("{}{}", Colors::BOLD, Colors::BRIGHT_CYAN);
    out.push_str(&colorize(&report.title(), &title_style));
    out.push('\n');

    let rows = report.rows();
    if rows.is_empty() {
        out.push_str(&colorize("No rows", Colors::DIM));
        out.push('\n');
    } else {
        out.push_str(&format_table(&report.headers(), &rows));
    }

    for line in report.summary() {
        out.push_str(&line);
        out.push('\n');
    }
    out
}

/// Left-aligned columns sized to the widest cell.
pub fn format_table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            let len = visible_width(cell);
            match widths.get_mut(i) {
                Some(w) => *w = (*w).max(len),
                None => widths.push(len),
            }
        }
    }

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    push_row(&mut out, &header_cells, &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    push_row(&mut out, &rule, &widths);
    for row in rows {
        push_row(&mut out, row, &widths);
    }
    out
}

fn push_row(out: &mut String, cells: &[String], widths: &[usize]) {
    let line: Vec<String> = cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| {
            let pad = width.saturating_sub(visible_width(cell));
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

/// Width of `text` without ANSI escape sequences.
fn visible_width(text: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in text.chars() {
        match (in_escape, c) {
            (false, '\x1b') => in_escape = true,
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, _) => width += 1,
        }
    }
    width
}

fn pct(value: f64) -> String {
    format!("{value:.1}%")
}

fn ctr(value: f64) -> String {
    pct(value * 100.0)
}

fn change(value: Percent) -> String {
    colorize_change(value)
}

fn outcome<T>(settled: &SourceOutcome<T>, describe: impl Fn(&T) -> String) -> String {
    match settled {
        SourceOutcome::Ok(value) => describe(value),
        SourceOutcome::Failed(failure) => {
            let text = match &failure.code {
                Some(code) => format!("error: {} ({code})", failure.error),
                None => format!("error: {}", failure.error),
            };
            colorize(&text, Colors::BRIGHT_RED)
        }
    }
}

fn optional(value: Option<f64>, unit: &str) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.0}{unit}"))
}

impl Tabular for PeriodComparison {
    fn title(&self) -> String {
        format!(
            "Period comparison: {} vs {}",
            self.windows.period_a, self.windows.period_b
        )
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Key", "Clicks", "Prev", "Change", "Impr.", "Prev", "Change", "Position", "Prev"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.rows
            .iter()
            .map(|row| {
                vec![
                    row.keys.to_string(),
                    row.current.clicks.to_string(),
                    row.previous.clicks.to_string(),
                    change(row.change.clicks),
                    row.current.impressions.to_string(),
                    row.previous.impressions.to_string(),
                    change(row.change.impressions),
                    format!("{:.1}", row.current.position),
                    format!("{:.1}", row.previous.position),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<String> {
        vec![format!(
            "Total clicks: {} (was {}, {})",
            self.totals.current.clicks,
            self.totals.previous.clicks,
            change(self.totals.change.clicks)
        )]
    }
}

impl Tabular for DecayReport {
    fn title(&self) -> String {
        format!(
            "Content decay: {} vs {}",
            self.windows.period_a, self.windows.period_b
        )
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Page", "Prior", "Recent", "Lost", "Decline", "Position"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.pages
            .iter()
            .map(|p| {
                vec![
                    p.page.clone(),
                    p.prior_clicks.to_string(),
                    p.recent_clicks.to_string(),
                    p.clicks_lost.to_string(),
                    pct(p.decline_percent),
                    match p.recent_position {
                        Some(recent) => format!("{:.1} -> {:.1}", p.prior_position, recent),
                        None => format!("{:.1} -> -", p.prior_position),
                    },
                ]
            })
            .collect()
    }
}

impl Tabular for CannibalizationReport {
    fn title(&self) -> String {
        format!("Cannibalization: {}", self.range)
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Query", "Page", "Clicks", "Impr.", "Position", "Action"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let mut rows = Vec::new();
        for query in &self.queries {
            for page in &query.pages {
                let action = match &query.recommendation {
                    Some(rec) if rec.winner == page.page => "keep".to_string(),
                    Some(rec) => rec
                        .losers
                        .iter()
                        .find(|l| l.page == page.page)
                        .map(|l| l.action.to_string())
                        .unwrap_or_default(),
                    None => String::new(),
                };
                rows.push(vec![
                    query.query.clone(),
                    page.page.clone(),
                    page.clicks.to_string(),
                    page.impressions.to_string(),
                    format!("{:.1}", page.position),
                    action,
                ]);
            }
        }
        rows
    }

    fn summary(&self) -> Vec<String> {
        vec![format!("{} competing queries", self.queries.len())]
    }
}

impl Tabular for KeywordDiff {
    fn title(&self) -> String {
        format!(
            "Keyword changes: {} vs {}",
            self.windows.period_a, self.windows.period_b
        )
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Status", "Query", "Clicks", "Impr.", "Position"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        let tagged = self
            .new_keywords
            .iter()
            .map(|k| (colorize("new", Colors::BRIGHT_GREEN), k))
            .chain(
                self.lost_keywords
                    .iter()
                    .map(|k| (colorize("lost", Colors::BRIGHT_RED), k)),
            );
        tagged
            .map(|(status, k)| {
                vec![
                    status,
                    k.query.clone(),
                    k.clicks.to_string(),
                    k.impressions.to_string(),
                    format!("{:.1}", k.position),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<String> {
        vec![format!(
            "{} new, {} lost",
            self.new_keywords.len(),
            self.lost_keywords.len()
        )]
    }
}

impl Tabular for QuickWinReport {
    fn title(&self) -> String {
        format!("Quick wins: {}", self.range)
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Query", "Page", "Impr.", "CTR", "Position", "Potential"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.wins
            .iter()
            .map(|w| {
                vec![
                    w.query.clone(),
                    w.page.clone(),
                    w.impressions.to_string(),
                    ctr(w.ctr),
                    format!("{:.1}", w.position),
                    format!("+{}", w.potential_clicks),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<String> {
        let total: u64 = self.wins.iter().map(|w| w.potential_clicks).sum();
        vec![format!(
            "+{total} clicks at a {} CTR",
            ctr(self.target_ctr)
        )]
    }
}

impl Tabular for CtrAnalysis {
    fn title(&self) -> String {
        format!("CTR vs benchmark: {}", self.range)
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Query", "Position", "CTR", "Expected", "Gap", "Missed"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .map(|e| {
                vec![
                    e.query.clone(),
                    format!("{:.1}", e.position),
                    ctr(e.ctr),
                    ctr(e.expected_ctr),
                    ctr(e.ctr_gap),
                    e.missed_clicks.to_string(),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<String> {
        vec![format!(
            "{} analyzed: {} under, {} at or above benchmark",
            self.analyzed, self.underperforming, self.outperforming
        )]
    }
}

impl Tabular for SearchTypeBreakdown {
    fn title(&self) -> String {
        format!("Search types: {}", self.range)
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Type", "Clicks", "Impr.", "CTR", "Position", "Share"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.types
            .iter()
            .map(|t| {
                vec![
                    t.search_type.as_str().to_string(),
                    t.metrics.clicks.to_string(),
                    t.metrics.impressions.to_string(),
                    ctr(t.metrics.ctr),
                    format!("{:.1}", t.metrics.position),
                    pct(t.click_share),
                ]
            })
            .collect()
    }
}

impl Tabular for SerpFeatureTrends {
    fn title(&self) -> String {
        match (self.windows.first(), self.windows.last()) {
            (Some(first), Some(last)) => format!(
                "SERP features: {} windows, {} to {}",
                self.windows.len(),
                first.start_date,
                last.end_date
            ),
            _ => "SERP features".to_string(),
        }
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Feature", "Clicks per window", "Clicks", "Impressions"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.features
            .iter()
            .map(|(name, trend)| {
                let series: Vec<String> = trend
                    .points
                    .iter()
                    .map(|p| p.metrics.clicks.to_string())
                    .collect();
                vec![
                    name.clone(),
                    series.join(" "),
                    change(trend.clicks_change),
                    change(trend.impressions_change),
                ]
            })
            .collect()
    }
}

impl Tabular for DropAlertReport {
    fn title(&self) -> String {
        format!(
            "Drop alerts (>= {}): {} vs {}",
            pct(self.threshold_percent),
            self.windows.period_a,
            self.windows.period_b
        )
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Page", "Prior", "Recent", "Lost", "Drop"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.alerts
            .iter()
            .map(|a| {
                vec![
                    a.page.clone(),
                    a.prior_clicks.to_string(),
                    a.recent_clicks.to_string(),
                    a.clicks_lost.to_string(),
                    colorize(&pct(a.drop_percent), Colors::BRIGHT_RED),
                ]
            })
            .collect()
    }

    fn summary(&self) -> Vec<String> {
        if self.alerts.is_empty() {
            vec![colorize("No drops above the threshold", Colors::BRIGHT_GREEN)]
        } else {
            Vec::new()
        }
    }
}

impl Tabular for PageHealthDashboard {
    fn title(&self) -> String {
        format!("Page health: {}", self.url)
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["Source", "Result"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        vec![
            vec![
                "Index status".to_string(),
                outcome(&self.inspection, |i| format!("{} ({})", i.verdict, i.coverage_state)),
            ],
            vec![
                "Search traffic".to_string(),
                outcome(&self.analytics, |t| {
                    format!(
                        "{} clicks, {} impressions, position {:.1} ({})",
                        t.metrics.clicks, t.metrics.impressions, t.metrics.position, t.range
                    )
                }),
            ],
            vec![
                "Lab performance".to_string(),
                outcome(&self.performance, |p| {
                    format!(
                        "score {}, LCP {}, TBT {}",
                        optional(p.performance_score, ""),
                        optional(p.lcp_ms, "ms"),
                        optional(p.tbt_ms, "ms")
                    )
                }),
            ],
            vec![
                "Field experience".to_string(),
                outcome(&self.field_experience, |f| {
                    format!(
                        "{}, LCP p75 {}, INP p75 {}",
                        f.overall_category.as_deref().unwrap_or("no data"),
                        optional(f.lcp_p75_ms, "ms"),
                        optional(f.inp_p75_ms, "ms")
                    )
                }),
            ],
        ]
    }

    fn summary(&self) -> Vec<String> {
        vec![format!(
            "{}/{} sources available",
            self.sources_ok,
            PageHealthDashboard::SOURCES
        )]
    }
}

impl Tabular for IndexingHealthReport {
    fn title(&self) -> String {
        format!("Indexing health: {} URLs", self.total)
    }

    fn headers(&self) -> Vec<&'static str> {
        vec!["URL", "Verdict", "Coverage"]
    }

    fn rows(&self) -> Vec<Vec<String>> {
        self.entries
            .iter()
            .map(|e| match &e.inspection {
                SourceOutcome::Ok(result) => vec![
                    e.url.clone(),
                    result.verdict.clone(),
                    result.coverage_state.clone(),
                ],
                failed => vec![e.url.clone(), outcome(failed, |_| String::new()), String::new()],
            })
            .collect()
    }

    fn summary(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "{} inspected, {} failed",
            self.inspected, self.failed
        )];
        lines.extend(
            self.by_coverage_state
                .iter()
                .map(|(state, count)| format!("  {count:>4}  {state}")),
        );
        lines
    }
}
