// src/aggregate/deals.rs
use super::{percent, AggregateContext, Keyed, Summarize, Tally};
use crate::dates::Dated;
use crate::normalize::{DealRecord, TargetRecord};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DealMetrics {
    pub total_deals: u64,
    pub completed_deals: u64,
    pub pending_deals: u64,
    pub total_revenue: f64,
    pub total_revenue_display: String,
    pub deals_this_month: u64,
    pub revenue_this_month: f64,
    pub target_this_month: f64,
    /// Month revenue against target, rounded percent.
    pub target_progress: u64,
    /// Completed over all deals, rounded percent.
    pub conversion_rate: u64,
    pub deals_by_project: Tally,
    pub revenue_by_project: Keyed<f64>,
}

/// Rupee amount with Indian digit grouping, whole rupees: `₹1,20,00,000`.
pub fn format_inr(amount: f64) -> String {
    if !amount.is_finite() {
        return "₹0".to_string();
    }
    let rounded = amount.round();
    let digits = format!("{}", rounded.abs() as u64);
    let grouped = if digits.len() <= 3 {
        digits
    } else {
        let (head, last3) = digits.split_at(digits.len() - 3);
        let mut parts: Vec<&str> = Vec::new();
        let mut rest = head;
        while rest.len() > 2 {
            let (h, t) = rest.split_at(rest.len() - 2);
            parts.push(t);
            rest = h;
        }
        parts.push(rest);
        parts.reverse();
        format!("{},{}", parts.join(","), last3)
    };
    if rounded < 0.0 {
        format!("-₹{}", grouped)
    } else {
        format!("₹{}", grouped)
    }
}

/// Sum of the targets whose month names the current month or year.
fn month_target(targets: &[TargetRecord], today: NaiveDate, default: f64) -> f64 {
    let month = today.format("%B").to_string().to_lowercase();
    let year = today.year().to_string();
    let current: Vec<&TargetRecord> = targets
        .iter()
        .filter(|t| t.month.to_lowercase().contains(&month) || t.month.contains(&year))
        .collect();
    if current.is_empty() {
        default
    } else {
        current.iter().map(|t| t.target).sum()
    }
}

impl Dated for DealRecord {
    fn record_date(&self) -> Option<NaiveDate> {
        Some(self.date)
    }
}

impl Summarize for DealRecord {
    type Snapshot = DealMetrics;

    fn summarize(records: &[&Self], ctx: &AggregateContext<'_>) -> DealMetrics {
        let total_deals = records.len() as u64;
        let completed_deals = records.iter().filter(|d| d.is_completed()).count() as u64;
        let pending_deals = records.iter().filter(|d| d.is_pending()).count() as u64;
        let total_revenue: f64 = records.iter().map(|d| d.value).sum();

        let this_month: Vec<&&DealRecord> = records
            .iter()
            .filter(|d| d.date.year() == ctx.today.year() && d.date.month() == ctx.today.month())
            .collect();
        let revenue_this_month: f64 = this_month.iter().map(|d| d.value).sum();
        let target_this_month = month_target(ctx.targets, ctx.today, ctx.revenue_target);

        let mut deals_by_project = Tally::new();
        let mut revenue_by_project = Keyed::<f64>::new();
        for d in records {
            deals_by_project.bump(&d.project);
            *revenue_by_project.entry_or_default(&d.project) += d.value;
        }

        let target_progress = if target_this_month > 0.0 {
            ((revenue_this_month / target_this_month) * 100.0).round().max(0.0) as u64
        } else {
            0
        };

        DealMetrics {
            total_deals,
            completed_deals,
            pending_deals,
            total_revenue,
            total_revenue_display: format_inr(total_revenue),
            deals_this_month: this_month.len() as u64,
            revenue_this_month,
            target_this_month,
            target_progress,
            conversion_rate: percent(completed_deals, total_deals),
            deals_by_project,
            revenue_by_project,
        }
    }
}
