//! Deposit receipts.
//!
//! A `Receipt` is a point-in-time snapshot of the session ledger. It can be
//! rendered as text for the terminal or serialized to JSON.

use anyhow::Result;
use serde::Serialize;
use std::fmt::Write as _;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::ledger::SessionLedger;

const RULE_WIDTH: usize = 40;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ReceiptLine {
    pub category: String,
    pub count: u64,
    /// Sum over the category, in minor units.
    pub value: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Receipt {
    pub session_id: String,
    pub issued_at_epoch_s: u64,
    pub lines: Vec<ReceiptLine>,
    pub total_items: u64,
    pub total_value: u64,
    /// SHA-256 of each saved image, in commit order.
    pub image_digests: Vec<String>,
}

impl Receipt {
    pub fn from_ledger(session_id: &str, ledger: &SessionLedger) -> Result<Self> {
        let issued_at_epoch_s = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs();
        let lines: Vec<ReceiptLine> = ledger
            .totals_by_category()
            .into_iter()
            .map(|(category, total)| ReceiptLine {
                category,
                count: total.count,
                value: total.value,
            })
            .collect();
        let total_items = lines.iter().map(|line| line.count).sum();
        Ok(Self {
            session_id: session_id.to_string(),
            issued_at_epoch_s,
            lines,
            total_items,
            total_value: ledger.running_total(),
            image_digests: ledger
                .saved_images()
                .iter()
                .map(|image| image.digest_hex())
                .collect(),
        })
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn render_text(&self) -> String {
        let rule = "=".repeat(RULE_WIDTH);
        let mut out = String::new();
        let _ = writeln!(out, "Recycling Deposit Receipt");
        let _ = writeln!(out, "Session: {}", self.session_id);
        let _ = writeln!(out, "Issued: {} (unix)", self.issued_at_epoch_s);
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Items by Material Type:");
        for line in &self.lines {
            let _ = writeln!(
                out,
                "{}: {} x {}",
                line.category,
                line.count,
                format_euros(line.value)
            );
        }
        let _ = writeln!(out, "{rule}");
        let _ = writeln!(out, "Total Items: {}", self.total_items);
        let _ = writeln!(out, "Total Value: {}", format_euros(self.total_value));
        let _ = writeln!(out, "{rule}");
        out
    }
}

/// `150` -> `"1.50 €"`.
pub fn format_euros(minor_units: u64) -> String {
    format!("{}.{:02} €", minor_units / 100, minor_units % 100)
}
