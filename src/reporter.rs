use std::collections::{BTreeMap, HashMap};

use anyhow::{Context, Result};
use rust_xlsxwriter::{Format, Workbook};
use serde::Serialize;

use crate::types::{FeeRecord, WalletResult};

/// Per-fee output, one record per matched fee.
pub const DETAILED_JSON_PATH: &str = "fees_detailed.json";

/// Aggregated totals keyed by fee payer.
pub const SUMMARY_JSON_PATH: &str = "fees_summary.json";

/// One row per input wallet, in wallet-file order.
pub const SPREADSHEET_PATH: &str = "relay_fees_results.xlsx";

/// Aggregate view written to `fees_summary.json`.
#[derive(Debug, Serialize)]
pub struct FeesSummary {
    pub total_fees_count: usize,
    pub total_amount_usd: f64,
    pub target_recipient: String,
    pub wallets_processed: usize,
    pub fees_by_wallet: BTreeMap<String, WalletFees>,
}

/// Per-payer rollup inside the summary.
#[derive(Debug, Default, Serialize)]
pub struct WalletFees {
    pub count: usize,
    pub total_usd: f64,
}

/// One spreadsheet row: wallet as listed, fee count, formatted total.
#[derive(Debug, Clone, PartialEq)]
pub struct SpreadsheetRow {
    pub wallet: String,
    pub tx_count: usize,
    pub total: String,
}

/// Build the aggregate summary over every matched fee.
///
/// `wallets_processed` counts distinct payer addresses seen in the fees,
/// which can be fewer than the wallets scanned. The per-payer map is keyed
/// by the `user` field as the API served it.
pub fn build_summary(all_fees: &[FeeRecord], total_amount: f64) -> FeesSummary {
    let mut fees_by_wallet: BTreeMap<String, WalletFees> = BTreeMap::new();
    for fee in all_fees {
        let entry = fees_by_wallet.entry(fee.user.clone()).or_default();
        entry.count += 1;
        entry.total_usd += fee.amount_usd;
    }

    FeesSummary {
        total_fees_count: all_fees.len(),
        total_amount_usd: total_amount,
        target_recipient: crate::TARGET_RECIPIENT.to_string(),
        wallets_processed: fees_by_wallet.len(),
        fees_by_wallet,
    }
}

/// Write every matched fee as pretty-printed JSON.
pub fn write_detailed_json(all_fees: &[FeeRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(all_fees).context("failed to serialize fees")?;
    std::fs::write(DETAILED_JSON_PATH, json)
        .with_context(|| format!("failed to write {DETAILED_JSON_PATH}"))?;
    Ok(())
}

/// Write the aggregate summary as pretty-printed JSON.
pub fn write_summary_json(summary: &FeesSummary) -> Result<()> {
    let json = serde_json::to_string_pretty(summary).context("failed to serialize summary")?;
    std::fs::write(SUMMARY_JSON_PATH, json)
        .with_context(|| format!("failed to write {SUMMARY_JSON_PATH}"))?;
    Ok(())
}

/// Assemble one row per input wallet, in wallet-file order.
///
/// Results join to the wallet list case-insensitively. Wallets whose run
/// produced nothing get a zero row, so the sheet always covers the full
/// input list.
pub fn build_rows(results: &[WalletResult], wallet_order: &[String]) -> Vec<SpreadsheetRow> {
    let by_wallet: HashMap<String, &WalletResult> = results
        .iter()
        .map(|r| (r.wallet.to_lowercase(), r))
        .collect();

    wallet_order
        .iter()
        .map(|wallet| match by_wallet.get(&wallet.to_lowercase()) {
            Some(result) => SpreadsheetRow {
                wallet: wallet.clone(),
                tx_count: result.tx_count,
                total: format!("${:.2}", result.total_amount),
            },
            None => SpreadsheetRow {
                wallet: wallet.clone(),
                tx_count: 0,
                total: "$0.00".to_string(),
            },
        })
        .collect()
}

/// Write the per-wallet spreadsheet. Produced even when no fees were found.
pub fn write_spreadsheet(results: &[WalletResult], wallet_order: &[String]) -> Result<()> {
    let rows = build_rows(results, wallet_order);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let bold = Format::new().set_bold();

    worksheet.write_string_with_format(0, 0, "Wallet address", &bold)?;
    worksheet.write_string_with_format(0, 1, "Tx count", &bold)?;
    worksheet.write_string_with_format(0, 2, "Total fees", &bold)?;
    worksheet.set_column_width(0, 45)?;
    worksheet.set_column_width(2, 16)?;

    for (i, row) in rows.iter().enumerate() {
        let r = (i + 1) as u32;
        worksheet.write_string(r, 0, &row.wallet)?;
        worksheet.write_number(r, 1, row.tx_count as f64)?;
        worksheet.write_string(r, 2, &row.total)?;
    }

    workbook
        .save(SPREADSHEET_PATH)
        .with_context(|| format!("failed to write {SPREADSHEET_PATH}"))?;
    Ok(())
}

/// Print the closing console block.
pub fn print_run_summary(
    wallets_total: usize,
    results_total: usize,
    wallets_with_fees: usize,
    fees_found: usize,
    total_amount: f64,
) {
    println!();
    println!("FINAL RESULTS:");
    println!("{}", "=".repeat(50));
    println!("Wallets processed: {results_total}/{wallets_total}");
    println!("Wallets with fees: {wallets_with_fees}");
    println!("Fees found: {fees_found}");
    println!("Total fees: ${total_amount:.2}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    fn fee(user: &str, amount_usd: f64) -> FeeRecord {
        FeeRecord {
            request_id: format!("req-{user}-{amount_usd}"),
            user: user.to_string(),
            amount_usd,
            amount: "1000".to_string(),
            bps: Value::String("25".to_string()),
            created_at: "2025-01-01T00:00:00Z".to_string(),
        }
    }

    fn result(wallet: &str, fees: Vec<FeeRecord>) -> WalletResult {
        WalletResult::new(wallet.to_string(), fees)
    }

    // ── build_rows ─────────────────────────────────────────────────

    #[test]
    fn rows_follow_wallet_file_order() {
        let results = vec![
            result("0xbbb", vec![fee("0xbbb", 2.0)]),
            result("0xaaa", vec![fee("0xaaa", 1.0)]),
        ];
        let order = vec!["0xaaa".to_string(), "0xbbb".to_string()];
        let rows = build_rows(&results, &order);
        assert_eq!(rows[0].wallet, "0xaaa");
        assert_eq!(rows[1].wallet, "0xbbb");
    }

    #[test]
    fn rows_zero_filled_for_missing_results() {
        let results = vec![result("0xaaa", vec![fee("0xaaa", 1.0)])];
        let order = vec!["0xaaa".to_string(), "0xbbb".to_string()];
        let rows = build_rows(&results, &order);
        assert_eq!(rows[1].tx_count, 0);
        assert_eq!(rows[1].total, "$0.00");
    }

    #[test]
    fn rows_render_zero_fee_results_as_zero() {
        // A wallet whose run matched nothing arrives as a real result, not
        // a missing one, and its total must not pick up a sign.
        let results = vec![
            result("0xaaa", vec![fee("0xaaa", 5.25)]),
            WalletResult::empty("0xbbb".to_string()),
        ];
        let order = vec!["0xaaa".to_string(), "0xbbb".to_string()];
        let rows = build_rows(&results, &order);
        assert_eq!(rows[0].total, "$5.25");
        assert_eq!(rows[1].tx_count, 0);
        assert_eq!(rows[1].total, "$0.00");
    }

    #[test]
    fn rows_join_case_insensitively() {
        let results = vec![result("0xABC", vec![fee("0xabc", 5.25)])];
        let order = vec!["0xabc".to_string()];
        let rows = build_rows(&results, &order);
        // The wallet file's casing is what shows in the sheet.
        assert_eq!(rows[0].wallet, "0xabc");
        assert_eq!(rows[0].tx_count, 1);
        assert_eq!(rows[0].total, "$5.25");
    }

    #[test]
    fn rows_format_totals_to_cents() {
        let results = vec![result("0xaaa", vec![fee("0xaaa", 1.0), fee("0xaaa", 0.333)])];
        let order = vec!["0xaaa".to_string()];
        let rows = build_rows(&results, &order);
        assert_eq!(rows[0].total, "$1.33");
    }

    // ── build_summary ──────────────────────────────────────────────

    #[test]
    fn summary_counts_and_totals() {
        let fees = vec![fee("0xaaa", 1.0), fee("0xaaa", 2.0), fee("0xbbb", 4.0)];
        let summary = build_summary(&fees, 7.0);
        assert_eq!(summary.total_fees_count, 3);
        assert!(approx_eq(summary.total_amount_usd, 7.0));
        assert_eq!(summary.target_recipient, crate::TARGET_RECIPIENT);

        let aaa = summary.fees_by_wallet.get("0xaaa").expect("0xaaa entry");
        assert_eq!(aaa.count, 2);
        assert!(approx_eq(aaa.total_usd, 3.0));
        let bbb = summary.fees_by_wallet.get("0xbbb").expect("0xbbb entry");
        assert_eq!(bbb.count, 1);
        assert!(approx_eq(bbb.total_usd, 4.0));
    }

    #[test]
    fn summary_counts_distinct_payers() {
        let fees = vec![fee("0xaaa", 1.0), fee("0xaaa", 2.0), fee("0xbbb", 4.0)];
        let summary = build_summary(&fees, 7.0);
        assert_eq!(summary.wallets_processed, 2);
    }

    #[test]
    fn summary_of_nothing_is_zeroed() {
        let summary = build_summary(&[], 0.0);
        assert_eq!(summary.total_fees_count, 0);
        assert_eq!(summary.wallets_processed, 0);
        assert!(summary.fees_by_wallet.is_empty());
    }

    #[test]
    fn summary_serializes_with_output_field_names() {
        let summary = build_summary(&[fee("0xaaa", 1.0)], 1.0);
        let value = serde_json::to_value(&summary).expect("serializable summary");
        assert!(value.get("total_fees_count").is_some());
        assert!(value.get("total_amount_usd").is_some());
        assert!(value.get("target_recipient").is_some());
        assert!(value.get("wallets_processed").is_some());
        assert!(value.pointer("/fees_by_wallet/0xaaa/count").is_some());
        assert!(value.pointer("/fees_by_wallet/0xaaa/total_usd").is_some());
    }
}
