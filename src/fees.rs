use serde_json::Value;

use crate::types::FeeRecord;

/// Pull the fee entries payable to `target_recipient` out of a batch of
/// request records.
///
/// Fee lists can appear at the top level (`appFees`) or nested under
/// `data.appFees`; both locations are scanned when present. The recipient
/// match is case-insensitive. Emission order follows input order.
pub fn extract_fees(requests: &[Value], target_recipient: &str) -> Vec<FeeRecord> {
    let mut fees = Vec::new();

    for request in requests {
        let request_id = field_str(request, "id");
        let user = field_str(request, "user");
        let created_at = field_str(request, "createdAt");

        let locations = [request.get("appFees"), request.pointer("/data/appFees")];
        for app_fees in locations.into_iter().flatten() {
            let Some(entries) = app_fees.as_array() else {
                continue;
            };
            for entry in entries {
                let recipient = entry
                    .get("recipient")
                    .and_then(Value::as_str)
                    .unwrap_or_default();
                if !recipient.eq_ignore_ascii_case(target_recipient) {
                    continue;
                }
                fees.push(FeeRecord {
                    request_id: request_id.clone(),
                    user: user.clone(),
                    amount_usd: fee_amount_usd(entry),
                    amount: field_str(entry, "amount"),
                    bps: entry
                        .get("bps")
                        .cloned()
                        .unwrap_or_else(|| Value::String(String::new())),
                    created_at: created_at.clone(),
                });
            }
        }
    }

    fees
}

/// String field lookup with an empty-string default.
fn field_str(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

/// Coerce `amountUsd` to a float. The API serves it as either a number or
/// a numeric string; anything else counts as zero.
fn fee_amount_usd(entry: &Value) -> f64 {
    match entry.get("amountUsd") {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}
