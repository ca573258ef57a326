use std::sync::Arc;
use std::time::Instant;

use anyhow::{Result, anyhow};
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tracing::{info, warn};

use relay_fees::client::ClientConfig;
use relay_fees::inputs::{self, PROXY_FILE, WALLETS_FILE};
use relay_fees::reporter;
use relay_fees::types::WalletResult;
use relay_fees::wallet;

/// Wallets processed concurrently.
const WORKER_COUNT: usize = 5;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    run().await
}

async fn run() -> Result<()> {
    let started = Instant::now();

    let wallets = inputs::load_wallets(WALLETS_FILE);
    if wallets.is_empty() {
        warn!("no wallets found in {WALLETS_FILE}, nothing to do");
        return Ok(());
    }
    info!("Loaded {} wallet(s) from {WALLETS_FILE}", wallets.len());

    let proxies = inputs::load_proxies(PROXY_FILE);
    if !proxies.is_empty() {
        info!("Loaded {} proxies from {PROXY_FILE}", proxies.len());
    }

    let cfg = Arc::new(ClientConfig { proxies });

    // Workers funnel their progress lines through a single printer task so
    // lines never interleave.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    let printer = tokio::spawn(async move {
        while let Some(line) = line_rx.recv().await {
            println!("{line}");
        }
    });

    // --- Fan out, at most WORKER_COUNT wallets in flight ---
    let semaphore = Arc::new(Semaphore::new(WORKER_COUNT));
    let mut tasks = JoinSet::new();

    for (idx, wallet_addr) in wallets.iter().enumerate() {
        let cfg = Arc::clone(&cfg);
        let semaphore = Arc::clone(&semaphore);
        let line_tx = line_tx.clone();
        let wallet_addr = wallet_addr.clone();

        tasks.spawn(async move {
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (idx, wallet_addr, Err(anyhow!("worker pool closed")));
            };
            let outcome = wallet::process_wallet(&cfg, &wallet_addr).await;
            if let Ok(result) = &outcome {
                let _ = line_tx.send(format!("{}: ${:.2}", result.wallet, result.total_amount));
            }
            (idx, wallet_addr, outcome)
        });
    }
    drop(line_tx);

    // --- Collect, downgrading any failure to a zero result ---
    let mut slots: Vec<Option<WalletResult>> = vec![None; wallets.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((idx, _, Ok(result))) => slots[idx] = Some(result),
            Ok((idx, wallet_addr, Err(e))) => {
                warn!("wallet {wallet_addr} failed: {e}");
                slots[idx] = Some(WalletResult::empty(wallet_addr));
            }
            Err(e) => {
                warn!("wallet task panicked or was cancelled: {e}");
            }
        }
    }
    printer.await?;

    // Slots left empty by panicked tasks get zero results too, so the
    // output always covers the input list in file order.
    let results: Vec<WalletResult> = slots
        .into_iter()
        .enumerate()
        .map(|(idx, slot)| slot.unwrap_or_else(|| WalletResult::empty(wallets[idx].clone())))
        .collect();

    let all_fees: Vec<_> = results.iter().flat_map(|r| r.fees.iter().cloned()).collect();
    // Fold keeps an all-empty run at +0.0 (f64's `Sum` seeds with -0.0).
    let total_amount: f64 = all_fees.iter().fold(0.0, |acc, fee| acc + fee.amount_usd);
    let wallets_with_fees = results.iter().filter(|r| r.tx_count > 0).count();

    reporter::print_run_summary(
        wallets.len(),
        results.len(),
        wallets_with_fees,
        all_fees.len(),
        total_amount,
    );

    if !all_fees.is_empty() {
        reporter::write_detailed_json(&all_fees)?;
        let summary = reporter::build_summary(&all_fees, total_amount);
        reporter::write_summary_json(&summary)?;
        info!(
            "Wrote {} and {}",
            reporter::DETAILED_JSON_PATH,
            reporter::SUMMARY_JSON_PATH
        );
    }

    reporter::write_spreadsheet(&results, &wallets)?;
    info!("Wrote {}", reporter::SPREADSHEET_PATH);

    info!("Done in {:.1}s", started.elapsed().as_secs_f64());
    Ok(())
}
