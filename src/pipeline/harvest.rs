// src/pipeline/harvest.rs

//! Harvest pipeline: one sequential fetch/validate/dedup/save loop per
//! source, all sources running concurrently.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{Semaphore, watch};
use tokio::task::JoinSet;

use crate::error::{AppError, Result};
use crate::models::{Config, HarvestSummary, SourceReport};
use crate::services::{SelectorAdapter, SourceAdapter};
use crate::storage::StorageBackend;
use crate::store::Store;
use crate::utils::http::create_async_client;
use crate::utils::is_tidy;

/// Build adapters for the configured sources, or only for `only` when given.
pub fn build_adapters(config: &Config, only: &[String]) -> Result<Vec<Arc<dyn SourceAdapter>>> {
    for name in only {
        if config.source(name).is_none() {
            return Err(AppError::config(format!("unknown source: {name}")));
        }
    }

    let client = create_async_client(&config.crawler)?;
    config
        .sources
        .iter()
        .filter(|source| only.is_empty() || only.contains(&source.name))
        .map(|source| {
            let adapter = SelectorAdapter::new(source.clone(), client.clone())?;
            Ok(Arc::new(adapter) as Arc<dyn SourceAdapter>)
        })
        .collect()
}

/// Shutdown signal that fires on Ctrl-C or after `deadline`, whichever is first.
pub fn shutdown_signal(deadline: Option<Duration>) -> watch::Receiver<bool> {
    shutdown_on(tokio::signal::ctrl_c(), deadline)
}

/// Shutdown signal driven by `interrupt`; a failing `interrupt` leaves only the deadline.
fn shutdown_on<F>(interrupt: F, deadline: Option<Duration>) -> watch::Receiver<bool>
where
    F: Future<Output = std::io::Result<()>> + Send + 'static,
{
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        let interrupted = async {
            match interrupt.await {
                Ok(()) => log::warn!("Interrupted, stopping after in-flight work"),
                Err(e) => {
                    log::error!("Failed to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };
        let deadline = async {
            match deadline {
                Some(limit) => tokio::time::sleep(limit).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = interrupted => {}
            _ = deadline => log::warn!("Run deadline reached, stopping"),
        }
        let _ = tx.send(true);
    });
    rx
}

/// Harvest all `adapters` concurrently and wait for every source to finish.
///
/// `max_concurrent` bounds how many sources run at once (0 = unbounded).
/// Reports come back in adapter order.
pub async fn run_harvest(
    adapters: Vec<Arc<dyn SourceAdapter>>,
    backend: Arc<dyn StorageBackend>,
    max_concurrent: usize,
    shutdown: watch::Receiver<bool>,
) -> HarvestSummary {
    let start_time = Utc::now();
    let limit = (max_concurrent > 0).then(|| Arc::new(Semaphore::new(max_concurrent)));
    let names: Vec<String> = adapters
        .iter()
        .map(|a| a.source_name().to_string())
        .collect();

    log::info!("Harvesting {} sources", adapters.len());

    let mut tasks = JoinSet::new();
    for (position, adapter) in adapters.into_iter().enumerate() {
        let backend = Arc::clone(&backend);
        let shutdown = shutdown.clone();
        let limit = limit.clone();
        tasks.spawn(async move {
            let _permit = match limit {
                Some(semaphore) => semaphore.acquire_owned().await.ok(),
                None => None,
            };
            let report = harvest_source(adapter.as_ref(), backend.as_ref(), &shutdown).await;
            log::info!(
                "FINISHED: {} ({} saved, {} already known)",
                adapter.display_name(),
                report.saved,
                report.duplicates
            );
            (position, report)
        });
    }

    let mut slots: Vec<Option<SourceReport>> = vec![None; names.len()];
    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((position, report)) => slots[position] = Some(report),
            Err(e) => log::error!("Source task failed: {}", e),
        }
    }

    let reports = slots
        .into_iter()
        .zip(names)
        .map(|(slot, name)| {
            slot.unwrap_or_else(|| SourceReport {
                error: Some("source task panicked".to_string()),
                ..SourceReport::new(name)
            })
        })
        .collect();

    HarvestSummary {
        start_time,
        end_time: Utc::now(),
        reports,
    }
}

/// Run the fetch/validate/dedup/save loop for one source.
///
/// Per-page and per-link failures are logged and counted, never fatal. Links
/// are saved in the order the listing pages return them.
pub async fn harvest_source(
    adapter: &dyn SourceAdapter,
    backend: &dyn StorageBackend,
    shutdown: &watch::Receiver<bool>,
) -> SourceReport {
    let source = adapter.source_name();
    let mut report = SourceReport::new(source);

    let (mut store, load) = match Store::open(backend, source).await {
        Ok(opened) => opened,
        Err(e) => {
            log::error!("[{}] cannot load index: {}", source, e);
            report.error = Some(e.to_string());
            return report;
        }
    };
    log::info!(
        "[{}] {} links already indexed{}",
        source,
        store.len(),
        if load.skipped > 0 {
            format!(" ({} damaged lines skipped)", load.skipped)
        } else {
            String::new()
        }
    );

    match store.write_meta(&adapter.meta()).await {
        Ok(()) => report.meta_written = true,
        Err(e) => log::error!("[{}] {}", source, e),
    }

    'pages: for page_url in adapter.page_urls() {
        let Some(listed) = until_cancelled(shutdown, adapter.links_from_page(&page_url)).await
        else {
            report.cancelled = true;
            break;
        };
        let links = match listed {
            Ok(links) => links,
            Err(e) => {
                report.page_failures += 1;
                log::warn!("[{}] failed to get links from page: {}", source, e);
                continue;
            }
        };
        report.pages += 1;
        report.links_seen += links.len();

        for link in links {
            if !is_tidy(&link, adapter.home_page()) {
                report.untidy += 1;
                log::warn!("[{}] link is not tidy: {:?}", source, link);
                continue;
            }
            if store.url_exists(&link) {
                report.duplicates += 1;
                continue;
            }

            let Some(fetched) = until_cancelled(shutdown, adapter.fetch_record(&link)).await else {
                report.cancelled = true;
                break 'pages;
            };
            let record = match fetched {
                Ok(record) => record,
                Err(e) => {
                    report.fetch_failures += 1;
                    log::warn!("[{}] failed to get post {}: {}", source, link, e);
                    continue;
                }
            };
            if record.link != link {
                report.invalid += 1;
                log::warn!(
                    "[{}] {}",
                    source,
                    AppError::validation(format!(
                        "post fetched from {link} reports link {:?}",
                        record.link
                    ))
                );
                continue;
            }
            if let Err(e) = record.validate() {
                report.invalid += 1;
                log::warn!("[{}] {}", source, e);
                continue;
            }

            match store.save(record).await {
                Ok(_) => {
                    report.saved += 1;
                    log::info!("OK: {}", link);
                }
                Err(e) => {
                    report.save_failures += 1;
                    log::error!("[{}] failed to save record: {}", source, e);
                }
            }
        }
    }

    if report.cancelled {
        log::warn!("[{}] cancelled after {} saved posts", source, report.saved);
    }
    report
}

/// Run `fut` unless the shutdown signal fires first.
async fn until_cancelled<F: Future>(shutdown: &watch::Receiver<bool>, fut: F) -> Option<F::Output> {
    let mut shutdown = shutdown.clone();
    if *shutdown.borrow_and_update() {
        return None;
    }
    tokio::select! {
        output = fut => Some(output),
        _ = cancelled(&mut shutdown) => None,
    }
}

async fn cancelled(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            // Sender gone without cancelling: this run can no longer be stopped.
            std::future::pending::<()>().await;
        }
    }
}
