//! Simulation execution and reporting

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};

use crate::cli;
use crate::publish::{IndexSummary, IndexUpdate, SearchIndex};
use crate::queue::{MemoryEventQueue, QueueConfig, QueueStatistics};

/// Outcome of one simulation run
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub producers: usize,
    pub events_enqueued: usize,
    pub elapsed_ms: u64,
    pub failed_batches: u64,
    pub queue: QueueStatistics,
    pub index: IndexSummary,
}

/// The update a producer emits for its `seq`th event.
///
/// Every fifth update removes the item added just before it.
pub fn simulated_update(first_id: u64, seq: usize) -> IndexUpdate {
    let content_id = first_id + seq as u64;
    if seq % 5 == 4 {
        IndexUpdate::remove(content_id - 1)
    } else {
        IndexUpdate::add(content_id)
    }
}

/// Split `events` across `producers`, giving the remainder to the first ones
pub fn partition_events(events: usize, producers: usize) -> Vec<usize> {
    let producers = producers.max(1);
    let base = events / producers;
    let remainder = events % producers;
    (0..producers)
        .map(|p| base + usize::from(p < remainder))
        .collect()
}

/// Run producers against a search-index queue and shut it down cleanly
pub fn run_simulation(args: &cli::Args, queue_config: QueueConfig) -> Result<SimulationReport> {
    let producers = args.producers.unwrap_or_else(num_cpus::get).max(1);
    let index = SearchIndex::with_apply_delay(Duration::from_millis(args.index_delay_ms));
    let queue = MemoryEventQueue::new(queue_config, index)
        .context("Failed to create index queue")?;

    info!(
        "Running {} producers for {} index updates (batch size {})",
        producers,
        args.events,
        queue.inner().config().batch_size
    );

    let started = Instant::now();
    queue.start().context("Failed to start index queue")?;

    let shares = partition_events(args.events, producers);
    thread::scope(|scope| -> std::io::Result<()> {
        let mut first_id = 1u64;
        for (producer, share) in shares.iter().copied().enumerate() {
            let queue = &queue;
            let base = first_id;
            first_id += share as u64;
            thread::Builder::new()
                .name(format!("producer-{}", producer))
                .spawn_scoped(scope, move || {
                    for seq in 0..share {
                        queue.enqueue(simulated_update(base, seq));
                    }
                    debug!("Producer {} enqueued {} updates", producer, share);
                })?;
        }
        Ok(())
    })
    .context("Failed to spawn producer thread")?;

    queue.shutdown().context("Index queue did not shut down cleanly")?;
    let elapsed = started.elapsed();

    let report = SimulationReport {
        producers,
        events_enqueued: args.events,
        elapsed_ms: elapsed.as_millis() as u64,
        failed_batches: queue.failures(),
        queue: queue.statistics(),
        index: queue.processor().summary(),
    };

    info!(
        "Processed {} updates in {} batches ({} ms)",
        report.index.updates_applied, report.index.batches, report.elapsed_ms
    );
    Ok(report)
}

/// Render a report as text or pretty JSON
pub fn render_report(report: &SimulationReport, format: &str) -> Result<String> {
    if format.eq_ignore_ascii_case("json") {
        return serde_json::to_string_pretty(report).context("Failed to serialize report");
    }

    let mut lines = vec![
        format!("Queue:             {}", report.queue.queue),
        format!("Producers:         {}", report.producers),
        format!("Events enqueued:   {}", report.events_enqueued),
        format!("Updates applied:   {}", report.index.updates_applied),
        format!("Documents indexed: {}", report.index.documents),
        format!(
            "Batches:           {} (avg {:.1}, max {})",
            report.index.batches,
            report.queue.average_batch_size(),
            report.index.largest_batch
        ),
        format!("Notifications:     {}", report.queue.notifications),
        format!("Poll timeouts:     {}", report.queue.poll_timeouts),
        format!("Elapsed:           {} ms", report.elapsed_ms),
    ];
    if report.failed_batches > 0 {
        lines.push(format!("Failed batches:    {}", report.failed_batches));
    }
    Ok(lines.join("\n"))
}
