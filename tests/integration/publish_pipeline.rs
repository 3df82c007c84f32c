//! Publishing index pipeline tests
//!
//! Drives index updates through the in-memory queue and the search index,
//! including configuration loaded from a TOML file.

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use clap::Parser;
use tempfile::NamedTempFile;

use eventq::app::{build_queue_config, run_simulation};
use eventq::cli::Args;
use eventq::config::ConfigManager;
use eventq::publish::{IndexUpdate, SearchIndex};
use eventq::queue::{MemoryEventQueue, MemoryEventSource, QueueConfig};

fn index_config(name: &str, batch_size: usize) -> QueueConfig {
    QueueConfig {
        name: name.to_string(),
        batch_size,
        poll_timeout_ms: 20,
        shutdown_poll_interval_ms: 100,
    }
}

fn wait_until<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    condition()
}

#[test]
fn test_updates_reach_index() {
    let queue = MemoryEventQueue::new(index_config("index", 10), SearchIndex::new()).unwrap();
    queue.start().unwrap();
    assert!(queue.processor().is_open());

    queue.enqueue_all((1..=25).map(IndexUpdate::add));
    queue.enqueue(IndexUpdate::remove(7));

    assert!(wait_until(|| queue.processor().summary().updates_applied == 26, Duration::from_secs(5)));
    queue.shutdown().unwrap();

    let index = queue.processor();
    assert!(!index.is_open());
    assert!(index.contains(1));
    assert!(!index.contains(7));

    let summary = index.summary();
    assert_eq!(summary.documents, 24);
    assert!(summary.largest_batch <= 10);
}

#[test]
fn test_shutdown_drains_buffered_updates() {
    let index = SearchIndex::with_apply_delay(Duration::from_millis(50));
    let queue = MemoryEventQueue::new(index_config("slow-index", 5), index).unwrap();
    queue.start().unwrap();

    queue.enqueue_all((1..=40).map(IndexUpdate::add));
    queue.shutdown().unwrap();

    assert_eq!(queue.pending(), 0);
    assert_eq!(queue.processor().summary().updates_applied, 40);
    assert_eq!(queue.processor().summary().documents, 40);
}

#[test]
fn test_rejected_batch_does_not_stop_worker() {
    let queue = MemoryEventQueue::new(index_config("index", 1), SearchIndex::new()).unwrap();
    queue.start().unwrap();

    queue.enqueue(IndexUpdate::add(0));
    queue.enqueue(IndexUpdate::add(3));

    assert!(wait_until(|| queue.processor().contains(3), Duration::from_secs(5)));
    queue.shutdown().unwrap();

    assert_eq!(queue.failures(), 1);
    assert_eq!(queue.processor().summary().rejected_batches, 1);
}

#[test]
fn test_stop_on_error_halts_processing() {
    let source = MemoryEventSource::new(1, SearchIndex::new()).stop_on_error(true).drain_on_shutdown(false);
    let queue = MemoryEventQueue::with_source(index_config("strict-index", 1), source).unwrap();
    queue.start().unwrap();

    queue.enqueue(IndexUpdate::add(0));
    assert!(wait_until(|| queue.failures() == 1, Duration::from_secs(5)));

    // the worker has stopped; later updates stay buffered
    queue.enqueue(IndexUpdate::add(4));
    thread::sleep(Duration::from_millis(100));
    assert!(!queue.processor().contains(4));
    assert_eq!(queue.pending(), 1);

    queue.shutdown().unwrap();
    assert_eq!(queue.pending(), 1);
}

#[test]
fn test_simulation_from_config_file() {
    let toml_content = r#"
[queue]
name = "config-index"
batch-size = 7
poll-timeout-ms = 15
"#;
    let temp_file = NamedTempFile::new().unwrap();
    fs::write(&temp_file, toml_content).unwrap();

    let manager = ConfigManager::load_from_file(temp_file.path().to_path_buf()).unwrap();
    let args = Args::parse_from(["eventq", "--producers", "2", "--events", "100"]);
    let queue_config = build_queue_config(&args, &manager).unwrap();
    assert_eq!(queue_config.name, "config-index");
    assert_eq!(queue_config.batch_size, 7);

    let report = run_simulation(&args, queue_config).unwrap();
    assert_eq!(report.queue.queue, "config-index");
    assert_eq!(report.index.updates_applied, 100);
    assert_eq!(report.index.documents, 60);
    assert!(report.index.largest_batch <= 7);
}
