//! End-to-end lifecycle tests for custom event handlers
//!
//! Exercises the public API only: a handler implemented outside the crate,
//! producers on separate threads, and cooperative shutdown.

use std::sync::atomic::{AtomicUsize, Ordering};
use parking_lot::Mutex;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use eventq::queue::{EventBatch, EventHandler, EventQueue, Poller, QueueConfig, QueueError};

/// Publishes pages for one site: the batch identity is the site name and the
/// count is the number of pages queued for it
struct SitePublisher {
    pending: Mutex<Vec<(String, usize)>>,
    published: Mutex<Vec<(String, usize)>>,
    publish_time: Duration,
    runs: AtomicUsize,
}

impl SitePublisher {
    fn new(publish_time: Duration) -> Self {
        Self {
            pending: Mutex::new(Vec::new()),
            published: Mutex::new(Vec::new()),
            publish_time,
            runs: AtomicUsize::new(0),
        }
    }

    fn queue_site(&self, site: &str, pages: usize) {
        self.pending.lock().push((site.to_string(), pages));
    }

    fn published(&self) -> Vec<(String, usize)> {
        self.published.lock().clone()
    }
}

impl EventHandler for SitePublisher {
    type Queue = String;

    fn next_event(&self) -> Option<EventBatch<String>> {
        let mut pending = self.pending.lock();
        if pending.is_empty() {
            None
        } else {
            let (site, pages) = pending.remove(0);
            Some(EventBatch::new(site, pages))
        }
    }

    fn do_run(&self, poller: &Poller<'_, Self>) -> bool {
        self.runs.fetch_add(1, Ordering::SeqCst);
        if let Some(batch) = poller.next_queue_event(Duration::from_secs(20)) {
            thread::sleep(self.publish_time);
            self.published.lock().push((batch.queue, batch.count));
        }
        true
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

fn publisher_queue(publish_time: Duration) -> EventQueue<SitePublisher> {
    let config = QueueConfig {
        name: "site-publisher".to_string(),
        shutdown_poll_interval_ms: 100,
        ..QueueConfig::default()
    };
    EventQueue::new(config, SitePublisher::new(publish_time)).unwrap()
}

#[test]
fn test_double_start_rejected() {
    let queue = publisher_queue(Duration::ZERO);
    queue.start().unwrap();

    match queue.start() {
        Err(QueueError::InvalidState { queue: name, .. }) => assert_eq!(name, "site-publisher"),
        other => panic!("expected invalid state, got {:?}", other),
    }

    queue.shutdown().unwrap();
}

#[test]
fn test_shutdown_before_start_is_noop() {
    let queue = publisher_queue(Duration::ZERO);
    queue.shutdown().unwrap();
    queue.shutdown().unwrap();
    assert!(!queue.is_running());
    assert_eq!(queue.handler().runs.load(Ordering::SeqCst), 0);
}

#[test]
fn test_notify_cuts_poll_wait_short() {
    let queue = publisher_queue(Duration::ZERO);
    queue.start().unwrap();
    thread::sleep(Duration::from_millis(100));

    let notifier = queue.notifier();
    let started = Instant::now();
    queue.handler().queue_site("news", 12);
    notifier.notify();

    assert!(wait_until(|| !queue.handler().published().is_empty(), Duration::from_secs(5)));
    // the worker's poll timeout is 20s; only the notification explains a fast pickup
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(queue.handler().published(), vec![("news".to_string(), 12)]);

    queue.shutdown().unwrap();
    assert_eq!(queue.statistics().events, 12);
}

#[test]
fn test_shutdown_blocks_until_batch_completes() {
    let queue = Arc::new(publisher_queue(Duration::from_millis(400)));
    queue.start().unwrap();
    queue.handler().queue_site("docs", 3);
    queue.notify_event_queue();

    // wait until the worker has taken the batch
    assert!(wait_until(|| queue.handler().pending.lock().is_empty(), Duration::from_secs(2)));

    let (tx, rx) = mpsc::channel();
    let stopper = {
        let queue = Arc::clone(&queue);
        thread::spawn(move || {
            let result = queue.shutdown();
            tx.send(queue.handler().published().len()).unwrap();
            result
        })
    };

    // shutdown must not have returned while the batch is still publishing
    assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

    let published_when_returned = rx.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(published_when_returned, 1);
    stopper.join().unwrap().unwrap();
    assert!(!queue.is_running());
}

#[test]
fn test_many_producers_share_one_worker() {
    let queue = Arc::new(publisher_queue(Duration::ZERO));
    queue.start().unwrap();

    let producers: Vec<_> = (0..8)
        .map(|p| {
            let queue = Arc::clone(&queue);
            thread::spawn(move || {
                for i in 0..10 {
                    queue.handler().queue_site(&format!("site-{}-{}", p, i), 1);
                    queue.notify_event_queue();
                }
            })
        })
        .collect();
    for producer in producers {
        producer.join().unwrap();
    }

    assert!(wait_until(|| queue.handler().published().len() == 80, Duration::from_secs(5)));
    queue.shutdown().unwrap();

    let stats = queue.statistics();
    assert_eq!(stats.batches, 80);
    assert_eq!(stats.notifications, 80);
    assert_eq!(stats.starts, 1);
    assert_eq!(stats.shutdowns, 1);
}
