//! Integration tests for watching a file end to end.

use config_file_watcher::prelude::*;
use filetime::FileTime;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::{sleep, timeout};

fn counting_listener() -> (Arc<AtomicUsize>, impl Fn() + Send + Sync + 'static) {
    let counter = Arc::new(AtomicUsize::new(0));
    let counter_clone = Arc::clone(&counter);
    (counter, move || {
        counter_clone.fetch_add(1, Ordering::SeqCst);
    })
}

async fn wait_for_count(counter: &AtomicUsize, at_least: usize, limit: Duration) -> usize {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        let count = counter.load(Ordering::SeqCst);
        if count >= at_least {
            return count;
        }
        sleep(Duration::from_millis(20)).await;
    }
    counter.load(Ordering::SeqCst)
}

fn set_mtime(path: &Path, secs: i64) {
    filetime::set_file_mtime(path, FileTime::from_unix_time(secs, 0)).unwrap();
}

#[tokio::test]
async fn test_three_writes_are_noticed() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("cfg.conf");
    fs::write(&config_path, "version=0").unwrap();

    let (counter, listener) = counting_listener();
    let watcher = FileWatcher::new(&config_path, listener).unwrap();
    watcher.start().unwrap();
    sleep(Duration::from_millis(200)).await;

    for version in 1..=3 {
        fs::write(&config_path, format!("version={}", version)).unwrap();
        sleep(Duration::from_millis(200)).await;
    }

    // Either an OS event or the 10s timestamp re-check must fire.
    let count = wait_for_count(&counter, 1, Duration::from_secs(11)).await;
    assert!(count >= 1);

    watcher.stop();
    watcher.join().await;
    assert_eq!(watcher.state(), WatcherState::Stopped);
}

#[tokio::test]
async fn test_rapid_writes_produce_at_least_one_notification() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("app.yaml");
    fs::write(&config_path, "port: 8080").unwrap();

    let (counter, listener) = counting_listener();
    let watcher = FileWatcher::builder(&config_path, listener)
        .with_quiescence_timeout(Duration::from_millis(200))
        .build()
        .unwrap();
    watcher.start().unwrap();
    sleep(Duration::from_millis(100)).await;

    fs::write(&config_path, "port: 9090").unwrap();
    fs::write(&config_path, "port: 9091").unwrap();
    set_mtime(&config_path, 1_000_000);

    let count = wait_for_count(&counter, 1, Duration::from_secs(5)).await;
    assert!(count >= 1);

    watcher.stop();
    watcher.join().await;
}

#[tokio::test]
async fn test_sibling_file_changes_are_ignored() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("app.yaml");
    let sibling = temp_dir.path().join("other.yaml");
    fs::write(&config_path, "port: 8080").unwrap();

    let (counter, listener) = counting_listener();
    let watcher = FileWatcher::new(&config_path, listener).unwrap();
    watcher.start().unwrap();
    sleep(Duration::from_millis(100)).await;

    fs::write(&sibling, "unrelated").unwrap();
    sleep(Duration::from_millis(500)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    watcher.stop();
    watcher.join().await;
}

#[tokio::test]
async fn test_polling_mode_detects_change_within_interval() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("app.toml");
    fs::write(&config_path, "port = 8080").unwrap();

    let (counter, listener) = counting_listener();
    let watcher = FileWatcher::builder(&config_path, listener)
        .with_polling_only()
        .with_poll_interval(Duration::from_millis(100))
        .build()
        .unwrap();
    watcher.start().unwrap();
    sleep(Duration::from_millis(50)).await;

    fs::write(&config_path, "port = 9090").unwrap();
    set_mtime(&config_path, 1_200_000);

    let count = wait_for_count(&counter, 1, Duration::from_millis(500)).await;
    assert_eq!(count, 1);

    // No change, no further notifications.
    sleep(Duration::from_millis(300)).await;
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    watcher.stop();
    watcher.join().await;
}

#[tokio::test]
async fn test_write_immediately_after_start_in_polling_mode() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("app.toml");
    fs::write(&config_path, "port = 8080").unwrap();

    let (counter, listener) = counting_listener();
    let watcher = FileWatcher::builder(&config_path, listener)
        .with_polling_only()
        .with_poll_interval(Duration::from_millis(50))
        .build()
        .unwrap();

    // No await between start() and the write.
    watcher.start().unwrap();
    fs::write(&config_path, "port = 9090").unwrap();
    set_mtime(&config_path, 1_000_000);

    let count = wait_for_count(&counter, 1, Duration::from_secs(1)).await;
    assert!(count >= 1);

    watcher.stop();
    watcher.join().await;
}

#[tokio::test]
async fn test_write_immediately_after_start_with_notifications() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("app.toml");
    fs::write(&config_path, "port = 8080").unwrap();

    let (counter, listener) = counting_listener();
    let watcher = FileWatcher::builder(&config_path, listener)
        .with_quiescence_timeout(Duration::from_millis(100))
        .build()
        .unwrap();

    // The subscription does not exist yet, so only the re-check can see this.
    watcher.start().unwrap();
    fs::write(&config_path, "port = 9090").unwrap();
    set_mtime(&config_path, 1_000_000);

    let count = wait_for_count(&counter, 1, Duration::from_secs(3)).await;
    assert!(count >= 1);

    watcher.stop();
    watcher.join().await;
}

#[tokio::test]
async fn test_file_created_after_start_is_detected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("late.conf");

    let (counter, listener) = counting_listener();
    let watcher = FileWatcher::builder(&config_path, listener)
        .with_polling_only()
        .with_poll_interval(Duration::from_millis(50))
        .build()
        .unwrap();
    watcher.start().unwrap();
    sleep(Duration::from_millis(20)).await;

    fs::write(&config_path, "created").unwrap();
    assert!(wait_for_count(&counter, 1, Duration::from_secs(2)).await >= 1);

    watcher.stop();
    watcher.join().await;
}

#[test]
fn test_missing_parent_directory_is_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("missing").join("cfg.conf");

    let result = FileWatcher::new(&config_path, || {});
    assert!(matches!(result, Err(WatchError::InvalidArgument(_))));
}

#[test]
fn test_parent_must_be_a_directory() {
    let temp_dir = TempDir::new().unwrap();
    let not_a_dir = temp_dir.path().join("plain-file");
    fs::write(&not_a_dir, "").unwrap();

    let result = FileWatcher::new(not_a_dir.join("cfg.conf"), || {});
    assert!(matches!(result, Err(WatchError::InvalidArgument(_))));
}

#[tokio::test]
async fn test_stop_never_blocks() {
    let temp_dir = TempDir::new().unwrap();
    let watcher = FileWatcher::new(temp_dir.path().join("cfg.conf"), || {}).unwrap();

    let stop_all_states = async {
        watcher.stop();
        watcher.start().unwrap();
        watcher.stop();
        watcher.join().await;
        watcher.stop();
    };

    // Default timings: the loop is parked on a 10s wait when stop arrives.
    timeout(Duration::from_secs(2), stop_all_states)
        .await
        .expect("stop or join blocked");
    assert_eq!(watcher.state(), WatcherState::Stopped);
}

#[tokio::test]
async fn test_no_notifications_after_join() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("cfg.conf");
    fs::write(&config_path, "a=1").unwrap();

    let (counter, listener) = counting_listener();
    let watcher = FileWatcher::builder(&config_path, listener)
        .with_quiescence_timeout(Duration::from_millis(50))
        .with_poll_interval(Duration::from_millis(50))
        .build()
        .unwrap();
    watcher.start().unwrap();
    sleep(Duration::from_millis(100)).await;

    watcher.stop();
    watcher.join().await;
    let before = counter.load(Ordering::SeqCst);

    fs::write(&config_path, "a=2").unwrap();
    set_mtime(&config_path, 1_400_000);
    sleep(Duration::from_millis(300)).await;

    assert_eq!(counter.load(Ordering::SeqCst), before);
}

#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl io::Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuf {
    fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

#[tokio::test]
async fn test_logs_go_to_injected_dispatch() {
    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("cfg.conf");

    let buf = SharedBuf::default();
    let writer = buf.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_writer(move || writer.clone())
        .finish();

    let watcher = FileWatcher::builder(&config_path, || {})
        .with_polling_only()
        .with_poll_interval(Duration::from_millis(20))
        .with_dispatch(tracing::Dispatch::new(subscriber))
        .build()
        .unwrap();
    watcher.start().unwrap();
    sleep(Duration::from_millis(100)).await;
    watcher.stop();
    watcher.join().await;

    let logs = buf.contents();
    assert!(logs.contains("Started to watch file"));
    assert!(logs.contains("falling back to polling"));
    assert!(logs.contains("File watch interrupted"));
    assert!(logs.contains("cfg.conf"));
}
