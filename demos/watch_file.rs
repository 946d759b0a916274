//! Example watching a configuration file and reporting changes.
//!
//! Run with: cargo run --example watch_file -- path/to/app.yaml
//!
//! While running, edit the file to see notifications. Press Ctrl+C to stop.

use config_file_watcher::prelude::*;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/config/app.yaml".to_string());

    // Create an initial config file if it doesn't exist
    if !Path::new(&path).exists() {
        if let Some(parent) = Path::new(&path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, "server:\n  port: 8080\n")?;
        println!("Created {}", path);
    }

    let changes = Arc::new(AtomicUsize::new(0));
    let changes_clone = Arc::clone(&changes);

    let watcher = FileWatcher::new(&path, move || {
        let n = changes_clone.fetch_add(1, Ordering::SeqCst) + 1;
        println!("Change #{} detected", n);
    })?;
    watcher.start()?;

    println!("Watching {} (Ctrl+C to stop)", watcher.path().display());
    tokio::signal::ctrl_c().await?;

    watcher.stop();
    watcher.join().await;
    println!("Saw {} change(s)", changes.load(Ordering::SeqCst));
    Ok(())
}
