//! Batch orchestration against real files in temporary directories.

use mdbridge::{
    batch_convert, batch_convert_blocking, batch_stream, collect_files, BatchConfig, BatchControl,
    BatchProgressCallback, TargetFormat,
};
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Route library spans to the test harness; `RUST_LOG=mdbridge=debug` shows them.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, body).unwrap();
    path
}

fn markdown_files(dir: &Path, n: usize) -> Vec<PathBuf> {
    (0..n)
        .map(|i| write(dir, &format!("doc{i:02}.md"), &format!("# Doc {i}\n\nBody *{i}*")))
        .collect()
}

/// Cancels the batch once `after` files have completed.
struct CancelAfter {
    control: Arc<BatchControl>,
    after: usize,
    completed: AtomicUsize,
    started: AtomicUsize,
}

impl BatchProgressCallback for CancelAfter {
    fn on_file_start(&self, _index: usize, _total: usize, _file: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn on_file_complete(&self, _index: usize, _total: usize, _file: &str) {
        let done = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        if done == self.after {
            self.control.cancel();
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_parallel_batch_converts_everything() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let mut files = markdown_files(dir.path(), 6);
    files.push(write(dir.path(), "page.html", "<p><b>hi</b></p>"));

    let config = BatchConfig::builder().workers(4).build().unwrap();
    let out = batch_convert(files, &config, Arc::new(BatchControl::new())).await;

    assert_eq!(out.results.len(), 7);
    assert_eq!(out.stats.converted, 7);
    assert_eq!(out.stats.failed, 0);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("doc03.html")).unwrap(),
        "<h1>Doc 3</h1>\n<p>Body <em>3</em></p>"
    );
    assert_eq!(std::fs::read_to_string(dir.path().join("page.md")).unwrap(), "**hi**");
}

#[tokio::test]
async fn test_cancel_mid_batch_skips_the_rest() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let files = markdown_files(dir.path(), 10);

    let control = Arc::new(BatchControl::new());
    let callback = Arc::new(CancelAfter {
        control: Arc::clone(&control),
        after: 3,
        completed: AtomicUsize::new(0),
        started: AtomicUsize::new(0),
    });
    let config = BatchConfig::builder()
        .workers(4)
        .progress_callback(Arc::clone(&callback) as Arc<dyn BatchProgressCallback>)
        .build()
        .unwrap();

    let out = batch_convert(files, &config, Arc::clone(&control)).await;

    let finished = out.results.len();
    assert!((3..=10).contains(&finished), "finished {finished}");
    assert!(out.stats.cancelled);
    assert_eq!(out.stats.skipped, 10 - finished);
    assert_eq!(out.stats.converted, finished);
    // Every started job reported a result.
    assert_eq!(callback.started.load(Ordering::SeqCst), finished);
}

#[tokio::test]
async fn test_mixed_results_do_not_stop_the_batch() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let files = vec![
        write(dir.path(), "ok.md", "fine"),
        write(dir.path(), "notes.txt", "plain"),
        dir.path().join("missing.html"),
        write(dir.path(), "also-ok.htm", "<i>x</i>"),
    ];

    let config = BatchConfig::builder().workers(2).build().unwrap();
    let out = batch_convert(files, &config, Arc::new(BatchControl::new())).await;

    assert_eq!(out.stats.total, 4);
    assert_eq!(out.stats.converted, 2);
    assert_eq!(out.stats.failed, 2);
    let messages: Vec<&str> = out.failures().map(|r| r.message.as_str()).collect();
    assert!(messages.contains(&"Cannot auto-detect target for: .txt"), "{messages:?}");
    assert!(messages.iter().any(|m| m.contains("not found")), "{messages:?}");
}

#[tokio::test]
async fn test_output_dir_mirrors_tree() {
    let src = TempDir::new().unwrap();
    let dst = TempDir::new().unwrap();
    write(src.path(), "index.md", "# Home");
    write(src.path(), "guide/intro.md", "Intro");
    write(src.path(), "guide/skip.txt", "ignored");

    let files = collect_files(src.path(), &["md", "html"], true).unwrap();
    assert_eq!(files.len(), 2);

    let config = BatchConfig::builder()
        .workers(2)
        .output_dir(dst.path())
        .base_dir(src.path())
        .build()
        .unwrap();
    let out = batch_convert(files, &config, Arc::new(BatchControl::new())).await;

    assert_eq!(out.stats.converted, 2);
    assert_eq!(
        std::fs::read_to_string(dst.path().join("guide/intro.html")).unwrap(),
        "<p>Intro</p>"
    );
    assert!(dst.path().join("index.html").exists());
    assert!(!src.path().join("index.html").exists());
}

#[tokio::test]
async fn test_forced_target() {
    let dir = TempDir::new().unwrap();
    let files = vec![write(dir.path(), "page.htm", "<h2>Hi</h2>")];

    let config = BatchConfig::builder().target(TargetFormat::Markdown).build().unwrap();
    let out = batch_convert(files, &config, Arc::new(BatchControl::new())).await;

    assert_eq!(out.stats.converted, 1);
    assert_eq!(std::fs::read_to_string(dir.path().join("page.md")).unwrap(), "## Hi");
}

#[tokio::test]
async fn test_stream_yields_one_result_per_file() {
    let dir = TempDir::new().unwrap();
    let files = markdown_files(dir.path(), 5);

    let config = BatchConfig::builder().workers(3).build().unwrap();
    let mut stream = batch_stream(files, &config, Arc::new(BatchControl::new()));

    let mut seen = 0;
    while let Some(result) = stream.next().await {
        assert!(result.success, "{}", result.message);
        seen += 1;
    }
    assert_eq!(seen, 5);
}

#[test]
fn test_blocking_wrapper_with_allowlist() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let allowlist = write(dir.path(), "tags.json", r#"{ "inline": ["em"], "block": ["p"] }"#);
    let files = vec![write(dir.path(), "page.html", "<p><em>a</em> <b>b</b></p>")];

    let options = mdbridge::ConversionOptions::builder().drop_unknown_tags(true).build();
    let config = BatchConfig::builder()
        .options(options)
        .allowlist(allowlist)
        .build()
        .unwrap();
    let out = batch_convert_blocking(files, &config, Arc::new(BatchControl::new())).unwrap();

    assert_eq!(out.stats.converted, 1);
    assert_eq!(std::fs::read_to_string(dir.path().join("page.md")).unwrap(), "*a* b");
}

#[test]
fn test_runs_on_a_current_thread_runtime() {
    let dir = TempDir::new().unwrap();
    let files = markdown_files(dir.path(), 2);
    let config = BatchConfig::builder().workers(2).build().unwrap();

    let out = tokio_test::block_on(batch_convert(files, &config, Arc::new(BatchControl::new())));
    assert_eq!(out.stats.converted, 2);
}
