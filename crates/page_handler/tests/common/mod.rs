#![allow(dead_code)]
use anyhow::{Result, anyhow};
use html::{DOM, NodeId};
use page_handler::capabilities::{
    BlockDecorator, DelayedContext, DelayedFuture, DelayedLoader, ExecFuture, LinkStylesheets,
    StylesheetLoader,
};
use page_handler::state::HtmlPage;
use std::fs;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use url::Url;

pub fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

/// Returns the directory containing HTML fixtures for integration tests.
pub fn fixtures_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
}

pub fn fixture_source(name: &str) -> Result<String> {
    let path = fixtures_dir().join(name);
    fs::read_to_string(&path).map_err(|err| anyhow!("Failed to read {}: {err}", path.display()))
}

/// Parse a fixture as if it had been served from `url`.
pub fn page_from_fixture(name: &str, url: &str) -> Result<HtmlPage> {
    HtmlPage::from_html(Url::parse(url)?, &fixture_source(name)?)
}

/// Parse an inline snippet wrapped in a minimal document.
pub fn page_from_body(body: &str) -> Result<HtmlPage> {
    HtmlPage::from_html(
        Url::parse("https://example.com/")?,
        &format!("<!DOCTYPE html><html><head></head><body>{body}</body></html>"),
    )
}

pub fn main_of(page: &HtmlPage) -> NodeId {
    page.main().expect("fixture has a <main>")
}

/// `href`s of every stylesheet link in `<head>`, in insertion order.
pub fn linked_stylesheets(dom: &DOM) -> Vec<String> {
    let Some(head) = dom.head() else {
        return Vec::new();
    };
    dom.all_by_tag(head, "link")
        .into_iter()
        .filter(|link| dom.attribute(*link, "rel") == Some("stylesheet"))
        .filter_map(|link| dom.attribute(link, "href").map(str::to_owned))
        .collect()
}

pub type EventLog = Arc<Mutex<Vec<String>>>;

pub fn events(log: &EventLog) -> Vec<String> {
    log.lock().map(|entries| entries.clone()).unwrap_or_default()
}

/// Block decorator that yields mid-way so interleaved loads would show up in the log.
pub struct TracingDecorator {
    pub log: EventLog,
}

impl BlockDecorator for TracingDecorator {
    fn decorate<'a>(&'a self, dom: &'a mut DOM, block: NodeId) -> ExecFuture<'a> {
        Box::pin(async move {
            let name = dom.dataset(block, "blockName").unwrap_or_default().to_owned();
            self.log.lock().map_err(|_| anyhow!("poisoned"))?.push(format!("start {name}"));
            tokio::task::yield_now().await;
            dom.set_dataset(block, "decorated", "true");
            self.log.lock().map_err(|_| anyhow!("poisoned"))?.push(format!("end {name}"));
            Ok::<(), anyhow::Error>(())
        })
    }
}

/// Stylesheet loader that records every request and fails for hrefs containing `fail_on`.
#[derive(Default)]
pub struct RecordingStylesheets {
    pub requests: Mutex<Vec<String>>,
    pub fail_on: Option<&'static str>,
}

impl RecordingStylesheets {
    pub fn failing_on(pattern: &'static str) -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            fail_on: Some(pattern),
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl StylesheetLoader for RecordingStylesheets {
    fn load_css<'a>(&'a self, dom: &'a mut DOM, href: &'a str) -> ExecFuture<'a> {
        Box::pin(async move {
            self.requests
                .lock()
                .map_err(|_| anyhow!("poisoned"))?
                .push(href.to_owned());
            if self.fail_on.is_some_and(|pattern| href.contains(pattern)) {
                return Err(anyhow!("network error loading {href}"));
            }
            LinkStylesheets.load_css(dom, href).await
        })
    }
}

/// Delayed hook that records when and with what it was called.
#[derive(Default)]
pub struct RecordingDelayed {
    pub calls: Arc<Mutex<Vec<(Instant, DelayedContext)>>>,
    pub fail: bool,
}

impl RecordingDelayed {
    pub fn failing() -> Self {
        Self {
            calls: Arc::default(),
            fail: true,
        }
    }

    pub fn calls(&self) -> Vec<(Instant, DelayedContext)> {
        self.calls
            .lock()
            .map(|entries| entries.clone())
            .unwrap_or_default()
    }
}

impl DelayedLoader for RecordingDelayed {
    fn load_delayed(&self, context: DelayedContext) -> DelayedFuture {
        let calls = Arc::clone(&self.calls);
        let fail = self.fail;
        Box::pin(async move {
            calls
                .lock()
                .map_err(|_| anyhow!("poisoned"))?
                .push((Instant::now(), context));
            if fail {
                return Err(anyhow!("delayed script crashed"));
            }
            Ok(())
        })
    }
}
