use anyhow::{Result, anyhow};
use core::time::Duration;
use html::{DOM, NodeId, Selector};
use page_handler::capabilities::DelayedContext;
use page_handler::session::{FONTS_LOADED_KEY, MemorySessionStorage, SessionStorage};
use page_handler::{BlockRegistry, Capabilities, HtmlPage, LoadPhase, LoadScheduler, PageConfig};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::time::Instant;
use url::Url;

mod common;

use common::{RecordingDelayed, RecordingStylesheets, TracingDecorator};

const PAGE_URL: &str = "https://example.com/page#details";

fn narrow_config() -> PageConfig {
    PageConfig::new("en", "", 600.0, 3000, false)
}

fn sharing_session(session: &Arc<MemorySessionStorage>) -> Capabilities {
    let storage: Arc<MemorySessionStorage> = Arc::clone(session);
    Capabilities::default().with_session(storage)
}

fn block_status(dom: &DOM, name: &str) -> Option<String> {
    let selector = Selector::parse(&format!("div.{name}")).ok()?;
    let block = dom.query_selector(dom.root(), &selector)?;
    dom.dataset(block, "blockStatus").map(str::to_owned)
}

#[tokio::test]
async fn phases_must_run_in_order() -> Result<()> {
    common::init_logger();
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), Capabilities::default());

    assert!(scheduler.load_lazy(&mut page).await.is_err());
    assert!(scheduler.load_delayed(&page).is_err());
    assert_eq!(scheduler.phase(), LoadPhase::NotStarted);

    scheduler.load_eager(&mut page).await?;
    assert_eq!(scheduler.phase(), LoadPhase::EagerComplete);
    assert!(scheduler.load_eager(&mut page).await.is_err(), "eager runs once");
    assert!(scheduler.load_delayed(&page).is_err());

    scheduler.load_lazy(&mut page).await?;
    assert_eq!(scheduler.phase(), LoadPhase::LazyComplete);
    let delayed = scheduler.load_delayed(&page)?;
    assert_eq!(scheduler.phase(), LoadPhase::DelayedScheduled);
    assert!(scheduler.load_delayed(&page).is_err());
    delayed.abort();
    Ok(())
}

#[tokio::test]
async fn full_load_reveals_every_section() -> Result<()> {
    common::init_logger();
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let config = PageConfig {
        telemetry_enabled: true,
        ..PageConfig::default()
    };
    let mut scheduler = LoadScheduler::new(config, Capabilities::default());
    let delayed = scheduler.load_page(&mut page).await?;
    delayed.abort();

    let dom = page.dom();
    let html = dom.document_element().expect("html element");
    assert_eq!(dom.attribute(html, "lang"), Some("en"));
    let body = dom.body().expect("body");
    for class in ["article", "wide-page", "dark", "appear"] {
        assert!(dom.has_class(body, class), "body is missing {class}");
    }

    let main = common::main_of(&page);
    let sections = dom.element_children(main);
    assert_eq!(sections.len(), 4);
    for section in sections {
        assert_eq!(dom.dataset(section, "sectionStatus"), Some("loaded"));
        assert_eq!(dom.style_property(section, "display"), None);
    }
    for name in ["hero", "cards", "quote", "header", "footer"] {
        assert_eq!(block_status(dom, name).as_deref(), Some("loaded"), "block {name}");
    }

    let header = dom.first_by_tag(dom.root(), "header").expect("header");
    assert!(dom.has_class(header, "header-wrapper"));
    assert_eq!(
        common::linked_stylesheets(dom),
        vec![
            "/blocks/hero/hero.css",
            "/styles/fonts.css",
            "/blocks/cards/cards.css",
            "/blocks/quote/quote.css",
            "/blocks/header/header.css",
            "/blocks/footer/footer.css",
            "/styles/lazy-styles.css",
        ]
    );
    assert_eq!(scheduler.timings().sections_loaded, 4);
    Ok(())
}

#[tokio::test]
async fn blocks_load_one_at_a_time_in_document_order() -> Result<()> {
    common::init_logger();
    let log = common::EventLog::default();
    let mut blocks = BlockRegistry::new();
    for name in ["hero", "cards", "quote", "header", "footer"] {
        blocks.register(name, TracingDecorator { log: Arc::clone(&log) });
    }
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler =
        LoadScheduler::new(PageConfig::default(), Capabilities::default().with_blocks(blocks));

    scheduler.load_eager(&mut page).await?;
    assert_eq!(common::events(&log), vec!["start hero", "end hero"]);

    scheduler.load_lazy(&mut page).await?;
    assert_eq!(
        common::events(&log),
        vec![
            "start hero",
            "end hero",
            "start cards",
            "end cards",
            "start quote",
            "end quote",
            "start header",
            "end header",
            "start footer",
            "end footer",
        ]
    );
    let decorated = Selector::parse("[data-decorated=\"true\"]")?;
    assert_eq!(page.dom().query_selector_all(page.dom().root(), &decorated).len(), 5);
    Ok(())
}

#[tokio::test]
async fn failing_decorator_still_marks_block_loaded() -> Result<()> {
    common::init_logger();
    let blocks = BlockRegistry::new().with("cards", |_: &mut DOM, _: NodeId| -> anyhow::Result<()> {
        Err(anyhow!("cards exploded"))
    });
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler =
        LoadScheduler::new(PageConfig::default(), Capabilities::default().with_blocks(blocks));

    scheduler.load_eager(&mut page).await?;
    scheduler.load_lazy(&mut page).await?;
    assert_eq!(block_status(page.dom(), "cards").as_deref(), Some("loaded"));
    assert_eq!(block_status(page.dom(), "quote").as_deref(), Some("loaded"));
    Ok(())
}

#[tokio::test]
async fn narrow_viewport_defers_fonts_until_lazy() -> Result<()> {
    common::init_logger();
    let session = Arc::new(MemorySessionStorage::new());
    let capabilities = sharing_session(&session);
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler = LoadScheduler::new(narrow_config(), capabilities);

    scheduler.load_eager(&mut page).await?;
    assert!(!common::linked_stylesheets(page.dom()).contains(&"/styles/fonts.css".to_owned()));
    assert_eq!(session.get_item(FONTS_LOADED_KEY)?, None);

    scheduler.load_lazy(&mut page).await?;
    assert_eq!(
        common::linked_stylesheets(page.dom()).last().map(String::as_str),
        Some("/styles/fonts.css")
    );
    assert_eq!(session.get_item(FONTS_LOADED_KEY)?.as_deref(), Some("true"));
    Ok(())
}

#[tokio::test]
async fn session_flag_loads_fonts_eagerly() -> Result<()> {
    common::init_logger();
    let session = Arc::new(MemorySessionStorage::new());
    session.set_item(FONTS_LOADED_KEY, "true")?;
    let capabilities = sharing_session(&session);
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler = LoadScheduler::new(narrow_config(), capabilities);

    scheduler.load_eager(&mut page).await?;
    assert!(common::linked_stylesheets(page.dom()).contains(&"/styles/fonts.css".to_owned()));
    Ok(())
}

#[tokio::test]
async fn localhost_never_sets_the_fonts_flag() -> Result<()> {
    common::init_logger();
    let session = Arc::new(MemorySessionStorage::new());
    let capabilities = sharing_session(&session);
    let mut page = common::page_from_fixture("page.html", "http://localhost:3000/page")?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), capabilities);

    scheduler.load_eager(&mut page).await?;
    scheduler.load_lazy(&mut page).await?;
    assert!(common::linked_stylesheets(page.dom()).contains(&"/styles/fonts.css".to_owned()));
    assert_eq!(session.get_item(FONTS_LOADED_KEY)?, None);
    Ok(())
}

#[tokio::test]
async fn font_failures_are_ignored() -> Result<()> {
    common::init_logger();
    let session = Arc::new(MemorySessionStorage::new());
    let stylesheets = Arc::new(RecordingStylesheets::failing_on("fonts"));
    let recorder: Arc<RecordingStylesheets> = Arc::clone(&stylesheets);
    let capabilities = sharing_session(&session).with_stylesheets(recorder);
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), capabilities);

    scheduler.load_eager(&mut page).await?;
    scheduler.load_lazy(&mut page).await?;
    assert_eq!(scheduler.phase(), LoadPhase::LazyComplete);
    assert_eq!(
        stylesheets.requests(),
        vec![
            "/blocks/hero/hero.css",
            "/styles/fonts.css",
            "/blocks/cards/cards.css",
            "/blocks/quote/quote.css",
            "/blocks/header/header.css",
            "/blocks/footer/footer.css",
            "/styles/lazy-styles.css",
            "/styles/fonts.css",
        ]
    );
    assert_eq!(session.get_item(FONTS_LOADED_KEY)?, None);
    Ok(())
}

#[tokio::test]
async fn lazy_stylesheet_failure_fails_the_phase() -> Result<()> {
    common::init_logger();
    let stylesheets = Arc::new(RecordingStylesheets::failing_on("lazy-styles"));
    let capabilities = Capabilities::default().with_stylesheets(stylesheets);
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), capabilities);

    scheduler.load_eager(&mut page).await?;
    let err = scheduler
        .load_lazy(&mut page)
        .await
        .expect_err("lazy stylesheet failure propagates");
    assert!(format!("{err:#}").contains("lazy stylesheet"));
    assert_eq!(scheduler.phase(), LoadPhase::EagerComplete);
    Ok(())
}

#[tokio::test]
async fn fragment_resolves_scroll_target() -> Result<()> {
    common::init_logger();
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), Capabilities::default());
    scheduler.load_eager(&mut page).await?;
    assert_eq!(page.scroll_target(), None, "resolved only once everything is loaded");
    scheduler.load_lazy(&mut page).await?;

    let target = page.scroll_target().expect("scroll target");
    assert_eq!(page.dom().attribute(target, "id"), Some("details"));

    let mut unknown = common::page_from_fixture("page.html", "https://example.com/page#missing")?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), Capabilities::default());
    scheduler.load_eager(&mut unknown).await?;
    scheduler.load_lazy(&mut unknown).await?;
    assert_eq!(unknown.scroll_target(), None);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn delayed_hook_runs_after_timer() -> Result<()> {
    common::init_logger();
    let delayed = RecordingDelayed::default();
    let calls = Arc::clone(&delayed.calls);
    let capabilities = Capabilities::default().with_delayed(Arc::new(delayed));
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), capabilities);

    scheduler.load_eager(&mut page).await?;
    scheduler.load_lazy(&mut page).await?;
    let scheduled_at = Instant::now();
    let handle = scheduler.load_delayed(&page)?;

    tokio::time::sleep(Duration::from_millis(2999)).await;
    assert!(calls.lock().map_err(|_| anyhow!("poisoned"))?.is_empty());

    handle.await?;
    let calls = calls.lock().map_err(|_| anyhow!("poisoned"))?.clone();
    let &[(called_at, ref context)] = calls.as_slice() else {
        panic!("delayed hook should run exactly once, got {}", calls.len());
    };
    assert!(called_at.duration_since(scheduled_at) >= Duration::from_millis(3000));
    assert_eq!(
        *context,
        DelayedContext {
            url: Url::parse(PAGE_URL)?,
            lang: "en".to_owned(),
        }
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn delayed_failures_stay_on_their_task() -> Result<()> {
    common::init_logger();
    let delayed = RecordingDelayed::failing();
    let calls = Arc::clone(&delayed.calls);
    let capabilities = Capabilities::default().with_delayed(Arc::new(delayed));
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), capabilities);

    let handle = scheduler.load_page(&mut page).await?;
    handle.await?;
    assert_eq!(calls.lock().map_err(|_| anyhow!("poisoned"))?.len(), 1);
    assert_eq!(scheduler.phase(), LoadPhase::DelayedScheduled);
    Ok(())
}

#[test]
fn delayed_phase_needs_a_runtime() -> Result<()> {
    common::init_logger();
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let mut page = common::page_from_fixture("page.html", PAGE_URL)?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), Capabilities::default());
    runtime.block_on(async {
        scheduler.load_eager(&mut page).await?;
        scheduler.load_lazy(&mut page).await
    })?;

    let err = scheduler.load_delayed(&page).expect_err("no runtime outside block_on");
    assert!(format!("{err:#}").contains("tokio runtime"));
    assert_eq!(scheduler.phase(), LoadPhase::LazyComplete);
    Ok(())
}

#[tokio::test]
async fn pages_without_main_still_load() -> Result<()> {
    common::init_logger();
    let mut page = common::page_from_fixture("no_main.html", "https://example.com/")?;
    let mut scheduler = LoadScheduler::new(PageConfig::default(), Capabilities::default());
    let delayed = scheduler.load_page(&mut page).await?;
    delayed.abort();

    let dom = page.dom();
    let body = dom.body().expect("body");
    assert!(!dom.has_class(body, "appear"));
    assert_eq!(block_status(dom, "header").as_deref(), Some("loaded"));
    assert_eq!(scheduler.timings().sections_loaded, 0);
    Ok(())
}

#[tokio::test]
async fn pages_stream_from_file_urls() -> Result<()> {
    common::init_logger();
    let path = common::fixtures_dir().join("page.html");
    let url = Url::from_file_path(&path).map_err(|()| anyhow!("bad fixture path {}", path.display()))?;
    let page = HtmlPage::new(&Handle::current(), url).await?;
    let main = common::main_of(&page);
    assert_eq!(page.dom().element_children(main).len(), 3);

    let missing = Url::parse("file:///definitely/not/here.html")?;
    assert!(HtmlPage::new(&Handle::current(), missing).await.is_err());
    let remote = Url::parse("https://example.com/")?;
    assert!(HtmlPage::new(&Handle::current(), remote).await.is_err());
    Ok(())
}

#[test]
fn default_config_matches_documented_values() {
    let config = PageConfig::default();
    assert_eq!(config.lang, "en");
    assert_eq!(config.delayed_delay(), Duration::from_millis(3000));
    assert!(config.is_wide_viewport());
    assert!(!narrow_config().is_wide_viewport());
    assert_eq!(
        PageConfig::new("de", "/base/", 1024.0, 10, false).block_stylesheet("cards"),
        "/base/blocks/cards/cards.css"
    );
}

#[tokio::test]
async fn pages_parse_from_chunked_streams() -> Result<()> {
    common::init_logger();
    let source = common::fixture_source("page.html")?;
    let (head, tail) = source.split_at(source.find("<main>").map_or(0, |at| at + 3));
    let chunks: Vec<Result<bytes::Bytes, anyhow::Error>> = vec![
        Ok(bytes::Bytes::from(head.to_owned())),
        Ok(bytes::Bytes::from(tail.to_owned())),
    ];
    let mut page = HtmlPage::from_stream(Url::parse(PAGE_URL)?, tokio_stream::iter(chunks)).await?;
    assert_eq!(page.url().fragment(), Some("details"));

    let mut scheduler = LoadScheduler::new(PageConfig::default(), Capabilities::default());
    scheduler.load_eager(&mut page).await?;
    scheduler.load_lazy(&mut page).await?;
    assert_eq!(scheduler.timings().sections_loaded, 4);
    Ok(())
}
