//! Three-tier page load scheduling.
//!
//! - **Eager**: everything needed for the first meaningful paint. Decorates
//!   `<main>` and loads the first section, waiting for its first image.
//! - **Lazy**: the rest of the sections in order, header, footer, the lazy
//!   stylesheet and fonts.
//! - **Delayed**: a background task that runs the delayed hook once the
//!   configured timer expires.
//!
//! Phases must run in that order; [`LoadScheduler`] rejects anything else.

use crate::capabilities::Capabilities;
use crate::config::PageConfig;
use crate::decorators::decorate_template_and_theme;
use crate::pipeline::decorate_main;
use crate::sections::{
    WaitForFirstImage, load_footer, load_header, load_section, load_sections,
};
use crate::session::{fonts_loaded, remember_fonts_loaded};
use crate::state::HtmlPage;
use crate::telemetry::{PhaseTimings, duration_ms, maybe_emit, phase_timings_json};
use anyhow::{Context as _, Error, anyhow};
use html::Selector;
use log::{debug, error, info};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep};

/// Progress of a page load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LoadPhase {
    #[default]
    NotStarted,
    EagerComplete,
    LazyComplete,
    DelayedScheduled,
}

/// Drives one page through the eager, lazy and delayed phases.
pub struct LoadScheduler {
    config: PageConfig,
    capabilities: Capabilities,
    phase: LoadPhase,
    timings: PhaseTimings,
}

impl LoadScheduler {
    #[inline]
    #[must_use]
    pub fn new(config: PageConfig, capabilities: Capabilities) -> Self {
        Self {
            config,
            capabilities,
            phase: LoadPhase::NotStarted,
            timings: PhaseTimings::default(),
        }
    }

    #[inline]
    pub const fn phase(&self) -> LoadPhase {
        self.phase
    }

    #[inline]
    pub const fn timings(&self) -> PhaseTimings {
        self.timings
    }

    #[inline]
    pub const fn config(&self) -> &PageConfig {
        &self.config
    }

    fn require_phase(&self, expected: LoadPhase, next: &str) -> Result<(), Error> {
        if self.phase == expected {
            Ok(())
        } else {
            Err(anyhow!(
                "cannot start {next} phase in state {:?} (expected {expected:?})",
                self.phase
            ))
        }
    }

    /// Load the font stylesheet and remember it for the session.
    ///
    /// Failures are logged and otherwise ignored.
    async fn load_fonts(&self, page: &mut HtmlPage) {
        let href = self.config.fonts_stylesheet();
        match self
            .capabilities
            .stylesheets
            .load_css(page.dom_mut(), &href)
            .await
        {
            Ok(()) => remember_fonts_loaded(&*self.capabilities.session, page.url().host_str()),
            Err(err) => debug!("Ignoring font stylesheet failure: {err:#}"),
        }
    }

    /// Everything needed to reach the largest contentful paint.
    ///
    /// Sets the document language, applies template and theme classes,
    /// decorates `<main>`, reveals the body and loads the first section. Fonts
    /// load when the viewport is wide or an earlier load in this session
    /// fetched them.
    ///
    /// # Errors
    ///
    /// Returns an error if the scheduler is not in [`LoadPhase::NotStarted`],
    /// or if decoration or the first section load fails.
    pub async fn load_eager(&mut self, page: &mut HtmlPage) -> Result<(), Error> {
        self.require_phase(LoadPhase::NotStarted, "eager")?;
        let started = Instant::now();

        let main = page.main();
        let dom = page.dom_mut();
        if let Some(html) = dom.document_element() {
            dom.set_attribute(html, "lang", &self.config.lang);
        }
        decorate_template_and_theme(dom);

        if let Some(main) = main {
            decorate_main(dom, main, &self.config)?;
            if let Some(body) = dom.body() {
                dom.add_class(body, "appear");
            }
            let first_section = dom.query_selector(main, &Selector::parse(".section")?);
            if let Some(section) = first_section {
                let callback = WaitForFirstImage::new(Arc::clone(&self.capabilities.images));
                let loaded = load_section(
                    dom,
                    section,
                    Some(&callback),
                    &self.config,
                    &self.capabilities,
                )
                .await
                .context("loading first section")?;
                if loaded {
                    self.timings.sections_loaded += 1;
                }
            } else {
                debug!("No section to load eagerly");
            }
        } else {
            debug!("Document has no <main>; skipping decoration");
        }

        // Awaited in place: the font load borrows the document, so it cannot outlive the phase.
        if self.config.is_wide_viewport() || fonts_loaded(&*self.capabilities.session) {
            self.load_fonts(page).await;
        }

        self.timings.eager_ms = duration_ms(started.elapsed());
        self.phase = LoadPhase::EagerComplete;
        info!("Eager phase complete in {}ms", self.timings.eager_ms);
        Ok(())
    }

    /// Everything that should not hold up first paint.
    ///
    /// Loads the remaining sections one by one, resolves the URL fragment to
    /// a scroll target, loads header and footer, then the lazy stylesheet and
    /// fonts.
    ///
    /// # Errors
    ///
    /// Returns an error if eager loading has not completed, or if a section,
    /// header, footer or the lazy stylesheet fails to load.
    pub async fn load_lazy(&mut self, page: &mut HtmlPage) -> Result<(), Error> {
        self.require_phase(LoadPhase::EagerComplete, "lazy")?;
        let started = Instant::now();

        if let Some(main) = page.main() {
            let loaded = load_sections(page.dom_mut(), main, &self.config, &self.capabilities)
                .await
                .context("loading sections")?;
            self.timings.sections_loaded += loaded;
        }

        let target = page
            .url()
            .fragment()
            .filter(|fragment| !fragment.is_empty())
            .and_then(|fragment| page.dom().element_by_id(fragment));
        if let Some(target) = target {
            debug!("Scroll target {target:?}");
            page.set_scroll_target(Some(target));
        }

        let root = page.dom().root();
        if let Some(header) = page.dom().first_by_tag(root, "header") {
            load_header(page.dom_mut(), header, &self.config, &self.capabilities).await?;
        }
        if let Some(footer) = page.dom().first_by_tag(root, "footer") {
            load_footer(page.dom_mut(), footer, &self.config, &self.capabilities).await?;
        }

        let lazy_styles = self.config.lazy_stylesheet();
        self.capabilities
            .stylesheets
            .load_css(page.dom_mut(), &lazy_styles)
            .await
            .context("loading lazy stylesheet")?;
        self.load_fonts(page).await;

        self.timings.lazy_ms = duration_ms(started.elapsed());
        self.phase = LoadPhase::LazyComplete;
        info!("Lazy phase complete in {}ms", self.timings.lazy_ms);
        Ok(())
    }

    /// Schedule the delayed hook on its own task, `delayed_ms` from now.
    ///
    /// The returned handle may be awaited or dropped; the scheduler itself
    /// never waits for it. Hook failures are logged on that task.
    ///
    /// # Errors
    ///
    /// Returns an error if lazy loading has not completed or no tokio runtime
    /// is running.
    pub fn load_delayed(&mut self, page: &HtmlPage) -> Result<JoinHandle<()>, Error> {
        self.require_phase(LoadPhase::LazyComplete, "delayed")?;
        let runtime = Handle::try_current().context("delayed phase needs a tokio runtime")?;
        let context = page.delayed_context(&self.config.lang);
        let loader = Arc::clone(&self.capabilities.delayed);
        let delay = self.config.delayed_delay();
        let handle = runtime.spawn(async move {
            sleep(delay).await;
            if let Err(err) = loader.load_delayed(context).await {
                error!("Delayed loading failed: {err:#}");
            }
        });
        self.phase = LoadPhase::DelayedScheduled;
        Ok(handle)
    }

    /// Run all three phases and emit timings when telemetry is enabled.
    ///
    /// # Errors
    ///
    /// Returns the first phase failure.
    pub async fn load_page(&mut self, page: &mut HtmlPage) -> Result<JoinHandle<()>, Error> {
        self.load_eager(page).await?;
        self.load_lazy(page).await?;
        let delayed = self.load_delayed(page)?;
        maybe_emit(
            self.config.telemetry_enabled,
            &phase_timings_json(&self.timings),
        );
        Ok(delayed)
    }
}
