//! Configuration settings for page loading.
//!
//! This module defines runtime configuration for the load scheduler: document
//! language, where block and style assets live, the viewport heuristic that
//! gates eager font loading, the delayed-phase timer, and telemetry. Configuration
//! can be loaded from environment variables or constructed programmatically.

use core::time::Duration;
use std::env;

/// Default viewport width in CSS pixels when none is configured.
const DEFAULT_VIEWPORT_WIDTH: f32 = 1024.0;
/// Viewports at least this wide are treated as fast connections that can afford fonts eagerly.
const DEFAULT_FONT_BREAKPOINT: f32 = 900.0;
/// Delay between lazy completion and the delayed phase.
const DEFAULT_DELAYED_MS: u64 = 3000;

/// Runtime configuration for a page load.
#[derive(Clone, Debug, PartialEq)]
pub struct PageConfig {
    /// Value written to `<html lang>` during the eager phase
    pub lang: String,
    /// Prefix for block, icon and style asset paths (no trailing slash)
    pub code_base_path: String,
    /// Viewport width in CSS pixels
    pub viewport_width: f32,
    /// Minimum viewport width at which fonts load during the eager phase
    pub font_breakpoint: f32,
    /// Delay before the delayed phase runs, in milliseconds
    pub delayed_ms: u64,
    /// Whether to emit phase timings as a JSON log line
    pub telemetry_enabled: bool,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            lang: String::from("en"),
            code_base_path: String::new(),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            font_breakpoint: DEFAULT_FONT_BREAKPOINT,
            delayed_ms: DEFAULT_DELAYED_MS,
            telemetry_enabled: false,
        }
    }
}

impl PageConfig {
    /// Construct a new `PageConfig` with explicit values.
    ///
    /// A trailing `/` on `code_base_path` is dropped so asset paths join cleanly.
    #[inline]
    #[must_use]
    pub fn new(
        lang: &str,
        code_base_path: &str,
        viewport_width: f32,
        delayed_ms: u64,
        telemetry_enabled: bool,
    ) -> Self {
        Self {
            lang: lang.to_owned(),
            code_base_path: code_base_path.trim_end_matches('/').to_owned(),
            viewport_width,
            font_breakpoint: DEFAULT_FONT_BREAKPOINT,
            delayed_ms,
            telemetry_enabled,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Reads the following environment variables:
    /// - `PAGE_LANG`: Document language (default: `en`)
    /// - `PAGE_CODE_BASE_PATH`: Asset path prefix (default: empty)
    /// - `PAGE_VIEWPORT_WIDTH`: Viewport width in pixels (default: 1024)
    /// - `PAGE_FONT_BREAKPOINT`: Eager font loading breakpoint (default: 900)
    /// - `PAGE_DELAYED_MS`: Delayed phase timer in milliseconds (default: 3000)
    /// - `PAGE_TELEMETRY`: Set to "1" to enable telemetry (default: disabled)
    #[inline]
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let lang = env::var("PAGE_LANG")
            .ok()
            .filter(|val| !val.trim().is_empty())
            .unwrap_or(defaults.lang);
        let code_base_path = env::var("PAGE_CODE_BASE_PATH")
            .map(|val| val.trim_end_matches('/').to_owned())
            .unwrap_or(defaults.code_base_path);
        let viewport_width = env::var("PAGE_VIEWPORT_WIDTH")
            .ok()
            .and_then(|val| val.parse::<f32>().ok())
            .unwrap_or(defaults.viewport_width);
        let font_breakpoint = env::var("PAGE_FONT_BREAKPOINT")
            .ok()
            .and_then(|val| val.parse::<f32>().ok())
            .unwrap_or(defaults.font_breakpoint);
        let delayed_ms = env::var("PAGE_DELAYED_MS")
            .ok()
            .and_then(|val| val.parse::<u64>().ok())
            .unwrap_or(defaults.delayed_ms);
        let telemetry_enabled = env::var("PAGE_TELEMETRY").ok().as_deref() == Some("1");
        Self {
            lang,
            code_base_path,
            viewport_width,
            font_breakpoint,
            delayed_ms,
            telemetry_enabled,
        }
    }

    /// Get the delayed phase timer as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn delayed_delay(&self) -> Duration {
        Duration::from_millis(self.delayed_ms)
    }

    /// True when the viewport is wide enough to load fonts during the eager phase.
    #[inline]
    #[must_use]
    pub fn is_wide_viewport(&self) -> bool {
        self.viewport_width >= self.font_breakpoint
    }

    /// Path of an asset below the code base, e.g. `/styles/fonts.css`.
    #[must_use]
    pub fn asset_path(&self, relative: &str) -> String {
        format!("{}{relative}", self.code_base_path)
    }

    #[must_use]
    pub fn fonts_stylesheet(&self) -> String {
        self.asset_path("/styles/fonts.css")
    }

    #[must_use]
    pub fn lazy_stylesheet(&self) -> String {
        self.asset_path("/styles/lazy-styles.css")
    }

    /// Stylesheet path for a named block.
    #[must_use]
    pub fn block_stylesheet(&self, block_name: &str) -> String {
        self.asset_path(&format!("/blocks/{block_name}/{block_name}.css"))
    }

    /// Image path for a named icon.
    #[must_use]
    pub fn icon_path(&self, icon_name: &str) -> String {
        self.asset_path(&format!("/icons/{icon_name}.svg"))
    }
}
