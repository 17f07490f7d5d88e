use crate::capabilities::DelayedContext;
use crate::url::stream_url;
use anyhow::Error;
use bytes::Bytes;
use html::parser::HTMLParser;
use html::{DOM, NodeId};
use log::info;
use tokio::runtime::Handle;
use tokio_stream::Stream;
use url::Url;

/// A parsed page and the little state the loaders keep alongside it.
pub struct HtmlPage {
    // The DOM of the page.
    dom: DOM,
    url: Url,
    /// Element named by the URL fragment, resolved during the lazy phase.
    scroll_target: Option<NodeId>,
}

impl HtmlPage {
    /// Create a new `HtmlPage` by streaming the content from the given URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL cannot be read or the document fails to parse.
    pub async fn new(handle: &Handle, url: Url) -> Result<Self, Error> {
        let loader = HTMLParser::parse(handle, stream_url(&url).await?);
        let dom = loader.finish().await?;
        info!("Parsed {url}");
        Ok(Self::with_dom(url, dom))
    }

    /// Parse a page from an arbitrary byte stream.
    ///
    /// # Errors
    ///
    /// Returns the first stream error or a parse failure.
    pub async fn from_stream<S>(url: Url, byte_stream: S) -> Result<Self, Error>
    where
        S: Stream<Item = Result<Bytes, Error>> + Send + Unpin + 'static,
    {
        let dom = HTMLParser::process(byte_stream).await?;
        Ok(Self::with_dom(url, dom))
    }

    /// Parse a page held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the document fails to parse.
    pub fn from_html(url: Url, html: &str) -> Result<Self, Error> {
        Ok(Self::with_dom(url, HTMLParser::parse_str(html)?))
    }

    #[inline]
    #[must_use]
    pub const fn with_dom(url: Url, dom: DOM) -> Self {
        Self {
            dom,
            url,
            scroll_target: None,
        }
    }

    #[inline]
    pub const fn dom(&self) -> &DOM {
        &self.dom
    }

    #[inline]
    pub const fn dom_mut(&mut self) -> &mut DOM {
        &mut self.dom
    }

    #[inline]
    pub const fn url(&self) -> &Url {
        &self.url
    }

    /// The first `<main>` element, if any.
    pub fn main(&self) -> Option<NodeId> {
        self.dom.first_by_tag(self.dom.root(), "main")
    }

    /// Element the page should be scrolled to once loaded.
    #[inline]
    pub const fn scroll_target(&self) -> Option<NodeId> {
        self.scroll_target
    }

    pub(crate) const fn set_scroll_target(&mut self, target: Option<NodeId>) {
        self.scroll_target = target;
    }

    /// Owned snapshot handed to the delayed phase.
    pub fn delayed_context(&self, lang: &str) -> DelayedContext {
        DelayedContext {
            url: self.url.clone(),
            lang: lang.to_owned(),
        }
    }
}
