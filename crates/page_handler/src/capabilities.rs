//! Pluggable host services used while loading a page.
//!
//! Everything that would touch the network or a renderer sits behind a trait
//! here. The default implementations keep all work in memory so a page can be
//! decorated and loaded without any host at all.

use crate::session::{MemorySessionStorage, SessionStorage};
use anyhow::{Context as _, Error, anyhow};
use core::future::Future;
use core::pin::Pin;
use html::{DOM, NodeId};
use log::{debug, trace};
use std::collections::HashMap;
use std::sync::Arc;
use url::Url;

// Reduce type complexity with an alias for async collaborator futures
pub type ExecFuture<'a> = Pin<Box<dyn Future<Output = Result<(), Error>> + 'a>>;

/// Future returned by [`DelayedLoader`]; it runs on its own task.
pub type DelayedFuture = Pin<Box<dyn Future<Output = Result<(), Error>> + Send + 'static>>;

/// Renders one block's content model.
///
/// Plain functions and closures of shape `Fn(&mut DOM, NodeId) -> Result<(), Error>`
/// implement this trait directly.
pub trait BlockDecorator: Send + Sync {
    fn decorate<'a>(&'a self, dom: &'a mut DOM, block: NodeId) -> ExecFuture<'a>;
}

impl<F> BlockDecorator for F
where
    F: Fn(&mut DOM, NodeId) -> Result<(), Error> + Send + Sync,
{
    fn decorate<'a>(&'a self, dom: &'a mut DOM, block: NodeId) -> ExecFuture<'a> {
        Box::pin(async move { self(dom, block) })
    }
}

/// Block decorators keyed by block name.
#[derive(Clone, Default)]
pub struct BlockRegistry {
    decorators: HashMap<String, Arc<dyn BlockDecorator>>,
}

impl BlockRegistry {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `decorator` for `name`, replacing any earlier registration.
    pub fn register<D>(&mut self, name: &str, decorator: D)
    where
        D: BlockDecorator + 'static,
    {
        self.decorators.insert(name.to_owned(), Arc::new(decorator));
    }

    /// Builder-style [`BlockRegistry::register`].
    #[must_use]
    pub fn with<D>(mut self, name: &str, decorator: D) -> Self
    where
        D: BlockDecorator + 'static,
    {
        self.register(name, decorator);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn BlockDecorator>> {
        self.decorators.get(name).map(Arc::clone)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.decorators.contains_key(name)
    }
}

/// Loads a stylesheet into the document. Loading the same href twice is a no-op.
pub trait StylesheetLoader: Send + Sync {
    fn load_css<'a>(&'a self, dom: &'a mut DOM, href: &'a str) -> ExecFuture<'a>;
}

/// Appends `<link rel="stylesheet">` to `<head>`, once per href.
#[derive(Debug, Default, Clone, Copy)]
pub struct LinkStylesheets;

impl LinkStylesheets {
    fn insert_link(dom: &mut DOM, href: &str) -> Result<(), Error> {
        let head = dom
            .head()
            .ok_or_else(|| anyhow!("document has no <head> for stylesheet {href}"))?;
        let present = dom
            .all_by_tag(head, "link")
            .into_iter()
            .any(|link| dom.attribute(link, "href") == Some(href));
        if present {
            trace!("Stylesheet {href} already linked");
            return Ok(());
        }
        let link = dom.create_element("link");
        dom.set_attribute(link, "rel", "stylesheet");
        dom.set_attribute(link, "href", href);
        dom.append_child(head, link)
            .with_context(|| format!("linking stylesheet {href}"))?;
        debug!("Linked stylesheet {href}");
        Ok(())
    }
}

impl StylesheetLoader for LinkStylesheets {
    fn load_css<'a>(&'a self, dom: &'a mut DOM, href: &'a str) -> ExecFuture<'a> {
        Box::pin(async move { Self::insert_link(dom, href) })
    }
}

/// Resolves once an image is ready to paint (or failed to load).
pub trait ImageLoader: Send + Sync {
    fn load_image<'a>(&'a self, src: &'a str) -> ExecFuture<'a>;
}

/// Treats every image as already complete.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImmediateImages;

impl ImageLoader for ImmediateImages {
    fn load_image<'a>(&'a self, src: &'a str) -> ExecFuture<'a> {
        Box::pin(async move {
            trace!("Image {src} ready");
            Ok::<(), Error>(())
        })
    }
}

/// What the delayed phase knows about the page. Owned, so the delayed task
/// never touches the live document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayedContext {
    pub url: Url,
    pub lang: String,
}

/// Work postponed until well after the page is interactive.
pub trait DelayedLoader: Send + Sync {
    fn load_delayed(&self, context: DelayedContext) -> DelayedFuture;
}

/// Delayed loader that has nothing to do.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoDelayedWork;

impl DelayedLoader for NoDelayedWork {
    fn load_delayed(&self, context: DelayedContext) -> DelayedFuture {
        Box::pin(async move {
            debug!("No delayed work for {}", context.url);
            Ok::<(), Error>(())
        })
    }
}

/// Host services bundled for the loaders.
#[derive(Clone)]
pub struct Capabilities {
    pub blocks: Arc<BlockRegistry>,
    pub stylesheets: Arc<dyn StylesheetLoader>,
    pub images: Arc<dyn ImageLoader>,
    pub session: Arc<dyn SessionStorage>,
    pub delayed: Arc<dyn DelayedLoader>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            blocks: Arc::new(BlockRegistry::new()),
            stylesheets: Arc::new(LinkStylesheets),
            images: Arc::new(ImmediateImages),
            session: Arc::new(MemorySessionStorage::new()),
            delayed: Arc::new(NoDelayedWork),
        }
    }
}

impl Capabilities {
    #[must_use]
    pub fn with_blocks(mut self, blocks: BlockRegistry) -> Self {
        self.blocks = Arc::new(blocks);
        self
    }

    #[must_use]
    pub fn with_stylesheets(mut self, loader: Arc<dyn StylesheetLoader>) -> Self {
        self.stylesheets = loader;
        self
    }

    #[must_use]
    pub fn with_images(mut self, loader: Arc<dyn ImageLoader>) -> Self {
        self.images = loader;
        self
    }

    #[must_use]
    pub fn with_session(mut self, storage: Arc<dyn SessionStorage>) -> Self {
        self.session = storage;
        self
    }

    #[must_use]
    pub fn with_delayed(mut self, loader: Arc<dyn DelayedLoader>) -> Self {
        self.delayed = loader;
        self
    }
}
