mod sink;

use crate::dom::DOM;
use crate::parser::sink::DocumentSink;
use anyhow::{Error, anyhow};
use bytes::Bytes;
use html5ever::tendril::{ByteTendril, TendrilSink as _};
use html5ever::{ParseOpts, parse_document};
use indextree::NodeId;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{self, JoinHandle};
use tokio_stream::{Stream, StreamExt as _};

/// Streaming HTML parser producing a [`DOM`].
///
/// html5ever's tree builder is `!Send`, so the parse itself runs on a blocking
/// worker and async byte chunks are forwarded to it over a channel.
pub struct HTMLParser {
    process_handle: JoinHandle<Result<DOM, Error>>,
}

impl HTMLParser {
    /// Start parsing `byte_stream` on the given runtime.
    pub fn parse<S>(handle: &Handle, byte_stream: S) -> Self
    where
        S: Stream<Item = Result<Bytes, Error>> + Send + Unpin + 'static,
    {
        let process_handle = handle.spawn(Self::process(byte_stream));
        Self { process_handle }
    }

    /// Parse a complete document held in memory.
    ///
    /// # Errors
    ///
    /// Returns an error if the parsed tree cannot be materialized.
    pub fn parse_str(html: &str) -> Result<DOM, Error> {
        parse_document(DocumentSink::default(), ParseOpts::default()).one(html)
    }

    /// Parse a byte stream to completion.
    ///
    /// Chunks may split UTF-8 sequences; decoding happens after reassembly.
    ///
    /// # Errors
    ///
    /// Returns the first stream error, or an error if the worker panicked.
    pub async fn process<S>(mut byte_stream: S) -> Result<DOM, Error>
    where
        S: Stream<Item = Result<Bytes, Error>> + Send + Unpin + 'static,
    {
        let (tx, mut rx) = mpsc::channel::<Bytes>(64);
        let worker = task::spawn_blocking(move || {
            let mut parser =
                parse_document(DocumentSink::default(), ParseOpts::default()).from_utf8();
            while let Some(chunk) = rx.blocking_recv() {
                parser.process(ByteTendril::from_slice(&chunk));
            }
            parser.finish()
        });

        // Forward incoming async chunks to the worker task
        while let Some(chunk) = byte_stream.next().await {
            let chunk = chunk?;
            if tx.send(chunk).await.is_err() {
                break;
            }
        }
        drop(tx);
        worker
            .await
            .map_err(|_| anyhow!("HTML parser worker panicked"))?
    }

    /// True once the spawned parse has ended, successfully or not.
    pub fn is_finished(&self) -> bool {
        self.process_handle.is_finished()
    }

    /// Wait for the parse started by [`HTMLParser::parse`] and return the document.
    ///
    /// # Errors
    ///
    /// Returns the parse error, or an error if the task was cancelled or panicked.
    pub async fn finish(self) -> Result<DOM, Error> {
        self.process_handle.await?
    }
}

impl DOM {
    /// Parse `html` and append the resulting nodes to `parent`.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or insertion fails.
    pub fn append_html(&mut self, parent: NodeId, html: &str) -> Result<(), Error> {
        let fragment = HTMLParser::parse_str(html)?;
        let containers = [fragment.head(), fragment.body()];
        for container in containers.into_iter().flatten() {
            for child in fragment.children(container) {
                let imported = self.import_subtree(&fragment, child)?;
                self.append_child(parent, imported)?;
            }
        }
        Ok(())
    }

    /// `element.innerHTML = html`.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing or insertion fails.
    pub fn set_inner_html(&mut self, id: NodeId, html: &str) -> Result<(), Error> {
        self.clear_children(id);
        self.append_html(id, html)
    }
}
