use std::net::SocketAddr;
use std::sync::Arc;

pub mod error;
pub mod fields;
mod parser;
pub mod result;
pub mod stats;
pub mod template;
pub mod v9;

pub use error::Error;
pub use result::{FieldValue, FlowRecord, FlowSet, FlowSetKind, ParseResult};
pub use stats::{Counters, Stats};
pub use template::{Template, TemplateCache, TemplateKey};

/// Session-scoped decoding state: the template cache and the statistics
/// counters. One instance per capture session, owned by a single worker;
/// parallel workers each hold their own (templates are scoped per exporter,
/// so nothing needs to be shared between them).
pub struct ParserState {
    pub(crate) templates: TemplateCache,
    pub(crate) stats: Arc<Counters>,
}

impl ParserState {
    pub fn new() -> Self {
        ParserState {
            templates: TemplateCache::new(),
            stats: Arc::new(Counters::new()),
        }
    }

    /// Point-in-time snapshot of the counters.
    pub fn stats(&self) -> Stats {
        self.stats.snapshot()
    }

    /// Shared handle to the counters, safe to read from other threads while
    /// this state keeps parsing.
    pub fn counters(&self) -> Arc<Counters> {
        Arc::clone(&self.stats)
    }

    pub fn templates(&self) -> &TemplateCache {
        &self.templates
    }
}

impl Default for ParserState {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one export packet against the session state.
///
/// Returns `Err` only when nothing is decodable: a bad packet header, or a
/// flowset whose framing leaves no safe way to continue. Recoverable
/// conditions (unknown template, record stride mismatch) yield an `Ok`
/// result holding whatever did decode, with the statistics counters
/// reflecting what happened. The buffer is never retained past the call.
pub fn parse(
    buf: &[u8],
    exporter: SocketAddr,
    state: &mut ParserState,
) -> Result<ParseResult, Error> {
    parser::parse_packet(buf, exporter, state)
}
