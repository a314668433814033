use std::net::SocketAddr;

use thiserror::Error;

/// Everything that can go wrong while decoding a NetFlow v9 packet.
///
/// Only `MalformedHeader` and `MalformedFlowset` abort a packet; the other
/// variants are recoverable at flowset granularity and never escape `parse`.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
    #[error("malformed packet header: {0}")]
    MalformedHeader(String),

    #[error("malformed flowset at offset {offset}: {reason}")]
    MalformedFlowset { offset: usize, reason: String },

    #[error("invalid template {template_id}: {reason}")]
    InvalidTemplate {
        template_id: u16,
        reason: &'static str,
    },

    #[error("no template {template_id} cached for exporter {exporter} source id {source_id}")]
    MissingTemplate {
        exporter: SocketAddr,
        source_id: u32,
        template_id: u16,
    },

    #[error("data flowset {flowset_id} holds {payload} bytes, not a multiple of the {stride} byte record stride")]
    FieldMismatch {
        flowset_id: u16,
        payload: usize,
        stride: usize,
    },
}
