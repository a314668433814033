use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr};

use byteorder::{BigEndian, ByteOrder};

use crate::netflow::fields::{FieldKind, FieldType, ScopeType};

/// A decoded field value, tagged by the width the template declared.
/// 1/2/4/8 byte fields decode as unsigned big-endian integers, 16 byte
/// fields as `U128` (IPv6 addresses fit losslessly), anything else is kept
/// as raw bytes.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum FieldValue {
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    Bytes(Vec<u8>),
}

impl FieldValue {
    pub fn read(buf: &[u8]) -> Self {
        match buf.len() {
            1 => FieldValue::U8(buf[0]),
            2 => FieldValue::U16(BigEndian::read_u16(buf)),
            4 => FieldValue::U32(BigEndian::read_u32(buf)),
            8 => FieldValue::U64(BigEndian::read_u64(buf)),
            16 => FieldValue::U128(BigEndian::read_u128(buf)),
            _ => FieldValue::Bytes(buf.to_vec()),
        }
    }

    /// Widen any of the integer variants to u64; `None` for `U128`/`Bytes`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::U8(v) => Some(u64::from(*v)),
            FieldValue::U16(v) => Some(u64::from(*v)),
            FieldValue::U32(v) => Some(u64::from(*v)),
            FieldValue::U64(v) => Some(*v),
            FieldValue::U128(_) | FieldValue::Bytes(_) => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FieldValue::U8(v) => v.fmt(f),
            FieldValue::U16(v) => v.fmt(f),
            FieldValue::U32(v) => v.fmt(f),
            FieldValue::U64(v) => v.fmt(f),
            FieldValue::U128(v) => v.fmt(f),
            FieldValue::Bytes(v) => write!(f, "{:02X?}", v),
        }
    }
}

/// One decoded record: field values in template order, and for option data
/// records the decoded scope values ahead of them. Scope types and field
/// types are distinct namespaces, so the two lists are kept separate.
#[derive(Debug, PartialEq, Eq, Clone, Default)]
pub struct FlowRecord {
    pub(crate) scopes: Vec<(u16, FieldValue)>,
    pub(crate) fields: Vec<(u16, FieldValue)>,
}

impl FlowRecord {
    pub fn field(&self, field_type: u16) -> Option<&FieldValue> {
        self.fields
            .iter()
            .find(|(ftype, _)| *ftype == field_type)
            .map(|(_, value)| value)
    }

    pub fn scope(&self, scope_type: u16) -> Option<&FieldValue> {
        self.scopes
            .iter()
            .find(|(stype, _)| *stype == scope_type)
            .map(|(_, value)| value)
    }

    pub fn fields(&self) -> &[(u16, FieldValue)] {
        &self.fields
    }

    pub fn scopes(&self) -> &[(u16, FieldValue)] {
        &self.scopes
    }
}

fn write_field(f: &mut fmt::Formatter, ftype: u16, value: &FieldValue) -> fmt::Result {
    let known = match FieldType::from_number(ftype) {
        Some(known) => known,
        None => return write!(f, "field({}): {}, ", ftype, value),
    };

    match (known.kind(), value) {
        (FieldKind::Ipv4Addr, FieldValue::U32(v)) => {
            write!(f, "{:?}: {}, ", known, Ipv4Addr::from(*v))
        }
        (FieldKind::Ipv6Addr, FieldValue::U128(v)) => {
            write!(f, "{:?}: {}, ", known, Ipv6Addr::from(*v))
        }
        (FieldKind::MacAddr, FieldValue::Bytes(v)) if v.len() == 6 => {
            write!(
                f,
                "{:?}: {:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}, ",
                known, v[0], v[1], v[2], v[3], v[4], v[5]
            )
        }
        (FieldKind::Text, FieldValue::Bytes(v)) => {
            write!(f, "{:?}: {}, ", known, String::from_utf8_lossy(v))
        }
        _ => write!(f, "{:?}: {}, ", known, value),
    }
}

impl fmt::Display for FlowRecord {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (stype, value) in &self.scopes {
            match ScopeType::from_number(*stype) {
                Some(known) => write!(f, "scope {:?}: {}, ", known, value)?,
                None => write!(f, "scope({}): {}, ", stype, value)?,
            }
        }

        for (ftype, value) in &self.fields {
            write_field(f, *ftype, value)?;
        }

        Ok(())
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FlowSetKind {
    Templates,
    OptionTemplates,
    Data,
}

/// One flowset of the packet, in on-wire order. Template flowsets carry no
/// records; data flowsets skipped over a missing template or a stride
/// mismatch stay in the result with an empty record list so flowset indices
/// keep matching the wire.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct FlowSet {
    kind: FlowSetKind,
    id: u16,
    pub(crate) records: Vec<FlowRecord>,
}

impl FlowSet {
    pub(crate) fn new(kind: FlowSetKind, id: u16) -> Self {
        FlowSet {
            kind,
            id,
            records: vec![],
        }
    }

    pub fn kind(&self) -> FlowSetKind {
        self.kind
    }

    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn num_records(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[FlowRecord] {
        &self.records
    }
}

/// Output of one successful packet decode. Owns all its data; nothing is
/// borrowed from the input buffer.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct ParseResult {
    pub(crate) exporter: SocketAddr,
    pub(crate) seq_number: u32,
    pub(crate) source_id: u32,
    pub(crate) flowsets: Vec<FlowSet>,
}

impl ParseResult {
    pub fn exporter(&self) -> SocketAddr {
        self.exporter
    }

    pub fn seq_number(&self) -> u32 {
        self.seq_number
    }

    pub fn source_id(&self) -> u32 {
        self.source_id
    }

    pub fn num_flowsets(&self) -> usize {
        self.flowsets.len()
    }

    pub fn flowsets(&self) -> &[FlowSet] {
        &self.flowsets
    }

    pub fn flowset(&self, index: usize) -> Option<&FlowSet> {
        self.flowsets.get(index)
    }

    /// Lookup a field by position and type; `None` when the indexes are out
    /// of range or the matching template did not carry that field.
    pub fn field(
        &self,
        flowset_index: usize,
        record_index: usize,
        field_type: u16,
    ) -> Option<&FieldValue> {
        self.flowsets
            .get(flowset_index)?
            .records
            .get(record_index)?
            .field(field_type)
    }
}
