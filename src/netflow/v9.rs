use bincode::Options;
use serde_derive::Deserialize;

use crate::netflow::error::Error;

pub const VERSION: u16 = 9;

pub const TEMPLATE_FLOWSET_ID: u16 = 0;
pub const OPTION_TEMPLATE_FLOWSET_ID: u16 = 1;
pub const DATA_FLOWSET_ID_MIN: u16 = 256;

fn wire() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_big_endian()
}

/// PACKET HEADER ///

/*
from https://tools.ietf.org/html/rfc3954

 0                   1                   2                   3
 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|       Version Number          |            Count              |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|                           sysUpTime                           |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|                           UNIX Secs                           |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|                        Sequence Number                        |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|                           Source ID                           |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
*/

#[derive(Deserialize, Debug)]
pub struct Header {
    pub version: u16,    // Export format version, always 9
    pub count: u16,      // Total number of records in this packet, advisory only
    pub sys_uptime: u32, // Milliseconds since the export device booted
    pub unix_secs: u32,  // Seconds since 0000 UTC 1970 at the export device
    pub seq_number: u32, // Incremental counter of all export packets from this device
    pub source_id: u32,  // Exporter-assigned id of the exporting observation domain
}

impl Header {
    pub const SIZE: usize = 20;

    pub fn read(buf: &[u8]) -> Result<Self, Error> {
        if buf.len() < Self::SIZE {
            return Err(Error::MalformedHeader(format!(
                "expected at least {} bytes but received {}",
                Self::SIZE,
                buf.len()
            )));
        }

        let header: Header = wire()
            .deserialize(&buf[..Self::SIZE])
            .map_err(|e| Error::MalformedHeader(e.to_string()))?;

        if header.version != VERSION {
            return Err(Error::MalformedHeader(format!(
                "expected version {}, read {}",
                VERSION,
                header.version
            )));
        }

        Ok(header)
    }
}

/// FLOWSET HEADER ///

/*
 0                   1                   2                   3
 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|         FlowSet ID            |            Length             |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
*/

#[derive(Deserialize, Debug)]
pub struct FlowSetHeader {
    pub flowset_id: u16, // 0 = templates, 1 = option templates, >= 256 = data
    pub length: u16,     // Total flowset length in octets, header included
}

impl FlowSetHeader {
    pub const SIZE: usize = 4;

    pub fn read(buf: &[u8], offset: usize) -> Result<Self, Error> {
        if buf.len() < Self::SIZE {
            return Err(Error::MalformedFlowset {
                offset,
                reason: format!(
                    "expected {} bytes for the flowset header but received {}",
                    Self::SIZE,
                    buf.len()
                ),
            });
        }

        wire()
            .deserialize(&buf[..Self::SIZE])
            .map_err(|e| Error::MalformedFlowset {
                offset,
                reason: e.to_string(),
            })
    }
}

/// TEMPLATE RECORD HEADER ///

/*
 0                   1                   2                   3
 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|      Template ID (> 255)      |         Field Count           |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
*/

#[derive(Deserialize, Debug)]
pub struct TemplateRecordHeader {
    pub template_id: u16,
    pub field_count: u16,
}

impl TemplateRecordHeader {
    pub const SIZE: usize = 4;

    pub fn read(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }

        wire().deserialize(&buf[..Self::SIZE]).ok()
    }
}

/// OPTION TEMPLATE RECORD HEADER ///

/*
 0                   1                   2                   3
 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|      Template ID (> 255)      |      Option Scope Length      |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|        Option Length          |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
*/

#[derive(Deserialize, Debug)]
pub struct OptionTemplateRecordHeader {
    pub template_id: u16,
    pub scope_length: u16,  // Length in bytes of the scope field specs
    pub option_length: u16, // Length in bytes of the option field specs
}

impl OptionTemplateRecordHeader {
    pub const SIZE: usize = 6;

    pub fn read(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }

        wire().deserialize(&buf[..Self::SIZE]).ok()
    }
}

/// TEMPLATE FIELD SPEC ///

/*
 0                   1                   2                   3
 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
|         Field Type            |         Field Length          |
+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
*/

#[derive(Deserialize, Debug, PartialEq, Eq, Clone, Copy)]
pub struct TemplateFieldSpec {
    pub field_type: u16, // Kept numeric: unknown types still decode by width
    pub field_length: u16,
}

impl TemplateFieldSpec {
    pub const SIZE: usize = 4;

    pub fn read(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }

        wire().deserialize(&buf[..Self::SIZE]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hex_literal::hex;

    const HEADER_PAYLOAD: [u8; Header::SIZE] =
        hex!("00 09 00 02 00 00 04 00 60 00 00 00 00 00 00 07 00 00 00 63");

    #[test]
    fn read_packet_header() {
        let header = Header::read(&HEADER_PAYLOAD).unwrap();

        assert_eq!(header.version, VERSION);
        assert_eq!(header.count, 2);
        assert_eq!(header.sys_uptime, 1024);
        assert_eq!(header.unix_secs, 1610612736);
        assert_eq!(header.seq_number, 7);
        assert_eq!(header.source_id, 99);
    }

    #[test]
    fn read_short_packet_header() {
        let err = Header::read(&HEADER_PAYLOAD[..Header::SIZE - 1]).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
    }

    #[test]
    fn read_wrong_version_header() {
        let mut payload = HEADER_PAYLOAD;
        payload[1] = 5;

        let err = Header::read(&payload).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
    }

    #[test]
    fn read_flowset_header() {
        let set = FlowSetHeader::read(&hex!("01 00 00 1c"), 0).unwrap();

        assert_eq!(set.flowset_id, 256);
        assert_eq!(set.length, 28);
    }

    #[test]
    fn read_template_record_header() {
        let header = TemplateRecordHeader::read(&hex!("01 00 00 1b")).unwrap();

        assert_eq!(header.template_id, 256);
        assert_eq!(header.field_count, 27);
    }

    #[test]
    fn read_option_template_record_header() {
        let header = OptionTemplateRecordHeader::read(&hex!("01 01 00 04 00 08")).unwrap();

        assert_eq!(header.template_id, 257);
        assert_eq!(header.scope_length, 4);
        assert_eq!(header.option_length, 8);
    }

    #[test]
    fn read_template_field_spec() {
        let spec = TemplateFieldSpec::read(&hex!("00 08 00 04")).unwrap();

        assert_eq!(spec.field_type, 8);
        assert_eq!(spec.field_length, 4);
    }

    #[test]
    fn short_reads_return_none() {
        assert!(TemplateRecordHeader::read(&hex!("01 00")).is_none());
        assert!(OptionTemplateRecordHeader::read(&hex!("01 01 00 04")).is_none());
        assert!(TemplateFieldSpec::read(&hex!("00 08")).is_none());
    }
}
