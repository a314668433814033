use std::net::SocketAddr;

use log::{debug, info, warn};

use crate::netflow::error::Error;
use crate::netflow::result::{FieldValue, FlowRecord, FlowSet, FlowSetKind, ParseResult};
use crate::netflow::template::{Template, TemplateKey};
use crate::netflow::v9::{
    self, FlowSetHeader, Header, OptionTemplateRecordHeader, TemplateFieldSpec,
    TemplateRecordHeader,
};
use crate::netflow::ParserState;

/// Walk one export packet. The header `count` is advisory and never trusted:
/// the flowset walk terminates on buffer exhaustion, and any flowset whose
/// declared length cannot be honored aborts the packet (a bogus length gives
/// no safe resynchronization point).
pub(crate) fn parse_packet(
    buf: &[u8],
    exporter: SocketAddr,
    state: &mut ParserState,
) -> Result<ParseResult, Error> {
    let header = Header::read(buf).map_err(|e| {
        state.stats.inc_malformed_packets();
        e
    })?;

    let mut flowsets = vec![];
    let mut offset = Header::SIZE;

    while offset + FlowSetHeader::SIZE <= buf.len() {
        let set = FlowSetHeader::read(&buf[offset..], offset).map_err(|e| {
            state.stats.inc_malformed_packets();
            e
        })?;

        let length = set.length as usize;
        if length < FlowSetHeader::SIZE {
            state.stats.inc_malformed_packets();
            return Err(Error::MalformedFlowset {
                offset,
                reason: format!(
                    "declared length {} is below the {} byte flowset header",
                    length,
                    FlowSetHeader::SIZE
                ),
            });
        }
        if length > buf.len() - offset {
            state.stats.inc_malformed_packets();
            return Err(Error::MalformedFlowset {
                offset,
                reason: format!(
                    "declared length {} exceeds the {} remaining bytes",
                    length,
                    buf.len() - offset
                ),
            });
        }

        let body = &buf[offset + FlowSetHeader::SIZE..offset + length];

        match set.flowset_id {
            v9::TEMPLATE_FLOWSET_ID => {
                flowsets.push(parse_template_flowset(body, exporter, header.source_id, state));
            }
            v9::OPTION_TEMPLATE_FLOWSET_ID => {
                flowsets.push(parse_option_template_flowset(
                    body,
                    exporter,
                    header.source_id,
                    state,
                ));
            }
            id if id >= v9::DATA_FLOWSET_ID_MIN => {
                flowsets.push(parse_data_flowset(body, id, exporter, header.source_id, state));
            }
            id => debug!("skipping reserved flowset id {} from {}", id, exporter),
        }

        offset += length;
    }

    Ok(ParseResult {
        exporter,
        seq_number: header.seq_number,
        source_id: header.source_id,
        flowsets,
    })
}

/// Template records are packed back-to-back; fewer than 4 trailing bytes are
/// padding. An invalid template is rejected without being cached, but its
/// record boundary is still known, so the remaining records are parsed.
fn parse_template_flowset(
    body: &[u8],
    exporter: SocketAddr,
    source_id: u32,
    state: &mut ParserState,
) -> FlowSet {
    let flowset = FlowSet::new(FlowSetKind::Templates, v9::TEMPLATE_FLOWSET_ID);
    let mut cursor = body;

    while let Some(header) = TemplateRecordHeader::read(cursor) {
        let record_len =
            TemplateRecordHeader::SIZE + header.field_count as usize * TemplateFieldSpec::SIZE;
        if record_len > cursor.len() {
            warn!(
                "template {} from {} is truncated by the flowset boundary, dropping the rest of the flowset",
                header.template_id, exporter
            );
            break;
        }

        let fields = read_specs(&cursor[TemplateRecordHeader::SIZE..record_len]);

        match Template::new(header.template_id, fields) {
            Ok(template) => {
                info!(
                    "learned template {} from {} ({} fields, {} byte records)",
                    header.template_id,
                    exporter,
                    header.field_count,
                    template.stride()
                );
                state.templates.insert_or_replace(
                    TemplateKey {
                        exporter,
                        source_id,
                        template_id: header.template_id,
                    },
                    template,
                );
                state.stats.inc_templates();
            }
            Err(e) => warn!("rejected template from {}: {}", exporter, e),
        }

        cursor = &cursor[record_len..];
    }

    flowset
}

/// Option template records carry their scope and option spec list lengths in
/// bytes. A length that is not a multiple of the 4 byte spec size leaves no
/// reliable boundary for the next record, so parsing of the flowset stops.
fn parse_option_template_flowset(
    body: &[u8],
    exporter: SocketAddr,
    source_id: u32,
    state: &mut ParserState,
) -> FlowSet {
    let flowset = FlowSet::new(FlowSetKind::OptionTemplates, v9::OPTION_TEMPLATE_FLOWSET_ID);
    let mut cursor = body;

    while let Some(header) = OptionTemplateRecordHeader::read(cursor) {
        let scope_len = header.scope_length as usize;
        let option_len = header.option_length as usize;

        if scope_len % TemplateFieldSpec::SIZE != 0 || option_len % TemplateFieldSpec::SIZE != 0 {
            warn!(
                "option template {} from {} declares spec lists of {} and {} bytes, dropping the rest of the flowset",
                header.template_id, exporter, scope_len, option_len
            );
            break;
        }

        let record_len = OptionTemplateRecordHeader::SIZE + scope_len + option_len;
        if record_len > cursor.len() {
            warn!(
                "option template {} from {} is truncated by the flowset boundary, dropping the rest of the flowset",
                header.template_id, exporter
            );
            break;
        }

        let scopes = read_specs(&cursor[OptionTemplateRecordHeader::SIZE..][..scope_len]);
        let options = read_specs(&cursor[OptionTemplateRecordHeader::SIZE + scope_len..record_len]);

        match Template::with_scopes(header.template_id, scopes, options) {
            Ok(template) => {
                info!(
                    "learned option template {} from {} ({} byte records)",
                    header.template_id,
                    exporter,
                    template.stride()
                );
                state.templates.insert_or_replace(
                    TemplateKey {
                        exporter,
                        source_id,
                        template_id: header.template_id,
                    },
                    template,
                );
                state.stats.inc_option_templates();
            }
            Err(e) => warn!("rejected option template from {}: {}", exporter, e),
        }

        cursor = &cursor[record_len..];
    }

    flowset
}

fn parse_data_flowset(
    body: &[u8],
    flowset_id: u16,
    exporter: SocketAddr,
    source_id: u32,
    state: &ParserState,
) -> FlowSet {
    let mut flowset = FlowSet::new(FlowSetKind::Data, flowset_id);
    let key = TemplateKey {
        exporter,
        source_id,
        template_id: flowset_id,
    };

    let template = match state.templates.lookup(&key) {
        Some(template) => template,
        None => {
            state.stats.inc_missing_templates();
            debug!(
                "{}",
                Error::MissingTemplate {
                    exporter,
                    source_id,
                    template_id: flowset_id
                }
            );
            return flowset;
        }
    };

    let stride = template.stride();
    if body.len() % stride != 0 {
        warn!(
            "{}",
            Error::FieldMismatch {
                flowset_id,
                payload: body.len(),
                stride
            }
        );
        return flowset;
    }

    for record_buf in body.chunks_exact(stride) {
        flowset.records.push(decode_record(record_buf, template));
    }
    state.stats.add_records(flowset.records.len() as u64);

    flowset
}

/// Carve one record according to the template's field order. The caller
/// guarantees `buf.len() == template.stride()`, so every slice is in bounds.
fn decode_record(buf: &[u8], template: &Template) -> FlowRecord {
    let mut record = FlowRecord::default();
    let mut offset = 0;

    for spec in template.scope_fields() {
        let length = spec.field_length as usize;
        record
            .scopes
            .push((spec.field_type, FieldValue::read(&buf[offset..offset + length])));
        offset += length;
    }

    for spec in template.fields() {
        let length = spec.field_length as usize;
        record
            .fields
            .push((spec.field_type, FieldValue::read(&buf[offset..offset + length])));
        offset += length;
    }

    record
}

fn read_specs(buf: &[u8]) -> Vec<TemplateFieldSpec> {
    let mut specs = Vec::with_capacity(buf.len() / TemplateFieldSpec::SIZE);
    let mut cursor = buf;

    while let Some(spec) = TemplateFieldSpec::read(cursor) {
        specs.push(spec);
        cursor = &cursor[TemplateFieldSpec::SIZE..];
    }

    specs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netflow::fields::FieldType;
    use crate::netflow::parse;
    use pretty_assertions::assert_eq;

    fn exporter() -> SocketAddr {
        "172.17.0.5:2055".parse().unwrap()
    }

    fn packet(source_id: u32, flowsets: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(&v9::VERSION.to_be_bytes());
        buf.extend_from_slice(&(flowsets.len() as u16).to_be_bytes());
        buf.extend_from_slice(&1024u32.to_be_bytes()); // sys_uptime
        buf.extend_from_slice(&1610612736u32.to_be_bytes()); // unix_secs
        buf.extend_from_slice(&7u32.to_be_bytes()); // seq_number
        buf.extend_from_slice(&source_id.to_be_bytes());
        for flowset in flowsets {
            buf.extend_from_slice(flowset);
        }
        buf
    }

    fn flowset(id: u16, body: &[u8]) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(&id.to_be_bytes());
        buf.extend_from_slice(&((body.len() + v9::FlowSetHeader::SIZE) as u16).to_be_bytes());
        buf.extend_from_slice(body);
        buf
    }

    fn template_record(template_id: u16, fields: &[(u16, u16)]) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(&template_id.to_be_bytes());
        buf.extend_from_slice(&(fields.len() as u16).to_be_bytes());
        for (ftype, flen) in fields {
            buf.extend_from_slice(&ftype.to_be_bytes());
            buf.extend_from_slice(&flen.to_be_bytes());
        }
        buf
    }

    fn option_template_record(
        template_id: u16,
        scopes: &[(u16, u16)],
        options: &[(u16, u16)],
    ) -> Vec<u8> {
        let mut buf = vec![];
        buf.extend_from_slice(&template_id.to_be_bytes());
        buf.extend_from_slice(&((scopes.len() * 4) as u16).to_be_bytes());
        buf.extend_from_slice(&((options.len() * 4) as u16).to_be_bytes());
        for (stype, slen) in scopes.iter().chain(options.iter()) {
            buf.extend_from_slice(&stype.to_be_bytes());
            buf.extend_from_slice(&slen.to_be_bytes());
        }
        buf
    }

    const SRC: u16 = FieldType::Ipv4SrcAddr as u16;
    const DST: u16 = FieldType::Ipv4DstAddr as u16;
    const BYTES: u16 = FieldType::InBytes as u16;

    #[test]
    fn learn_then_decode_across_packets() {
        let mut state = ParserState::new();

        let templates = packet(
            104,
            &[flowset(0, &template_record(256, &[(SRC, 4), (DST, 4), (BYTES, 4)]))],
        );
        parse(&templates, exporter(), &mut state).unwrap();

        #[rustfmt::skip]
        let data = packet(104, &[flowset(256, &[
            10, 0, 0, 1,    10, 0, 0, 2,    0, 0, 5, 220,
            10, 0, 0, 3,    10, 0, 0, 4,    0, 0, 11, 184,
        ])]);
        let result = parse(&data, exporter(), &mut state).unwrap();

        assert_eq!(result.exporter(), exporter());
        assert_eq!(result.source_id(), 104);
        assert_eq!(result.num_flowsets(), 1);
        assert_eq!(result.flowset(0).unwrap().num_records(), 2);
        assert_eq!(
            result.field(0, 0, SRC),
            Some(&FieldValue::U32(0x0a000001))
        );
        assert_eq!(result.field(0, 0, BYTES), Some(&FieldValue::U32(1500)));
        assert_eq!(
            result.field(0, 1, DST),
            Some(&FieldValue::U32(0x0a000004))
        );
        assert_eq!(result.field(0, 1, BYTES), Some(&FieldValue::U32(3000)));
        // absent field type
        assert_eq!(result.field(0, 0, 999), None);

        let stats = state.stats();
        assert_eq!(stats.templates, 1);
        assert_eq!(stats.records, 2);
        assert_eq!(stats.missing_templates, 0);
        assert_eq!(stats.malformed_packets, 0);
    }

    #[test]
    fn template_and_data_in_one_packet() {
        let mut state = ParserState::new();

        let buf = packet(
            104,
            &[
                flowset(0, &template_record(300, &[(BYTES, 8)])),
                flowset(300, &[0, 0, 0, 0, 0, 0, 0x12, 0x6a]),
            ],
        );
        let result = parse(&buf, exporter(), &mut state).unwrap();

        assert_eq!(result.num_flowsets(), 2);
        assert_eq!(result.flowset(0).unwrap().kind(), FlowSetKind::Templates);
        assert_eq!(result.flowset(1).unwrap().num_records(), 1);
        assert_eq!(result.field(1, 0, BYTES), Some(&FieldValue::U64(4714)));
    }

    #[test]
    fn redefinition_decodes_with_the_new_layout() {
        let mut state = ParserState::new();

        let first = packet(104, &[flowset(0, &template_record(256, &[(SRC, 4)]))]);
        parse(&first, exporter(), &mut state).unwrap();

        let second = packet(104, &[flowset(0, &template_record(256, &[(BYTES, 8)]))]);
        parse(&second, exporter(), &mut state).unwrap();

        let data = packet(104, &[flowset(256, &[0, 0, 0, 0, 0, 0, 0, 42])]);
        let result = parse(&data, exporter(), &mut state).unwrap();

        assert_eq!(result.flowset(0).unwrap().num_records(), 1);
        assert_eq!(result.field(0, 0, BYTES), Some(&FieldValue::U64(42)));
        assert_eq!(result.field(0, 0, SRC), None);
        assert_eq!(state.stats().templates, 2);
    }

    #[test]
    fn templates_are_scoped_by_source_id() {
        let mut state = ParserState::new();

        let templates = packet(104, &[flowset(0, &template_record(256, &[(SRC, 4)]))]);
        parse(&templates, exporter(), &mut state).unwrap();

        // same exporter, different source id: the template does not apply
        let data = packet(105, &[flowset(256, &[10, 0, 0, 1])]);
        let result = parse(&data, exporter(), &mut state).unwrap();

        assert_eq!(result.flowset(0).unwrap().num_records(), 0);
        assert_eq!(state.stats().missing_templates, 1);
    }

    #[test]
    fn missing_template_skips_the_flowset_only() {
        let mut state = ParserState::new();

        let buf = packet(
            104,
            &[
                flowset(999, &[1, 2, 3, 4]),
                flowset(0, &template_record(256, &[(SRC, 4)])),
                flowset(256, &[10, 0, 0, 1]),
            ],
        );
        let result = parse(&buf, exporter(), &mut state).unwrap();

        assert_eq!(result.num_flowsets(), 3);
        assert_eq!(result.flowset(0).unwrap().num_records(), 0);
        assert_eq!(result.flowset(2).unwrap().num_records(), 1);

        let stats = state.stats();
        assert_eq!(stats.missing_templates, 1);
        assert_eq!(stats.records, 1);
        assert_eq!(stats.malformed_packets, 0);
    }

    #[test]
    fn stride_mismatch_skips_the_flowset_only() {
        let mut state = ParserState::new();

        let templates = packet(
            104,
            &[flowset(0, &template_record(256, &[(SRC, 4), (DST, 4), (BYTES, 4)]))],
        );
        parse(&templates, exporter(), &mut state).unwrap();

        // 10 bytes is not a multiple of the 12 byte stride
        let buf = packet(
            104,
            &[
                flowset(256, &[0; 10]),
                flowset(256, &[0; 12]),
            ],
        );
        let result = parse(&buf, exporter(), &mut state).unwrap();

        assert_eq!(result.flowset(0).unwrap().num_records(), 0);
        assert_eq!(result.flowset(1).unwrap().num_records(), 1);

        let stats = state.stats();
        assert_eq!(stats.records, 1);
        assert_eq!(stats.malformed_packets, 0);
        assert_eq!(stats.missing_templates, 0);
    }

    #[test]
    fn flowset_length_overrun_aborts_but_keeps_learned_templates() {
        let mut state = ParserState::new();

        let mut buf = packet(104, &[flowset(0, &template_record(256, &[(SRC, 4)]))]);
        // flowset header claiming more bytes than remain in the packet
        buf.extend_from_slice(&256u16.to_be_bytes());
        buf.extend_from_slice(&64u16.to_be_bytes());
        buf.extend_from_slice(&[0; 8]);

        let err = parse(&buf, exporter(), &mut state).unwrap_err();
        assert!(matches!(err, Error::MalformedFlowset { .. }));

        let stats = state.stats();
        assert_eq!(stats.malformed_packets, 1);
        assert_eq!(stats.templates, 1);

        // the template learned before the bad flowset is still usable
        let data = packet(104, &[flowset(256, &[10, 0, 0, 1])]);
        let result = parse(&data, exporter(), &mut state).unwrap();
        assert_eq!(result.flowset(0).unwrap().num_records(), 1);
    }

    #[test]
    fn zero_length_flowset_is_malformed() {
        let mut state = ParserState::new();

        let mut buf = packet(104, &[]);
        buf.extend_from_slice(&256u16.to_be_bytes());
        buf.extend_from_slice(&0u16.to_be_bytes());
        buf.extend_from_slice(&[0; 4]);

        let err = parse(&buf, exporter(), &mut state).unwrap_err();
        assert!(matches!(err, Error::MalformedFlowset { .. }));
        assert_eq!(state.stats().malformed_packets, 1);
    }

    #[test]
    fn wrong_version_leaves_state_untouched() {
        let mut state = ParserState::new();

        let mut buf = packet(104, &[flowset(0, &template_record(256, &[(SRC, 4)]))]);
        buf[1] = 5;

        let err = parse(&buf, exporter(), &mut state).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
        assert_eq!(state.stats().malformed_packets, 1);
        assert!(state.templates().is_empty());
    }

    #[test]
    fn short_packet_is_malformed() {
        let mut state = ParserState::new();

        let err = parse(&[0x00, 0x09, 0x00], exporter(), &mut state).unwrap_err();
        assert!(matches!(err, Error::MalformedHeader(_)));
        assert_eq!(state.stats().malformed_packets, 1);
        assert!(state.templates().is_empty());
    }

    #[test]
    fn zero_field_template_is_rejected_but_later_records_parse() {
        let mut state = ParserState::new();

        let mut body = template_record(256, &[]);
        body.extend_from_slice(&template_record(257, &[(SRC, 4)]));
        let buf = packet(104, &[flowset(0, &body)]);
        parse(&buf, exporter(), &mut state).unwrap();

        let stats = state.stats();
        assert_eq!(stats.templates, 1);
        assert_eq!(state.templates().len(), 1);

        let data = packet(104, &[flowset(257, &[10, 0, 0, 1])]);
        let result = parse(&data, exporter(), &mut state).unwrap();
        assert_eq!(result.flowset(0).unwrap().num_records(), 1);
    }

    #[test]
    fn zero_stride_option_template_is_rejected() {
        let mut state = ParserState::new();

        // scope field with length zero and no option fields
        let buf = packet(
            104,
            &[flowset(1, &option_template_record(256, &[(1, 0)], &[]))],
        );
        parse(&buf, exporter(), &mut state).unwrap();

        let stats = state.stats();
        assert_eq!(stats.option_templates, 0);
        assert_eq!(stats.malformed_packets, 0);
        assert!(state.templates().is_empty());
    }

    #[test]
    fn option_template_scopes_decode_ahead_of_options() {
        let mut state = ParserState::new();

        let sampling = FieldType::SamplingInterval as u16;
        let buf = packet(
            104,
            &[
                flowset(1, &option_template_record(260, &[(1, 4)], &[(sampling, 4)])),
                flowset(260, &[0, 0, 0, 9, 0, 0, 3, 232]),
            ],
        );
        let result = parse(&buf, exporter(), &mut state).unwrap();

        let record = &result.flowset(1).unwrap().records()[0];
        assert_eq!(record.scope(1), Some(&FieldValue::U32(9)));
        assert_eq!(record.field(sampling), Some(&FieldValue::U32(1000)));
        // scope type 1 is not field type 1
        assert_eq!(record.field(1), None);

        let stats = state.stats();
        assert_eq!(stats.option_templates, 1);
        assert_eq!(stats.records, 1);
    }

    #[test]
    fn unusual_width_fields_decode_as_bytes() {
        let mut state = ParserState::new();

        let mac = FieldType::InSrcMac as u16;
        let buf = packet(
            104,
            &[
                flowset(0, &template_record(256, &[(mac, 6)])),
                flowset(256, &[0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]),
            ],
        );
        let result = parse(&buf, exporter(), &mut state).unwrap();

        assert_eq!(
            result.field(1, 0, mac),
            Some(&FieldValue::Bytes(vec![0xde, 0xad, 0xbe, 0xef, 0x00, 0x01]))
        );
    }

    #[test]
    fn reserved_flowset_ids_are_skipped() {
        let mut state = ParserState::new();

        let buf = packet(
            104,
            &[
                flowset(2, &[0; 8]),
                flowset(0, &template_record(256, &[(SRC, 4)])),
            ],
        );
        let result = parse(&buf, exporter(), &mut state).unwrap();

        // the reserved flowset is not part of the decoded result
        assert_eq!(result.num_flowsets(), 1);
        assert_eq!(state.stats().templates, 1);
    }

    fn capture() -> Vec<Vec<u8>> {
        let sampling = FieldType::SamplingInterval as u16;
        vec![
            packet(
                104,
                &[
                    flowset(
                        0,
                        &[
                            template_record(256, &[(SRC, 4), (DST, 4)]),
                            template_record(257, &[(BYTES, 4), (FieldType::InPkts as u16, 4)]),
                        ]
                        .concat(),
                    ),
                    flowset(
                        1,
                        &[
                            option_template_record(258, &[(1, 4)], &[(sampling, 4)]),
                            option_template_record(259, &[(2, 4)], &[(36, 2), (37, 2)]),
                        ]
                        .concat(),
                    ),
                ],
            ),
            packet(
                104,
                &[flowset(256, &[10, 0, 0, 1, 10, 0, 0, 2, 10, 0, 0, 3, 10, 0, 0, 4])],
            ),
            packet(
                104,
                &[flowset(258, &[0, 0, 0, 1, 0, 0, 0, 100, 0, 0, 0, 2, 0, 0, 1, 44])],
            ),
        ]
    }

    #[test]
    fn capture_end_to_end_stats() {
        let mut state = ParserState::new();

        for buf in capture() {
            parse(&buf, exporter(), &mut state).unwrap();
        }

        let stats = state.stats();
        assert_eq!(stats.templates, 2);
        assert_eq!(stats.option_templates, 2);
        assert_eq!(stats.records, 4);
        assert_eq!(stats.missing_templates, 0);
        assert_eq!(stats.malformed_packets, 0);
    }

    #[test]
    fn replaying_a_stream_reproduces_identical_output() {
        let run = || {
            let mut state = ParserState::new();
            let mut results = vec![];
            for buf in capture() {
                results.push(parse(&buf, exporter(), &mut state));
            }
            (results, state.stats())
        };

        let (first_results, first_stats) = run();
        let (second_results, second_stats) = run();

        assert_eq!(first_results, second_results);
        assert_eq!(first_stats, second_stats);
    }
}
