/*!
Encode path: serializing SAV records into IPFIX messages.
*/
use crate::error::ParserError;
use crate::models::*;
use crate::parser::{encode_ipfix_message, TEMPLATE_SET_ID};
use bytes::{BufMut, BytesMut};
use chrono::{DateTime, Utc};
use std::io::Write;
use std::net::IpAddr;

/// Whether this encoder instance has written its template set yet.
///
/// Per-instance state, transitioned exactly once: the template set goes out
/// lazily before the first data record of each output stream.
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
enum TemplateState {
    Pending,
    Sent,
}

/// Streaming encoder for SAV IPFIX records.
///
/// Owns exclusive access to one byte sink. Every record is written as one
/// complete message; the fixed template set is emitted once, before the
/// first data message.
///
/// ```
/// use sav_ipfix::{PolicyAction, RuleType, SavEncoder, SavParser, TargetType};
/// use chrono::Utc;
/// use std::io::Cursor;
///
/// let mut encoder = SavEncoder::new(Vec::new());
/// encoder
///     .write_mapping(
///         Utc::now(),
///         RuleType::Allowlist,
///         TargetType::InterfaceBased,
///         PolicyAction::Discard,
///         1000,
///         "203.0.113.0".parse().unwrap(),
///         24,
///     )
///     .unwrap();
///
/// let bytes = encoder.into_inner();
/// let records: Vec<_> = SavParser::new(Cursor::new(bytes)).into_iter().collect();
/// assert_eq!(records.len(), 1);
/// ```
pub struct SavEncoder<W> {
    writer: W,
    sequence_number: u32,
    exported: u64,
    template_state: TemplateState,
}

impl<W: Write> SavEncoder<W> {
    pub fn new(writer: W) -> Self {
        SavEncoder {
            writer,
            sequence_number: 0,
            exported: 0,
            template_state: TemplateState::Pending,
        }
    }

    /// Write the fixed template set: templates 901, 902 and 400 in one
    /// template set, zero-padded to a 4-byte boundary.
    ///
    /// Called automatically before the first data record; calling it again
    /// re-announces the templates, which RFC 7011 permits.
    pub fn export_templates(&mut self) -> Result<(), ParserError> {
        let mut set = BytesMut::with_capacity(128);
        for (template_id, fields) in EXPORTED_TEMPLATES {
            set.put_u16(template_id.into());
            set.put_u16(fields.len() as u16);
            for field in fields {
                field.encode(&mut set);
            }
        }
        while set.len() % 4 != 0 {
            set.put_u8(0);
        }

        self.write_message(TEMPLATE_SET_ID, &set)?;
        self.template_state = TemplateState::Sent;
        Ok(())
    }

    /// Encode one record with a single interface-prefix mapping.
    ///
    /// An `IpAddr::V4` or an IPv4-mapped `IpAddr::V6` prefix takes the IPv4
    /// sub-template; everything else takes the IPv6 one.
    #[allow(clippy::too_many_arguments)]
    pub fn write_mapping(
        &mut self,
        timestamp: DateTime<Utc>,
        rule_type: RuleType,
        target_type: TargetType,
        policy_action: PolicyAction,
        interface_id: u32,
        prefix: IpAddr,
        prefix_len: u8,
    ) -> Result<(), ParserError> {
        self.write_record(&SavRecord {
            timestamp,
            rule_type,
            target_type,
            policy_action,
            mappings: vec![SavMapping::new(interface_id, prefix, prefix_len)],
        })
    }

    /// Encode one record with all of its mappings in a single sub-template
    /// list.
    ///
    /// The mappings must share one address family; a record with no mappings
    /// encodes an empty IPv4 sub-template list. The list body must fit the
    /// record's single-byte length prefix, capping it at 255 bytes (27 IPv4
    /// or 11 IPv6 mappings); anything larger fails with
    /// [ParserError::OversizedSubTemplateList].
    pub fn write_record(&mut self, record: &SavRecord) -> Result<(), ParserError> {
        if self.template_state == TemplateState::Pending {
            self.export_templates()?;
        }

        let afi = record
            .mappings
            .first()
            .map(|mapping| Afi::from(normalize_prefix(mapping.prefix)))
            .unwrap_or(Afi::Ipv4);
        let template_id = TemplateId::for_afi(afi);

        let mut sub = BytesMut::new();
        for mapping in &record.mappings {
            sub.put_u32(mapping.interface_id);
            match normalize_prefix(mapping.prefix) {
                IpAddr::V4(addr) if afi == Afi::Ipv4 => sub.put_slice(&addr.octets()),
                IpAddr::V6(addr) if afi == Afi::Ipv6 => sub.put_slice(&addr.octets()),
                other => {
                    return Err(ParserError::InvalidAddressFamily {
                        expected: afi,
                        found: Afi::from(other),
                    })
                }
            }
            sub.put_u8(mapping.prefix_len);
        }

        // semantic + template id + nested length + sub-records
        let stl_len = 1 + 2 + 2 + sub.len();
        if stl_len > u8::MAX as usize {
            return Err(ParserError::OversizedSubTemplateList(stl_len));
        }

        let mut data = BytesMut::with_capacity(13 + stl_len);
        data.put_u64(record.timestamp.timestamp_millis() as u64);
        data.put_u8(record.rule_type.into());
        data.put_u8(record.target_type.into());
        data.put_u8(stl_len as u8);
        data.put_u8(SEMANTIC_ALL_OF);
        data.put_u16(template_id.into());
        data.put_u16(sub.len() as u16);
        data.put_slice(&sub);
        data.put_u8(record.policy_action.into());

        self.write_message(TemplateId::MainDataRecord.into(), &data)?;
        self.exported += 1;
        Ok(())
    }

    fn write_message(&mut self, set_id: u16, payload: &[u8]) -> Result<(), ParserError> {
        let export_time = Utc::now().timestamp() as u32;
        let message = encode_ipfix_message(set_id, payload, export_time, self.sequence_number);
        self.writer.write_all(&message)?;
        self.sequence_number = self.sequence_number.wrapping_add(1);
        Ok(())
    }

    /// Number of data records written so far (template messages excluded).
    pub fn exported_count(&self) -> u64 {
        self.exported
    }

    /// Flush the sink and drop the encoder.
    pub fn close(mut self) -> Result<(), ParserError> {
        self.writer.flush()?;
        Ok(())
    }

    /// Consume the encoder and return the underlying byte sink.
    pub fn into_inner(self) -> W {
        self.writer
    }
}

/// Collapse IPv4-mapped IPv6 addresses to their 4-byte form, the
/// "representable in 4 bytes" rule for address-family selection.
fn normalize_prefix(prefix: IpAddr) -> IpAddr {
    match prefix {
        IpAddr::V6(addr) => match addr.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => prefix,
        },
        v4 => v4,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{read_ipfix_message, SavParser};
    use chrono::TimeZone;
    use std::io::Cursor;

    fn timestamp() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_123).unwrap()
    }

    #[test]
    fn test_template_set_layout() {
        let mut encoder = SavEncoder::new(Vec::new());
        encoder.export_templates().unwrap();
        let bytes = encoder.into_inner();

        // 16-byte header + 4-byte set header + 3 template records:
        // 901/902 are 4 + 3*4 = 16 bytes each, 400 is 4 + 4+8+8+4+8 = 36
        assert_eq!(bytes.len(), 16 + 4 + 16 + 16 + 36);

        let message = read_ipfix_message(&mut Cursor::new(&bytes)).unwrap();
        let sets: Vec<_> = message.sets().collect::<Result<_, _>>().unwrap();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].id, TEMPLATE_SET_ID);

        let expected = hex::decode(concat!(
            // template 901: ingressInterface(4), sourceIPv4Address(4),
            // sourceIPv4PrefixLength(1)
            "03850003000a00040008000400090001",
            // template 902: ingressInterface(4), sourceIPv6Address(16),
            // sourceIPv6PrefixLength(1)
            "03860003000a0004001b0010001d0001",
            // template 400: obsTimeMs(8), then the enterprise-scoped SAV
            // elements under PEN 6871 (0x1ad7), subTemplateList variable
            "01900005",
            "01430008",
            "8001000100001ad7",
            "8002ffff00001ad7",
            "0124ffff",
            "8004000100001ad7",
        ))
        .unwrap();
        assert_eq!(&sets[0].data[..], expected.as_slice());
    }

    #[test]
    fn test_templates_sent_exactly_once() {
        let mut encoder = SavEncoder::new(Vec::new());
        for interface_id in 0..3 {
            encoder
                .write_mapping(
                    timestamp(),
                    RuleType::Allowlist,
                    TargetType::InterfaceBased,
                    PolicyAction::Permit,
                    interface_id,
                    "192.0.2.0".parse().unwrap(),
                    24,
                )
                .unwrap();
        }
        assert_eq!(encoder.exported_count(), 3);
        let bytes = encoder.into_inner();

        let mut cursor = Cursor::new(bytes);
        let mut template_messages = 0;
        let mut data_messages = 0;
        let mut sequences = Vec::new();
        loop {
            let message = match read_ipfix_message(&mut cursor) {
                Ok(message) => message,
                Err(ParserError::EofExpected) => break,
                Err(e) => panic!("unexpected error: {}", e),
            };
            sequences.push(message.header.sequence_number);
            for set in message.sets() {
                match set.unwrap().id {
                    TEMPLATE_SET_ID => template_messages += 1,
                    400 => data_messages += 1,
                    other => panic!("unexpected set id {}", other),
                }
            }
        }
        assert_eq!(template_messages, 1);
        assert_eq!(data_messages, 3);
        assert_eq!(sequences, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_v4_scenario_roundtrip() {
        let mut encoder = SavEncoder::new(Vec::new());
        encoder
            .write_mapping(
                timestamp(),
                RuleType::Allowlist,
                TargetType::InterfaceBased,
                PolicyAction::Discard,
                1000,
                "203.0.113.0".parse().unwrap(),
                24,
            )
            .unwrap();

        let mut parser = SavParser::new(Cursor::new(encoder.into_inner()));
        let record = parser.next_record().unwrap();
        assert_eq!(record.timestamp, timestamp());
        assert_eq!(u8::from(record.rule_type), 0);
        assert_eq!(u8::from(record.target_type), 0);
        assert_eq!(u8::from(record.policy_action), 1);
        assert_eq!(
            record.mappings,
            vec![SavMapping::new(1000, "203.0.113.0".parse().unwrap(), 24)]
        );
        assert!(!record.mappings[0].is_ipv6());
    }

    #[test]
    fn test_v6_scenario_roundtrip() {
        let mut encoder = SavEncoder::new(Vec::new());
        encoder
            .write_mapping(
                timestamp(),
                RuleType::Blocklist,
                TargetType::PrefixBased,
                PolicyAction::RateLimit,
                2000,
                "2001:db8:bad::".parse().unwrap(),
                48,
            )
            .unwrap();

        let mut parser = SavParser::new(Cursor::new(encoder.into_inner()));
        let record = parser.next_record().unwrap();
        assert_eq!(record.rule_type, RuleType::Blocklist);
        assert_eq!(record.target_type, TargetType::PrefixBased);
        assert_eq!(record.policy_action, PolicyAction::RateLimit);
        assert!(record.mappings[0].is_ipv6());
        assert_eq!(record.mappings[0].prefix.to_string(), "2001:db8:bad::");
        assert_eq!(record.mappings[0].prefix_len, 48);
    }

    #[test]
    fn test_ipv4_mapped_v6_takes_v4_path() {
        let mut encoder = SavEncoder::new(Vec::new());
        encoder
            .write_mapping(
                timestamp(),
                RuleType::Allowlist,
                TargetType::InterfaceBased,
                PolicyAction::Permit,
                1,
                "::ffff:192.0.2.0".parse().unwrap(),
                24,
            )
            .unwrap();

        let mut parser = SavParser::new(Cursor::new(encoder.into_inner()));
        let record = parser.next_record().unwrap();
        assert!(!record.mappings[0].is_ipv6());
        assert_eq!(record.mappings[0].prefix.to_string(), "192.0.2.0");
    }

    #[test]
    fn test_multi_mapping_record_roundtrip() {
        let record = SavRecord {
            timestamp: timestamp(),
            rule_type: RuleType::Allowlist,
            target_type: TargetType::InterfaceBased,
            policy_action: PolicyAction::Permit,
            mappings: (0..10)
                .map(|i| {
                    SavMapping::new(i, IpAddr::V4(std::net::Ipv4Addr::new(10, i as u8, 0, 0)), 16)
                })
                .collect(),
        };

        let mut encoder = SavEncoder::new(Vec::new());
        encoder.write_record(&record).unwrap();

        let mut parser = SavParser::new(Cursor::new(encoder.into_inner()));
        let decoded = parser.next_record().unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn test_empty_mapping_list() {
        let record = SavRecord {
            timestamp: timestamp(),
            rule_type: RuleType::Blocklist,
            target_type: TargetType::PrefixBased,
            policy_action: PolicyAction::Discard,
            mappings: vec![],
        };

        let mut encoder = SavEncoder::new(Vec::new());
        encoder.write_record(&record).unwrap();

        let mut parser = SavParser::new(Cursor::new(encoder.into_inner()));
        let decoded = parser.next_record().unwrap();
        assert!(decoded.mappings.is_empty());
        assert_eq!(decoded.rule_type, RuleType::Blocklist);
    }

    #[test]
    fn test_mixed_family_rejected() {
        let record = SavRecord {
            timestamp: timestamp(),
            rule_type: RuleType::Allowlist,
            target_type: TargetType::InterfaceBased,
            policy_action: PolicyAction::Permit,
            mappings: vec![
                SavMapping::new(1, "192.0.2.0".parse().unwrap(), 24),
                SavMapping::new(2, "2001:db8::".parse().unwrap(), 48),
            ],
        };

        let mut encoder = SavEncoder::new(Vec::new());
        assert!(matches!(
            encoder.write_record(&record),
            Err(ParserError::InvalidAddressFamily {
                expected: Afi::Ipv4,
                found: Afi::Ipv6
            })
        ));
    }

    #[test]
    fn test_oversized_sub_template_list() {
        // 28 IPv4 mappings need 5 + 28*9 = 257 bytes, past the 255-byte cap
        let record = SavRecord {
            timestamp: timestamp(),
            rule_type: RuleType::Allowlist,
            target_type: TargetType::InterfaceBased,
            policy_action: PolicyAction::Permit,
            mappings: (0..28)
                .map(|i| SavMapping::new(i, "10.0.0.0".parse().unwrap(), 8))
                .collect(),
        };

        let mut encoder = SavEncoder::new(Vec::new());
        assert!(matches!(
            encoder.write_record(&record),
            Err(ParserError::OversizedSubTemplateList(257))
        ));

        // 27 mappings still fit
        let record = SavRecord {
            mappings: record.mappings[..27].to_vec(),
            ..record
        };
        encoder.write_record(&record).unwrap();
    }

    #[test]
    fn test_unknown_code_points_encode() {
        let mut encoder = SavEncoder::new(Vec::new());
        encoder
            .write_mapping(
                timestamp(),
                RuleType::Unknown(9),
                TargetType::Unknown(8),
                PolicyAction::Unknown(7),
                1,
                "192.0.2.0".parse().unwrap(),
                24,
            )
            .unwrap();

        let mut parser = SavParser::new(Cursor::new(encoder.into_inner()));
        let record = parser.next_record().unwrap();
        assert_eq!(record.rule_type, RuleType::Unknown(9));
        assert_eq!(record.target_type, TargetType::Unknown(8));
        assert_eq!(record.policy_action, PolicyAction::Unknown(7));
        assert_eq!(record.policy_action.to_string(), "Unknown");
    }

    #[test]
    fn test_close_flushes() {
        let mut encoder = SavEncoder::new(Vec::new());
        encoder
            .write_mapping(
                timestamp(),
                RuleType::Allowlist,
                TargetType::InterfaceBased,
                PolicyAction::Permit,
                1,
                "192.0.2.0".parse().unwrap(),
                24,
            )
            .unwrap();
        encoder.close().unwrap();
    }
}
