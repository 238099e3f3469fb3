//! Static template model.
//!
//! The template set is fixed: this codec never negotiates or discovers
//! templates at runtime. Three templates are emitted on the wire (the main
//! data record plus the two interface-to-prefix mapping layouts); the two
//! prefix-to-interface template ids are reserved but not emitted.

use crate::models::Afi;
use bytes::{BufMut, BytesMut};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Private enterprise number scoping the SAV information elements.
pub const ENTERPRISE_NUMBER: u32 = 6871;

/// Template-level marker for a variable-length field (RFC 7011 section 7).
pub const VARIABLE_LENGTH: u16 = 0xFFFF;

/// Semantic byte for a sub-template list carrying all rules ("allOf",
/// RFC 6313). The only value this codec produces.
pub const SEMANTIC_ALL_OF: u8 = 0xFF;

// IANA-assigned information elements
pub const IE_SOURCE_IPV4_ADDRESS: u16 = 8;
pub const IE_SOURCE_IPV4_PREFIX_LENGTH: u16 = 9;
pub const IE_INGRESS_INTERFACE: u16 = 10;
pub const IE_SOURCE_IPV6_ADDRESS: u16 = 27;
pub const IE_SOURCE_IPV6_PREFIX_LENGTH: u16 = 29;
pub const IE_SUB_TEMPLATE_LIST: u16 = 292;
pub const IE_OBSERVATION_TIME_MILLISECONDS: u16 = 323;

// Enterprise-scoped SAV elements (PEN 6871)
pub const IE_SAV_RULE_TYPE: u16 = 1;
pub const IE_SAV_TARGET_TYPE: u16 = 2;
pub const IE_SAV_POLICY_ACTION: u16 = 4;

/// Template ids of the fixed SAV template set.
#[derive(Debug, PartialEq, TryFromPrimitive, IntoPrimitive, Clone, Copy, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum TemplateId {
    /// The outer SAV status record.
    MainDataRecord = 400,
    /// IPv4 interface-to-prefix mapping, 9 bytes per sub-record.
    Ipv4InterfacePrefix = 901,
    /// IPv6 interface-to-prefix mapping, 21 bytes per sub-record.
    Ipv6InterfacePrefix = 902,
    /// Reserved, not emitted.
    Ipv4PrefixInterface = 903,
    /// Reserved, not emitted.
    Ipv6PrefixInterface = 904,
}

/// Fixed layout of one sub-template-list record.
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub struct MappingLayout {
    pub afi: Afi,
    /// Bytes per sub-record: interfaceId(4) + address + prefixLen(1).
    pub record_len: usize,
}

const IPV4_MAPPING_LAYOUT: MappingLayout = MappingLayout {
    afi: Afi::Ipv4,
    record_len: 4 + 4 + 1,
};

const IPV6_MAPPING_LAYOUT: MappingLayout = MappingLayout {
    afi: Afi::Ipv6,
    record_len: 4 + 16 + 1,
};

impl TemplateId {
    /// Sub-record layout for template ids that may appear inside a
    /// sub-template list. `None` for ids this codec does not emit or accept
    /// as nested templates. Extending the decoder to the prefix-to-interface
    /// templates is a matter of adding their entries here.
    pub fn mapping_layout(self) -> Option<MappingLayout> {
        match self {
            TemplateId::Ipv4InterfacePrefix => Some(IPV4_MAPPING_LAYOUT),
            TemplateId::Ipv6InterfacePrefix => Some(IPV6_MAPPING_LAYOUT),
            _ => None,
        }
    }

    /// Layout lookup for the nested template carrying mappings of `afi`.
    pub fn for_afi(afi: Afi) -> TemplateId {
        match afi {
            Afi::Ipv4 => TemplateId::Ipv4InterfacePrefix,
            Afi::Ipv6 => TemplateId::Ipv6InterfacePrefix,
        }
    }
}

/// One field specifier of a template record (RFC 7011 section 3.2).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |E|  Information Element ident. |        Field Length           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                      Enterprise Number (if E set)             |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
#[derive(Debug, PartialEq, Clone, Copy, Eq)]
pub struct FieldSpecifier {
    /// 15-bit information element id; the enterprise bit is a wire-level
    /// concern handled during encoding.
    pub element_id: u16,
    /// Field length in bytes, or [VARIABLE_LENGTH].
    pub length: u16,
    pub enterprise_number: Option<u32>,
}

impl FieldSpecifier {
    pub const fn new(element_id: u16, length: u16) -> Self {
        FieldSpecifier {
            element_id,
            length,
            enterprise_number: None,
        }
    }

    pub const fn enterprise(element_id: u16, length: u16) -> Self {
        FieldSpecifier {
            element_id,
            length,
            enterprise_number: Some(ENTERPRISE_NUMBER),
        }
    }

    /// 4 bytes for a standard specifier, 8 with the enterprise trailer.
    pub fn encoded_len(&self) -> usize {
        match self.enterprise_number {
            Some(_) => 8,
            None => 4,
        }
    }

    pub fn encode(&self, bytes: &mut BytesMut) {
        match self.enterprise_number {
            Some(pen) => {
                bytes.put_u16(0x8000 | self.element_id);
                bytes.put_u16(self.length);
                bytes.put_u32(pen);
            }
            None => {
                bytes.put_u16(self.element_id);
                bytes.put_u16(self.length);
            }
        }
    }
}

const IPV4_INTERFACE_PREFIX_FIELDS: [FieldSpecifier; 3] = [
    FieldSpecifier::new(IE_INGRESS_INTERFACE, 4),
    FieldSpecifier::new(IE_SOURCE_IPV4_ADDRESS, 4),
    FieldSpecifier::new(IE_SOURCE_IPV4_PREFIX_LENGTH, 1),
];

const IPV6_INTERFACE_PREFIX_FIELDS: [FieldSpecifier; 3] = [
    FieldSpecifier::new(IE_INGRESS_INTERFACE, 4),
    FieldSpecifier::new(IE_SOURCE_IPV6_ADDRESS, 16),
    FieldSpecifier::new(IE_SOURCE_IPV6_PREFIX_LENGTH, 1),
];

const MAIN_DATA_RECORD_FIELDS: [FieldSpecifier; 5] = [
    FieldSpecifier::new(IE_OBSERVATION_TIME_MILLISECONDS, 8),
    FieldSpecifier::enterprise(IE_SAV_RULE_TYPE, 1),
    FieldSpecifier::enterprise(IE_SAV_TARGET_TYPE, VARIABLE_LENGTH),
    FieldSpecifier::new(IE_SUB_TEMPLATE_LIST, VARIABLE_LENGTH),
    FieldSpecifier::enterprise(IE_SAV_POLICY_ACTION, 1),
];

/// The templates written to the wire, in template-set order.
pub const EXPORTED_TEMPLATES: [(TemplateId, &[FieldSpecifier]); 3] = [
    (
        TemplateId::Ipv4InterfacePrefix,
        &IPV4_INTERFACE_PREFIX_FIELDS,
    ),
    (
        TemplateId::Ipv6InterfacePrefix,
        &IPV6_INTERFACE_PREFIX_FIELDS,
    ),
    (TemplateId::MainDataRecord, &MAIN_DATA_RECORD_FIELDS),
];

impl TemplateId {
    /// Field specifiers of an emitted template. `None` for the reserved
    /// prefix-to-interface ids, which have no wire representation yet.
    pub fn field_specifiers(self) -> Option<&'static [FieldSpecifier]> {
        EXPORTED_TEMPLATES
            .iter()
            .find(|(id, _)| *id == self)
            .map(|(_, fields)| *fields)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_id_repr() {
        assert_eq!(TemplateId::MainDataRecord as u16, 400);
        assert_eq!(TemplateId::Ipv4InterfacePrefix as u16, 901);
        assert_eq!(TemplateId::Ipv6InterfacePrefix as u16, 902);
        assert_eq!(TemplateId::Ipv4PrefixInterface as u16, 903);
        assert_eq!(TemplateId::Ipv6PrefixInterface as u16, 904);
        assert!(TemplateId::try_from(999u16).is_err());
    }

    #[test]
    fn test_mapping_layouts() {
        let v4 = TemplateId::Ipv4InterfacePrefix.mapping_layout().unwrap();
        assert_eq!(v4.record_len, 9);
        assert_eq!(v4.afi, Afi::Ipv4);

        let v6 = TemplateId::Ipv6InterfacePrefix.mapping_layout().unwrap();
        assert_eq!(v6.record_len, 21);
        assert_eq!(v6.afi, Afi::Ipv6);

        assert!(TemplateId::MainDataRecord.mapping_layout().is_none());
        assert!(TemplateId::Ipv4PrefixInterface.mapping_layout().is_none());
    }

    #[test]
    fn test_field_specifier_encoding() {
        let mut bytes = BytesMut::new();
        FieldSpecifier::new(IE_INGRESS_INTERFACE, 4).encode(&mut bytes);
        assert_eq!(&bytes[..], &[0x00, 0x0a, 0x00, 0x04]);

        let mut bytes = BytesMut::new();
        let specifier = FieldSpecifier::enterprise(IE_SAV_RULE_TYPE, 1);
        assert_eq!(specifier.encoded_len(), 8);
        specifier.encode(&mut bytes);
        // enterprise bit set, PEN 6871 = 0x1ad7 trailing
        assert_eq!(
            &bytes[..],
            &[0x80, 0x01, 0x00, 0x01, 0x00, 0x00, 0x1a, 0xd7]
        );
    }

    #[test]
    fn test_exported_template_fields() {
        let fields = TemplateId::MainDataRecord.field_specifiers().unwrap();
        assert_eq!(fields.len(), 5);
        assert_eq!(fields[0].element_id, IE_OBSERVATION_TIME_MILLISECONDS);
        assert_eq!(fields[3].element_id, IE_SUB_TEMPLATE_LIST);
        assert_eq!(fields[3].length, VARIABLE_LENGTH);
        assert_eq!(fields[4].enterprise_number, Some(ENTERPRISE_NUMBER));

        assert!(TemplateId::Ipv4PrefixInterface.field_specifiers().is_none());
        assert!(TemplateId::Ipv6PrefixInterface.field_specifiers().is_none());
    }
}
