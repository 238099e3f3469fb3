//! Data record parsing: the outer SAV status record and its nested
//! sub-template list of interface-prefix mappings.
//!
//! The outer record is positional:
//! ```text
//! obsTimeMs:u64 | ruleType:u8 | targetType:u8 | stlLen:u8 | stl bytes | policyAction:u8
//! ```
//! and the sub-template list inside it:
//! ```text
//! semantic:u8 | nestedTemplateId:u16 | nestedLength:u16 | fixed-size sub-records
//! ```

use crate::error::ParserError;
use crate::models::*;
use crate::parser::utils::ReadUtils;
use bytes::{Buf, Bytes};
use chrono::DateTime;
use std::net::IpAddr;

/// Parse the payload of a main-data-record set into a [SavRecord].
pub fn parse_data_record(mut data: Bytes) -> Result<SavRecord, ParserError> {
    let millis = data.read_u64()?;
    let timestamp = DateTime::from_timestamp_millis(millis as i64)
        .ok_or(ParserError::InvalidTimestamp(millis))?;
    let rule_type = RuleType::from(data.read_u8()?);
    let target_type = TargetType::from(data.read_u8()?);

    let stl_len = data.read_u8()? as usize;
    let stl = data.read_n_bytes(stl_len)?;
    let mappings = parse_sub_template_list(stl)?;

    let policy_action = PolicyAction::from(data.read_u8()?);

    Ok(SavRecord {
        timestamp,
        rule_type,
        target_type,
        policy_action,
        mappings,
    })
}

/// Parse a sub-template list into its mapping records.
///
/// The semantic byte is checked for presence only. Sub-records are fixed
/// size per nested template id; a trailing partial sub-record is silently
/// dropped for compatibility with existing producers (lossy-tail policy).
pub fn parse_sub_template_list(mut data: Bytes) -> Result<Vec<SavMapping>, ParserError> {
    let _semantic = data.read_u8()?;
    let template_id = data.read_u16()?;
    let nested_len = data.read_u16()? as usize;
    let mut nested = data.read_n_bytes(nested_len)?;

    let layout = TemplateId::try_from(template_id)
        .ok()
        .and_then(TemplateId::mapping_layout)
        .ok_or(ParserError::UnknownSubTemplate(template_id))?;

    let mut mappings = Vec::with_capacity(nested_len / layout.record_len);
    while nested.remaining() >= layout.record_len {
        let interface_id = nested.read_u32()?;
        let prefix = match layout.afi {
            Afi::Ipv4 => IpAddr::V4(nested.read_ipv4_address()?),
            Afi::Ipv6 => IpAddr::V6(nested.read_ipv6_address()?),
        };
        let prefix_len = nested.read_u8()?;
        mappings.push(SavMapping::new(interface_id, prefix, prefix_len));
    }
    Ok(mappings)
}
