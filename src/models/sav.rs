//! Logical SAV record model.
//!
//! These are the post-decode structures produced by the parser and consumed
//! by the encoder. Code points follow draft-cao-opsawg-ipfix-sav: rule type,
//! target type and policy action are enterprise-scoped information elements
//! under PEN 6871.

use chrono::{DateTime, Utc};
use ipnet::{IpNet, Ipv4Net, Ipv6Net};
use num_enum::{FromPrimitive, IntoPrimitive};
use std::fmt;
use std::net::IpAddr;

/// Address family of a mapping prefix.
///
/// Never an explicit wire field: decoding derives it from the nested template
/// id, encoding from the prefix representation.
#[derive(Debug, PartialEq, Clone, Copy, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Afi {
    Ipv4,
    Ipv6,
}

impl From<IpAddr> for Afi {
    #[inline]
    fn from(value: IpAddr) -> Self {
        match value {
            IpAddr::V4(_) => Afi::Ipv4,
            IpAddr::V6(_) => Afi::Ipv6,
        }
    }
}

/// SAV rule type (savRuleType, enterprise element 1).
#[derive(Debug, PartialEq, FromPrimitive, IntoPrimitive, Clone, Copy, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum RuleType {
    /// Permit the listed sources, implicitly deny the rest.
    Allowlist = 0,
    /// Deny the listed sources.
    Blocklist = 1,
    /// Unrecognized code point, preserved as received.
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// SAV target type (savTargetType, enterprise element 2).
#[derive(Debug, PartialEq, FromPrimitive, IntoPrimitive, Clone, Copy, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TargetType {
    /// Validation rules bound to interfaces.
    InterfaceBased = 0,
    /// Validation rules bound to prefix ranges.
    PrefixBased = 1,
    /// Unrecognized code point, preserved as received.
    #[num_enum(catch_all)]
    Unknown(u8),
}

/// SAV policy action (savPolicyAction, enterprise element 4).
#[derive(Debug, PartialEq, FromPrimitive, IntoPrimitive, Clone, Copy, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PolicyAction {
    Permit = 0,
    Discard = 1,
    RateLimit = 2,
    /// Redirect to monitoring/scrubbing.
    Redirect = 3,
    /// Unrecognized code point, preserved as received.
    #[num_enum(catch_all)]
    Unknown(u8),
}

impl fmt::Display for RuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RuleType::Allowlist => "Allowlist",
            RuleType::Blocklist => "Blocklist",
            RuleType::Unknown(_) => "Unknown",
        })
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TargetType::InterfaceBased => "InterfaceBased",
            TargetType::PrefixBased => "PrefixBased",
            TargetType::Unknown(_) => "Unknown",
        })
    }
}

impl fmt::Display for PolicyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PolicyAction::Permit => "Permit",
            PolicyAction::Discard => "Discard",
            PolicyAction::RateLimit => "RateLimit",
            PolicyAction::Redirect => "Redirect",
            PolicyAction::Unknown(_) => "Unknown",
        })
    }
}

/// One interface-to-prefix mapping inside a SAV record.
#[derive(Debug, PartialEq, Clone, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SavMapping {
    pub interface_id: u32,
    pub prefix: IpAddr,
    pub prefix_len: u8,
}

impl SavMapping {
    pub fn new(interface_id: u32, prefix: IpAddr, prefix_len: u8) -> Self {
        SavMapping {
            interface_id,
            prefix,
            prefix_len,
        }
    }

    /// Address family of the mapping, derived from the prefix representation.
    #[inline]
    pub fn afi(&self) -> Afi {
        Afi::from(self.prefix)
    }

    #[inline]
    pub fn is_ipv6(&self) -> bool {
        self.afi() == Afi::Ipv6
    }

    /// The mapping prefix as a network, or `None` if the prefix length
    /// exceeds the address family maximum. The wire format does not validate
    /// the prefix length, so decoded mappings may fail this conversion.
    pub fn net(&self) -> Option<IpNet> {
        match self.prefix {
            IpAddr::V4(addr) => Ipv4Net::new(addr, self.prefix_len).ok().map(IpNet::V4),
            IpAddr::V6(addr) => Ipv6Net::new(addr, self.prefix_len).ok().map(IpNet::V6),
        }
    }
}

impl fmt::Display for SavMapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.net() {
            Some(net) => write!(f, "if{} -> {}", self.interface_id, net),
            None => write!(
                f,
                "if{} -> {}/{}",
                self.interface_id, self.prefix, self.prefix_len
            ),
        }
    }
}

/// A decoded SAV status record: one validation rule with its interface-prefix
/// mappings.
#[derive(Debug, PartialEq, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SavRecord {
    /// Observation time, millisecond precision on the wire.
    pub timestamp: DateTime<Utc>,
    pub rule_type: RuleType,
    pub target_type: TargetType,
    pub policy_action: PolicyAction,
    pub mappings: Vec<SavMapping>,
}
