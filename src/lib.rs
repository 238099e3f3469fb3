/*!
sav-ipfix encodes and decodes IPFIX messages carrying Source Address
Validation (SAV) status records, per [RFC 7011] (protocol), [RFC 6313]
(structured data export) and the SAV information elements of
draft-cao-opsawg-ipfix-sav under private enterprise number 6871.

Each record reports one traffic-validation rule: a rule type, a target
type, a policy action, and a list of interface-to-prefix mappings nested in
a sub-template list. The template set is fixed and compiled in; this crate
does not implement general IPFIX (arbitrary templates, options templates,
template withdrawal, or transport negotiation).

[RFC 7011]: https://www.rfc-editor.org/rfc/rfc7011
[RFC 6313]: https://www.rfc-editor.org/rfc/rfc6313

# Decoding

```
use sav_ipfix::{PolicyAction, RuleType, SavEncoder, SavParser, TargetType};
use chrono::Utc;
use std::io::Cursor;

// produce a small stream in memory
let mut encoder = SavEncoder::new(Vec::new());
encoder
    .write_mapping(
        Utc::now(),
        RuleType::Allowlist,
        TargetType::InterfaceBased,
        PolicyAction::Discard,
        1000,
        "203.0.113.0".parse().unwrap(),
        24,
    )
    .unwrap();
let bytes = encoder.into_inner();

// and read it back
for record in SavParser::new(Cursor::new(bytes)) {
    for mapping in &record.mappings {
        println!("{}: {} -> {}", record.policy_action, record.rule_type, mapping);
    }
}
```

# Error handling

Decoding errors carry their scope: a version mismatch or truncation
abandons the stream, while an unknown nested template only loses the
current record ([ParserError::is_fatal]). The default iterator skips
record-scoped errors; use
[SavParser::into_fallible_record_iter] to observe every error.
*/
pub mod encoder;
pub mod error;
pub mod models;
pub mod parser;

pub use crate::encoder::SavEncoder;
pub use crate::error::ParserError;
pub use crate::models::*;
pub use crate::parser::{FallibleRecordIterator, RecordIterator, SavParser};
