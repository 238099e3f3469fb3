/*!
Data structures for the SAV IPFIX format: logical records and the static
template model.
*/
pub mod sav;
pub mod template;

pub use sav::*;
pub use template::*;
