//! Attribute values, versions and filter expressions.
//!
//! Capabilities carry typed attributes; requirements select capabilities with
//! an LDAP-style filter such as `(&(wiring.package=foo)(version>=1.2))`.
//!
//! ```
//! use indexmap::IndexMap;
//! use wirex_filter::{Filter, Value, Version};
//!
//! let filter = Filter::parse("(&(wiring.package=foo)(version>=1.2))").unwrap();
//!
//! let mut attrs = IndexMap::new();
//! attrs.insert("wiring.package".to_string(), Value::from("foo"));
//! attrs.insert("version".to_string(), Value::Version(Version::new(1, 4, 0)));
//!
//! assert!(filter.matches(&attrs));
//! ```

mod filter;
mod value;
mod version;

pub use filter::{Filter, FilterError};
pub use value::Value;
pub use version::{Version, VersionError};
