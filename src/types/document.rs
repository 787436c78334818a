//! Document and query shapes

use serde_json::{Map, Value};

/// An arbitrary mapping of field names to values, owned by the caller.
///
/// The facade only ever adds the two timestamp fields and never removes
/// caller-supplied fields.
pub type Document = Map<String, Value>;

/// A filter document. Opaque to the facade except for key derivation.
pub type Query = Map<String, Value>;
