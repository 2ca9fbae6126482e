//! Clonotype keys: the exact-match identity of a receptor
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Opaque matching string, e.g. `V06,CASSPGPDRYEQYF`. Two clonotypes match
/// iff their keys are byte-identical.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClonotypeKey(String);

impl ClonotypeKey {
    pub fn new(key: impl Into<String>) -> ClonotypeKey {
        ClonotypeKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClonotypeKey {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ClonotypeKey {
    fn from(s: &str) -> ClonotypeKey {
        ClonotypeKey(s.to_string())
    }
}

impl From<String> for ClonotypeKey {
    fn from(s: String) -> ClonotypeKey {
        ClonotypeKey(s)
    }
}

impl AsRef<str> for ClonotypeKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for ClonotypeKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Join the fields verbatim. There is no escaping: a field containing the
/// separator produces a key that can collide with another field split.
pub fn make_key<S: AsRef<str>>(fields: &[S], separator: &str) -> ClonotypeKey {
    ClonotypeKey(fields.iter().map(|f| f.as_ref()).join(separator))
}
