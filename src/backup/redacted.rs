//! Secret strings (FTP passwords) that never show up in logs or dumped configs.

use derive_more::From;
use getset::Getters;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Debug, Formatter};
use std::result;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Placeholder printed and serialized instead of the secret
pub static REDACTED: &str = "###REDACTED###";

/// Secret string, zeroed on drop
#[derive(Clone, Zeroize, ZeroizeOnDrop, From, PartialEq, Eq, Getters)]
#[getset(get = "pub")]
pub struct RedactedString {
    inner: String,
}

impl From<&str> for RedactedString {
    fn from(value: &str) -> Self {
        value.to_owned().into()
    }
}

impl Debug for RedactedString {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(REDACTED)
    }
}

impl Serialize for RedactedString {
    fn serialize<S: Serializer>(&self, serializer: S) -> result::Result<S::Ok, S::Error> {
        serializer.serialize_str(REDACTED)
    }
}

impl<'de> Deserialize<'de> for RedactedString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> result::Result<Self, D::Error> {
        String::deserialize(deserializer).map(RedactedString::from)
    }
}
