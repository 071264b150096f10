use serde::{Deserialize, Deserializer, Serialize, Serializer, de};
use std::fmt;

/// Integer price tick. Valid order prices are `1..=MAX_PRICE`.
pub type Price = u32;

/// Order size in units.
pub type Qty = u64;

/// Engine-allocated order identity, handed out as a dense monotonic counter
/// starting at 1. Doubles as the order's slot index in the order table; 0 is
/// the invalid sentinel.
pub type OrderId = u64;

/// Width in bytes of the fixed trader and symbol identifiers.
pub const STRINGLEN: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Side {
    Buy = 0,
    Sell = 1,
}

impl Side {
    pub fn opposite(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Fixed-width identifier used for traders and symbols.
///
/// Construction right-pads shorter input with spaces and truncates longer
/// input; comparison and hashing are byte-wise. Serialized as a plain string
/// with the padding trimmed.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag([u8; STRINGLEN]);

impl Tag {
    pub fn new(s: &str) -> Self {
        let mut buf = [b' '; STRINGLEN];
        for (slot, byte) in buf.iter_mut().zip(s.bytes()) {
            *slot = byte;
        }
        Tag(buf)
    }

    pub fn as_bytes(&self) -> &[u8; STRINGLEN] {
        &self.0
    }
}

impl Default for Tag {
    fn default() -> Self {
        Tag([b' '; STRINGLEN])
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = String::from_utf8_lossy(&self.0);
        f.write_str(text.trim_end())
    }
}

impl fmt::Debug for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Tag({self})")
    }
}

impl Serialize for Tag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        if s.len() > STRINGLEN {
            return Err(de::Error::custom(format!(
                "identifier `{s}` longer than {STRINGLEN} bytes"
            )));
        }
        Ok(Tag::new(&s))
    }
}

/// A caller-supplied intent to trade.
///
/// An order has no identity until the engine accepts it; `Engine::limit`
/// returns the id it was assigned. `symbol` is carried through to the
/// execution reports untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub side: Side,
    pub price: Price,
    pub size: Qty,
    pub trader: Tag,
    pub symbol: Tag,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_pads_and_truncates() {
        assert_eq!(Tag::new("AB").as_bytes(), b"AB   ");
        assert_eq!(Tag::new("ABCDEFG").as_bytes(), b"ABCDE");
        assert_eq!(Tag::new("AB").to_string(), "AB");
    }

    #[test]
    fn tag_equality_is_padded() {
        assert_eq!(Tag::new("AB"), Tag::new("AB "));
        assert_ne!(Tag::new("AB"), Tag::new("AC"));
    }

    #[test]
    fn tag_serde_round_trips_as_string() {
        let tag = Tag::new("TRDR");
        let json = serde_json::to_string(&tag).unwrap();
        assert_eq!(json, "\"TRDR\"");
        let back: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tag);
    }

    #[test]
    fn tag_deserialize_rejects_overlong_input() {
        let err = serde_json::from_str::<Tag>("\"TOOLONG\"");
        assert!(err.is_err());
    }
}
