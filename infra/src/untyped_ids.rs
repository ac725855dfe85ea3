use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use std::str::FromStr;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use data_encoding::BASE32_DNSSEC;
use err_derive::Error;
use hex_slice::AsHex;
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::ids::Id;

const ID_LEN: usize = 16;
const WORD: usize = 8;

/// A 128 bit identifier without an entity kind attached.
///
/// Generated identifiers are a big endian nanosecond timestamp followed by
/// 64 random bits, so they sort roughly by creation time.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct UntypedId {
    val: [u8; ID_LEN],
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error(display = "identifier has the wrong prefix")]
    InvalidPrefix,
    #[error(display = "identifier could not be decoded")]
    Unparseable,
}

impl UntypedId {
    pub(crate) fn from_parts(stamp: SystemTime, random: u64) -> Self {
        let nanos = stamp
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        let mut val = [0u8; ID_LEN];
        val[..WORD].copy_from_slice(&nanos.to_be_bytes());
        val[WORD..].copy_from_slice(&random.to_be_bytes());
        UntypedId { val }
    }

    pub(crate) fn from_bytes(val: [u8; ID_LEN]) -> Self {
        UntypedId { val }
    }

    pub fn hashed<H: Hash + ?Sized>(entity: &H) -> Self {
        let mut val = [0u8; ID_LEN];
        for (i, chunk) in val.chunks_mut(WORD).enumerate() {
            let mut h = siphasher::sip::SipHasher24::new_with_keys(0, i as u64);
            entity.hash(&mut h);
            chunk.copy_from_slice(&h.finish().to_be_bytes());
        }
        UntypedId { val }
    }

    pub fn timestamp(&self) -> SystemTime {
        UNIX_EPOCH + Duration::from_nanos(self.word(0))
    }

    pub fn random(&self) -> u64 {
        self.word(WORD)
    }

    pub fn typed<T>(self) -> Id<T> {
        Id {
            inner: self,
            phantom: PhantomData,
        }
    }

    fn word(&self, offset: usize) -> u64 {
        let mut buf = [0u8; WORD];
        buf.copy_from_slice(&self.val[offset..offset + WORD]);
        u64::from_be_bytes(buf)
    }
}

impl fmt::Display for UntypedId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str(&BASE32_DNSSEC.encode(&self.val))
    }
}

impl fmt::Debug for UntypedId {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.debug_tuple("UntypedId")
            .field(&format_args!("{:x}", self.val.as_hex()))
            .finish()
    }
}

impl FromStr for UntypedId {
    type Err = IdParseError;
    fn from_str(src: &str) -> Result<Self, Self::Err> {
        let bytes = BASE32_DNSSEC
            .decode(src.as_bytes())
            .map_err(|_| IdParseError::Unparseable)?;
        if bytes.len() != ID_LEN {
            return Err(IdParseError::Unparseable);
        }
        let mut val = [0u8; ID_LEN];
        val.copy_from_slice(&bytes);
        Ok(UntypedId { val })
    }
}

impl Serialize for UntypedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for UntypedId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn should_preserve_timestamp_and_random_parts() {
        let stamp = UNIX_EPOCH + Duration::from_nanos(1_600_000_000_123_456_789);
        let id = UntypedId::from_parts(stamp, 0xdead_beef);

        assert_eq!(id.timestamp(), stamp);
        assert_eq!(id.random(), 0xdead_beef);
    }

    #[test]
    fn hashing_is_stable() {
        let a = UntypedId::hashed("someone@example.com");
        let b = UntypedId::hashed("someone@example.com");
        let c = UntypedId::hashed("someone-else@example.com");

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn should_parse_displayed_form() {
        let id = UntypedId::hashed("flour");
        let parsed: UntypedId = id.to_string().parse().expect("parse");
        assert_eq!(parsed, id);
    }

    #[test]
    fn should_reject_short_input() {
        assert_eq!(
            "abc".parse::<UntypedId>(),
            Err(IdParseError::Unparseable)
        );
    }
}
