//! Forgiving numeric fields.
//!
//! Editors submit quantities and costs as whatever the form held: numbers,
//! numeric strings, empty strings or nothing at all. Anything that does not
//! read as a number counts as zero.

use std::fmt;

use rust_decimal::Decimal;
use serde::de::{self, Deserializer, IgnoredAny, MapAccess, SeqAccess, Visitor};

/// Key under which serde_json hands over numbers it keeps as text.
const NUMBER_TOKEN: &str = "$serde_json::private::Number";

pub(crate) fn decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
    deserializer.deserialize_any(LenientDecimal)
}

fn parse(text: &str) -> Decimal {
    let text = text.trim();
    text.parse()
        .or_else(|_| Decimal::from_scientific(text))
        .unwrap_or_default()
}

struct LenientDecimal;

impl<'de> Visitor<'de> for LenientDecimal {
    type Value = Decimal;

    fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        fmt.write_str("a number or numeric string")
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Decimal, E> {
        Ok(Decimal::from(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Decimal, E> {
        Ok(parse(&v.to_string()))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Decimal, E> {
        Ok(parse(v))
    }

    fn visit_bool<E: de::Error>(self, _: bool) -> Result<Decimal, E> {
        Ok(Decimal::ZERO)
    }

    fn visit_unit<E: de::Error>(self) -> Result<Decimal, E> {
        Ok(Decimal::ZERO)
    }

    fn visit_none<E: de::Error>(self) -> Result<Decimal, E> {
        Ok(Decimal::ZERO)
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Decimal, A::Error> {
        while seq.next_element::<IgnoredAny>()?.is_some() {}
        Ok(Decimal::ZERO)
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Decimal, A::Error> {
        let mut value = Decimal::ZERO;
        while let Some(key) = map.next_key::<String>()? {
            if key == NUMBER_TOKEN {
                value = parse(&map.next_value::<String>()?);
            } else {
                map.next_value::<IgnoredAny>()?;
            }
        }
        Ok(value)
    }
}
