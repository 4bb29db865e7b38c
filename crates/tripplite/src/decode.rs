use crate::{FieldDescriptor, Format, Result, UpsError};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Named status bits, kept in bit order (least-significant first).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flags(Vec<(&'static str, bool)>);

impl Flags {
    pub fn get(&self, name: &str) -> Option<bool> {
        self.0.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, bool)> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for Flags {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut sorted: Vec<&(&'static str, bool)> = self.0.iter().collect();
        sorted.sort_unstable_by_key(|(k, _)| *k);
        let mut map = serializer.serialize_map(Some(sorted.len()))?;
        for (k, v) in sorted {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// One decoded field.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Reading {
    Flags(Flags),
    Int(u16),
    Float(f64),
}

impl Reading {
    /// Numeric value for scalar readings; `None` for bitfields.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Int(v) => Some(f64::from(*v)),
            Reading::Float(v) => Some(*v),
            Reading::Flags(_) => None,
        }
    }
}

/// Decode a raw feature report for `desc`.
///
/// Byte 0 must echo the requested address; the payload follows, low-order byte first.
pub fn decode(desc: &FieldDescriptor, report: &[u8]) -> Result<Reading> {
    let echoed = match report.first() {
        Some(b) => *b,
        None => {
            return Err(UpsError::Protocol(format!(
                "empty report for address {}",
                desc.address
            )))
        }
    };
    if echoed != desc.address {
        return Err(UpsError::Protocol(format!(
            "requested address {} but device answered for {}",
            desc.address, echoed
        )));
    }
    if report.len() < desc.report_len() {
        return Err(UpsError::Protocol(format!(
            "address {}: expected {} bytes, got {}",
            desc.address,
            desc.report_len(),
            report.len()
        )));
    }

    let payload = &report[1..desc.report_len()];
    match (desc.format, payload) {
        (Format::Bitfield(keys), [bits]) => Ok(Reading::Flags(Flags(
            keys.iter()
                .enumerate()
                .map(|(i, k)| (*k, bits & (1 << i) != 0))
                .collect(),
        ))),
        (Format::UnsignedInt, [b]) => Ok(Reading::Int(u16::from(*b))),
        (Format::UnsignedInt, [lo, hi]) => Ok(Reading::Int(u16::from_le_bytes([*lo, *hi]))),
        (Format::ScaledFloat, [lo, hi]) => Ok(Reading::Float(
            f64::from(u16::from_le_bytes([*lo, *hi])) / 10.0,
        )),
        (format, _) => Err(UpsError::Config(format!(
            "address {}: {:?} cannot be {} byte(s) wide",
            desc.address, format, desc.width
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    static KEYS: [&str; 8] = ["a", "b", "c", "d", "e", "f", "g", "h"];

    #[test]
    fn bitfield_is_lsb_first() {
        let desc = FieldDescriptor::bitfield(50, &KEYS);
        let Reading::Flags(flags) = decode(&desc, &[50, 0b0000_0101]).unwrap() else {
            panic!("expected flags");
        };
        let expected = [true, false, true, false, false, false, false, false];
        for (i, key) in KEYS.iter().enumerate() {
            assert_eq!(flags.get(key), Some(expected[i]), "bit {i}");
        }
        let order: Vec<&str> = flags.iter().map(|(k, _)| k).collect();
        assert_eq!(order, KEYS.to_vec());
    }

    #[test]
    fn high_bit_maps_to_last_key() {
        let desc = FieldDescriptor::bitfield(50, &KEYS);
        let Reading::Flags(flags) = decode(&desc, &[50, 0x80]).unwrap() else {
            panic!("expected flags");
        };
        assert_eq!(flags.get("h"), Some(true));
        assert_eq!(flags.iter().filter(|(_, v)| *v).count(), 1);
    }

    #[test]
    fn two_byte_int_is_low_byte_first() {
        let desc = FieldDescriptor::uint16(53);
        assert_eq!(decode(&desc, &[53, 0x2C, 0x01]).unwrap(), Reading::Int(300));
    }

    #[test]
    fn one_byte_int() {
        let desc = FieldDescriptor::uint8(52);
        assert_eq!(decode(&desc, &[52, 255]).unwrap(), Reading::Int(255));
    }

    #[test]
    fn scaled_float_has_one_fractional_digit() {
        let desc = FieldDescriptor::scaled(24);
        assert_eq!(decode(&desc, &[24, 0x7B, 0x00]).unwrap(), Reading::Float(12.3));
        assert_eq!(
            decode(&desc, &[24, 0xBE, 0x04]).unwrap(),
            Reading::Float(121.4)
        );
    }

    #[test]
    fn address_mismatch_is_protocol_error_for_every_format() {
        let descs = [
            FieldDescriptor::bitfield(50, &KEYS),
            FieldDescriptor::uint8(52),
            FieldDescriptor::uint16(53),
            FieldDescriptor::scaled(24),
        ];
        for desc in descs {
            let mut report = vec![desc.address.wrapping_add(1)];
            report.extend(std::iter::repeat(0).take(usize::from(desc.width)));
            assert!(
                matches!(decode(&desc, &report), Err(UpsError::Protocol(_))),
                "{desc:?}"
            );
        }
    }

    #[test]
    fn short_report_is_protocol_error() {
        let desc = FieldDescriptor::uint16(53);
        assert!(matches!(
            decode(&desc, &[53, 0x2C]),
            Err(UpsError::Protocol(_))
        ));
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let desc = FieldDescriptor::uint8(2);
        assert_eq!(decode(&desc, &[2, 60, 0xFF]).unwrap(), Reading::Int(60));
    }

    #[test]
    fn flags_serialize_as_object() {
        let desc = FieldDescriptor::bitfield(50, &KEYS);
        let reading = decode(&desc, &[50, 0b0000_0011]).unwrap();
        let json = serde_json::to_value(&reading).unwrap();
        assert_eq!(json["a"], true);
        assert_eq!(json["c"], false);
        assert_eq!(serde_json::to_value(Reading::Int(7)).unwrap(), 7);
    }

    #[test]
    fn flags_serialize_in_name_order() {
        let desc = FieldDescriptor::bitfield(50, &crate::STATUS_FLAGS);
        let reading = decode(&desc, &[50, 0b0000_0010]).unwrap();
        let json = serde_json::to_string(&reading).unwrap();
        let ac = json.find("\"ac present\"").unwrap();
        let charging = json.find("\"charging\"").unwrap();
        let shutdown = json.find("\"shutdown imminent\"").unwrap();
        assert!(ac < charging && charging < shutdown, "{json}");
    }
}
