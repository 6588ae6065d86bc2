//! # Companion Message Dictionaries
//!
//! Messages between the watch and its companion are small ordered
//! dictionaries of tagged tuples. On the wire:
//!
//! ```text
//! count: u8
//! count x {
//!     key:    u32 (LE)
//!     type:   u8   0 = byte array, 1 = C string, 2 = unsigned, 3 = signed
//!     length: u16 (LE)
//!     data:   [u8; length]
//! }
//! ```
//!
//! Integers are 1, 2 or 4 bytes little-endian. C strings include their NUL
//! terminator in `length`. Tuple order is preserved in both directions.

use thiserror::Error;

const HEADER_LEN: usize = 1;
const TUPLE_HEADER_LEN: usize = 4 + 1 + 2;

/// Errors raised while encoding or decoding a dictionary
#[derive(Error, Debug, PartialEq, Eq)]
pub enum DictionaryError {
    #[error("dictionary truncated at byte {0}")]
    Truncated(usize),

    #[error("key {key}: unknown tuple type {kind}")]
    UnknownType { key: u32, kind: u8 },

    #[error("key {key}: integer of {width} bytes")]
    IntegerWidth { key: u32, width: u16 },

    #[error("key {0}: C string without NUL terminator")]
    MissingNul(u32),

    #[error("key {0}: C string is not UTF-8")]
    InvalidUtf8(u32),

    #[error("{0} tuples do not fit a one-byte count")]
    TooManyTuples(usize),

    #[error("key {0}: value longer than 65535 bytes")]
    ValueTooLong(u32),

    #[error("{0} unexpected bytes after last tuple")]
    TrailingBytes(usize),
}

/// Reason codes reported by the platform's message service.
///
/// Inbound drops and outbound failures carry one of these.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MessageResult {
    Ok,
    SendTimeout,
    SendRejected,
    NotConnected,
    AppNotRunning,
    InvalidArgs,
    Busy,
    BufferOverflow,
    AlreadyReleased,
    CallbackAlreadyRegistered,
    CallbackNotRegistered,
    OutOfMemory,
    Closed,
    InternalError,
}

impl MessageResult {
    /// Numeric code as used by the platform.
    pub fn code(self) -> u32 {
        match self {
            MessageResult::Ok => 0,
            MessageResult::SendTimeout => 1 << 1,
            MessageResult::SendRejected => 1 << 2,
            MessageResult::NotConnected => 1 << 3,
            MessageResult::AppNotRunning => 1 << 4,
            MessageResult::InvalidArgs => 1 << 5,
            MessageResult::Busy => 1 << 6,
            MessageResult::BufferOverflow => 1 << 7,
            MessageResult::AlreadyReleased => 1 << 9,
            MessageResult::CallbackAlreadyRegistered => 1 << 10,
            MessageResult::CallbackNotRegistered => 1 << 11,
            MessageResult::OutOfMemory => 1 << 12,
            MessageResult::Closed => 1 << 13,
            MessageResult::InternalError => 1 << 14,
        }
    }
}

/// A tuple's payload
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TupleValue {
    Bytes(Vec<u8>),
    CString(String),
    Uint(u32),
    Int(i32),
}

impl TupleValue {
    fn kind(&self) -> u8 {
        match self {
            TupleValue::Bytes(_) => 0,
            TupleValue::CString(_) => 1,
            TupleValue::Uint(_) => 2,
            TupleValue::Int(_) => 3,
        }
    }

    /// Integer view of the value; unsigned values above `i32::MAX` have none
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            TupleValue::Int(v) => Some(*v),
            TupleValue::Uint(v) => i32::try_from(*v).ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            TupleValue::CString(s) => Some(s),
            _ => None,
        }
    }
}

/// One entry of a dictionary
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tuple {
    pub key: u32,
    pub value: TupleValue,
}

/// Ordered sequence of tuples
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Dictionary {
    tuples: Vec<Tuple>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a tuple, keeping insertion order.
    pub fn push(&mut self, key: u32, value: TupleValue) -> &mut Self {
        self.tuples.push(Tuple { key, value });
        self
    }

    pub fn len(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tuples.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Tuple> {
        self.tuples.iter()
    }

    /// First tuple with the given key.
    pub fn find(&self, key: u32) -> Option<&Tuple> {
        self.tuples.iter().find(|t| t.key == key)
    }

    /// Encoded size in bytes.
    pub fn encoded_len(&self) -> usize {
        HEADER_LEN
            + self
                .tuples
                .iter()
                .map(|t| TUPLE_HEADER_LEN + value_len(&t.value))
                .sum::<usize>()
    }

    pub fn encode(&self) -> Result<Vec<u8>, DictionaryError> {
        let count = u8::try_from(self.tuples.len())
            .map_err(|_| DictionaryError::TooManyTuples(self.tuples.len()))?;

        let mut out = Vec::with_capacity(self.encoded_len());
        out.push(count);
        for tuple in &self.tuples {
            let len = u16::try_from(value_len(&tuple.value))
                .map_err(|_| DictionaryError::ValueTooLong(tuple.key))?;
            out.extend_from_slice(&tuple.key.to_le_bytes());
            out.push(tuple.value.kind());
            out.extend_from_slice(&len.to_le_bytes());
            match &tuple.value {
                TupleValue::Bytes(b) => out.extend_from_slice(b),
                TupleValue::CString(s) => {
                    out.extend_from_slice(s.as_bytes());
                    out.push(0);
                }
                TupleValue::Uint(v) => out.extend_from_slice(&v.to_le_bytes()),
                TupleValue::Int(v) => out.extend_from_slice(&v.to_le_bytes()),
            }
        }
        Ok(out)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, DictionaryError> {
        let mut reader = Reader { bytes, pos: 0 };
        let count = reader.take(HEADER_LEN)?[0] as usize;

        let mut tuples = Vec::with_capacity(count);
        for _ in 0..count {
            let header = reader.take(TUPLE_HEADER_LEN)?;
            let key = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let kind = header[4];
            let len = u16::from_le_bytes([header[5], header[6]]);
            let data = reader.take(len as usize)?;

            let value = match kind {
                0 => TupleValue::Bytes(data.to_vec()),
                1 => {
                    let (last, text) = data.split_last().ok_or(DictionaryError::MissingNul(key))?;
                    if *last != 0 {
                        return Err(DictionaryError::MissingNul(key));
                    }
                    let text =
                        std::str::from_utf8(text).map_err(|_| DictionaryError::InvalidUtf8(key))?;
                    TupleValue::CString(text.to_string())
                }
                2 => TupleValue::Uint(match *data {
                    [a] => a as u32,
                    [a, b] => u16::from_le_bytes([a, b]) as u32,
                    [a, b, c, d] => u32::from_le_bytes([a, b, c, d]),
                    _ => return Err(DictionaryError::IntegerWidth { key, width: len }),
                }),
                3 => TupleValue::Int(match *data {
                    [a] => a as i8 as i32,
                    [a, b] => i16::from_le_bytes([a, b]) as i32,
                    [a, b, c, d] => i32::from_le_bytes([a, b, c, d]),
                    _ => return Err(DictionaryError::IntegerWidth { key, width: len }),
                }),
                kind => return Err(DictionaryError::UnknownType { key, kind }),
            };
            tuples.push(Tuple { key, value });
        }

        let rest = bytes.len() - reader.pos;
        if rest != 0 {
            return Err(DictionaryError::TrailingBytes(rest));
        }
        Ok(Dictionary { tuples })
    }
}

impl FromIterator<Tuple> for Dictionary {
    fn from_iter<I: IntoIterator<Item = Tuple>>(iter: I) -> Self {
        Dictionary {
            tuples: iter.into_iter().collect(),
        }
    }
}

fn value_len(value: &TupleValue) -> usize {
    match value {
        TupleValue::Bytes(b) => b.len(),
        TupleValue::CString(s) => s.len() + 1,
        TupleValue::Uint(_) | TupleValue::Int(_) => 4,
    }
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], DictionaryError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(DictionaryError::Truncated(self.bytes.len()))?;
        let bytes: &'a [u8] = self.bytes;
        let slice = &bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encoded_layout() {
        let mut dict = Dictionary::new();
        dict.push(1, TupleValue::Int(-2));
        let bytes = dict.encode().unwrap();
        assert_eq!(
            bytes,
            vec![1, 1, 0, 0, 0, 3, 4, 0, 0xFE, 0xFF, 0xFF, 0xFF]
        );
        assert_eq!(bytes.len(), dict.encoded_len());
    }

    #[test]
    fn test_mixed_dictionary_keeps_order() {
        let mut dict = Dictionary::new();
        dict.push(2, TupleValue::CString("fair\ngood".into()))
            .push(0, TupleValue::Int(72))
            .push(9, TupleValue::Bytes(vec![1, 2, 3]))
            .push(1, TupleValue::Uint(22));

        let decoded = Dictionary::decode(&dict.encode().unwrap()).unwrap();
        let keys: Vec<u32> = decoded.iter().map(|t| t.key).collect();
        assert_eq!(keys, vec![2, 0, 9, 1]);
        assert_eq!(decoded, dict);
    }

    #[test]
    fn test_narrow_integers_decode() {
        // int8 -5, then uint16 300
        let bytes = [2, 0, 0, 0, 0, 3, 1, 0, 0xFB, 1, 0, 0, 0, 2, 2, 0, 0x2C, 0x01];
        let dict = Dictionary::decode(&bytes).unwrap();
        assert_eq!(dict.find(0).unwrap().value, TupleValue::Int(-5));
        assert_eq!(dict.find(1).unwrap().value, TupleValue::Uint(300));
    }

    #[test]
    fn test_truncated_input() {
        let mut dict = Dictionary::new();
        dict.push(0, TupleValue::Int(1));
        let bytes = dict.encode().unwrap();
        assert!(matches!(
            Dictionary::decode(&bytes[..bytes.len() - 1]),
            Err(DictionaryError::Truncated(_))
        ));
        assert!(matches!(
            Dictionary::decode(&[]),
            Err(DictionaryError::Truncated(0))
        ));
    }

    #[test]
    fn test_bad_tuples_are_rejected() {
        let odd_width = [1, 7, 0, 0, 0, 3, 3, 0, 1, 2, 3];
        assert_eq!(
            Dictionary::decode(&odd_width),
            Err(DictionaryError::IntegerWidth { key: 7, width: 3 })
        );

        let no_nul = [1, 4, 0, 0, 0, 1, 2, 0, b'h', b'i'];
        assert_eq!(Dictionary::decode(&no_nul), Err(DictionaryError::MissingNul(4)));

        let bad_kind = [1, 4, 0, 0, 0, 9, 0, 0];
        assert_eq!(
            Dictionary::decode(&bad_kind),
            Err(DictionaryError::UnknownType { key: 4, kind: 9 })
        );

        let trailing = [0, 0xAA];
        assert_eq!(
            Dictionary::decode(&trailing),
            Err(DictionaryError::TrailingBytes(1))
        );
    }

    #[test]
    fn test_too_many_tuples() {
        let dict: Dictionary = (0..256)
            .map(|key| Tuple {
                key,
                value: TupleValue::Uint(0),
            })
            .collect();
        assert_eq!(dict.encode(), Err(DictionaryError::TooManyTuples(256)));
    }

    #[test]
    fn test_integer_views() {
        assert_eq!(TupleValue::Uint(7).as_i32(), Some(7));
        assert_eq!(TupleValue::Uint(u32::MAX).as_i32(), None);
        assert_eq!(TupleValue::CString("7".into()).as_i32(), None);
        assert_eq!(TupleValue::CString("x".into()).as_str(), Some("x"));
    }

    #[test]
    fn test_result_codes() {
        assert_eq!(MessageResult::Ok.code(), 0);
        assert_eq!(MessageResult::BufferOverflow.code(), 128);
        assert_eq!(MessageResult::InternalError.code(), 16384);
    }
}
