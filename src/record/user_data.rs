// src/record/user_data.rs
// Ordered (label, value) sequence with nine tagged value shapes. The wire
// encoding mirrors Python's struct format characters so the client can
// unpack values generically; tuples are prefixed with their arity digit.

use crate::error::{TraceError, TraceResult};
use crate::stream::ByteStream;

/// The nine value shapes a record entry may carry.
///
/// Two or three floats are usually points, four floats are color values
/// (the alpha channel is currently discarded by the client).
#[derive(Debug, Clone, PartialEq)]
pub enum UserValue {
    Bool(bool),
    F32(f32),
    F64(f64),
    I32(i32),
    I32x2(i32, i32),
    F32x2(f32, f32),
    I32x3(i32, i32, i32),
    F32x3(f32, f32, f32),
    F32x4(f32, f32, f32, f32),
    Str(String),
}

impl From<bool> for UserValue {
    fn from(v: bool) -> Self {
        UserValue::Bool(v)
    }
}

impl From<f32> for UserValue {
    fn from(v: f32) -> Self {
        UserValue::F32(v)
    }
}

impl From<f64> for UserValue {
    fn from(v: f64) -> Self {
        UserValue::F64(v)
    }
}

impl From<i32> for UserValue {
    fn from(v: i32) -> Self {
        UserValue::I32(v)
    }
}

impl From<(i32, i32)> for UserValue {
    fn from((a, b): (i32, i32)) -> Self {
        UserValue::I32x2(a, b)
    }
}

impl From<(f32, f32)> for UserValue {
    fn from((a, b): (f32, f32)) -> Self {
        UserValue::F32x2(a, b)
    }
}

impl From<(i32, i32, i32)> for UserValue {
    fn from((a, b, c): (i32, i32, i32)) -> Self {
        UserValue::I32x3(a, b, c)
    }
}

impl From<(f32, f32, f32)> for UserValue {
    fn from((a, b, c): (f32, f32, f32)) -> Self {
        UserValue::F32x3(a, b, c)
    }
}

impl From<(f32, f32, f32, f32)> for UserValue {
    fn from((a, b, c, d): (f32, f32, f32, f32)) -> Self {
        UserValue::F32x4(a, b, c, d)
    }
}

impl From<String> for UserValue {
    fn from(v: String) -> Self {
        UserValue::Str(v)
    }
}

impl From<&str> for UserValue {
    fn from(v: &str) -> Self {
        UserValue::Str(v.to_owned())
    }
}

impl UserValue {
    fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()> {
        match *self {
            UserValue::Bool(v) => {
                stream.write_u8(b'?')?;
                stream.write_bool(v)
            }
            UserValue::F32(v) => {
                stream.write_u8(b'f')?;
                stream.write_f32(v)
            }
            UserValue::F64(v) => {
                stream.write_u8(b'd')?;
                stream.write_f64(v)
            }
            UserValue::I32(v) => {
                stream.write_u8(b'i')?;
                stream.write_i32(v)
            }
            UserValue::I32x2(a, b) => {
                stream.write_u8(b'2')?;
                stream.write_u8(b'i')?;
                stream.write_i32(a)?;
                stream.write_i32(b)
            }
            UserValue::F32x2(a, b) => {
                stream.write_u8(b'2')?;
                stream.write_u8(b'f')?;
                stream.write_f32(a)?;
                stream.write_f32(b)
            }
            UserValue::I32x3(a, b, c) => {
                stream.write_u8(b'3')?;
                stream.write_u8(b'i')?;
                stream.write_i32(a)?;
                stream.write_i32(b)?;
                stream.write_i32(c)
            }
            UserValue::F32x3(a, b, c) => {
                stream.write_u8(b'3')?;
                stream.write_u8(b'f')?;
                stream.write_f32(a)?;
                stream.write_f32(b)?;
                stream.write_f32(c)
            }
            UserValue::F32x4(a, b, c, d) => {
                stream.write_u8(b'4')?;
                stream.write_u8(b'f')?;
                stream.write_f32(a)?;
                stream.write_f32(b)?;
                stream.write_f32(c)?;
                stream.write_f32(d)
            }
            UserValue::Str(ref v) => {
                stream.write_u8(b's')?;
                stream.write_string(v)
            }
        }
    }

    fn deserialize(stream: &mut dyn ByteStream) -> TraceResult<UserValue> {
        let code = stream.read_u8()?;
        Ok(match code {
            b'?' => UserValue::Bool(stream.read_bool()?),
            b'f' => UserValue::F32(stream.read_f32()?),
            b'd' => UserValue::F64(stream.read_f64()?),
            b'i' => UserValue::I32(stream.read_i32()?),
            b's' => UserValue::Str(stream.read_string()?),
            b'2' | b'3' | b'4' => {
                let arity = (code - b'0') as usize;
                let elem = stream.read_u8()?;
                match (arity, elem) {
                    (2, b'i') => UserValue::I32x2(stream.read_i32()?, stream.read_i32()?),
                    (2, b'f') => UserValue::F32x2(stream.read_f32()?, stream.read_f32()?),
                    (3, b'i') => {
                        UserValue::I32x3(stream.read_i32()?, stream.read_i32()?, stream.read_i32()?)
                    }
                    (3, b'f') => {
                        UserValue::F32x3(stream.read_f32()?, stream.read_f32()?, stream.read_f32()?)
                    }
                    (4, b'f') => UserValue::F32x4(
                        stream.read_f32()?,
                        stream.read_f32()?,
                        stream.read_f32()?,
                        stream.read_f32()?,
                    ),
                    _ => {
                        return Err(TraceError::protocol(format!(
                            "unknown tuple format {arity}{}",
                            elem as char
                        )))
                    }
                }
            }
            _ => {
                return Err(TraceError::protocol(format!(
                    "unknown value format character '{}'",
                    code as char
                )))
            }
        })
    }
}

/// Ordered sequence of labeled values. Insertion order is preserved and
/// duplicate labels are allowed; the client groups them by label.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserData {
    entries: Vec<(String, UserValue)>,
}

impl UserData {
    pub fn add(&mut self, label: impl Into<String>, value: impl Into<UserValue>) {
        self.entries.push((label.into(), value.into()));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, UserValue)> {
        self.entries.iter()
    }

    pub fn serialize(&self, stream: &mut dyn ByteStream) -> TraceResult<()> {
        stream.write_u32(self.entries.len() as u32)?;
        for (label, value) in &self.entries {
            stream.write_string(label)?;
            value.serialize(stream)?;
        }
        Ok(())
    }

    /// Reads exactly the entry count announced by the writer; there is no
    /// end marker on the wire.
    pub fn deserialize(stream: &mut dyn ByteStream) -> TraceResult<UserData> {
        let count = stream.read_u32()?;
        let mut entries = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let label = stream.read_string()?;
            let value = UserValue::deserialize(stream)?;
            entries.push((label, value));
        }
        Ok(UserData { entries })
    }
}
