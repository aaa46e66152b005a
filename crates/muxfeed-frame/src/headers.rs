use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{FrameError, Result};

const MAX_HEADER_COUNT: usize = u16::MAX as usize;
const MAX_FIELD_LEN: usize = u16::MAX as usize;

/// Ordered name/value pairs carried by an OPEN frame.
///
/// Names are lowercase and unique. A value may hold several values
/// separated by NUL bytes.
///
/// Wire format:
/// ```text
/// count (2B LE) | { name_len (2B LE) | name | value_len (2B LE) | value } * count
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    entries: Vec<(String, String)>,
}

impl HeaderBlock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a header. Rejects invalid names and duplicates.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Result<()> {
        let name = name.into();
        let value = value.into();
        validate_name(&name)?;
        if value.len() > MAX_FIELD_LEN {
            return Err(FrameError::InvalidHeaderBlock(format!(
                "value of '{name}' too long ({} bytes)",
                value.len()
            )));
        }
        if self.get(&name).is_some() {
            return Err(FrameError::InvalidHeaderBlock(format!(
                "duplicate header '{name}'"
            )));
        }
        if self.entries.len() >= MAX_HEADER_COUNT {
            return Err(FrameError::InvalidHeaderBlock(
                "too many headers".to_string(),
            ));
        }
        self.entries.push((name, value));
        Ok(())
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Result<Self> {
        self.insert(name, value)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serialize into `dst`.
    pub fn encode(&self, dst: &mut BytesMut) {
        dst.put_u16_le(self.entries.len() as u16);
        for (name, value) in &self.entries {
            dst.put_u16_le(name.len() as u16);
            dst.put_slice(name.as_bytes());
            dst.put_u16_le(value.len() as u16);
            dst.put_slice(value.as_bytes());
        }
    }

    /// Parse a complete header block payload.
    pub fn decode(mut src: Bytes) -> Result<Self> {
        let count = read_u16(&mut src, "header count")?;
        let mut block = HeaderBlock::new();
        for _ in 0..count {
            let name = read_field(&mut src, "header name")?;
            let value = read_field(&mut src, "header value")?;
            block.insert(name, value)?;
        }
        if src.has_remaining() {
            return Err(FrameError::InvalidHeaderBlock(format!(
                "{} trailing bytes",
                src.remaining()
            )));
        }
        Ok(block)
    }
}

fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_FIELD_LEN {
        return Err(FrameError::InvalidHeaderBlock(format!(
            "invalid header name length: {}",
            name.len()
        )));
    }
    let valid = name
        .bytes()
        .all(|b| b.is_ascii_graphic() && !b.is_ascii_uppercase() && b != b':');
    if !valid {
        return Err(FrameError::InvalidHeaderBlock(format!(
            "invalid header name '{}'",
            name.escape_default()
        )));
    }
    Ok(())
}

fn read_u16(src: &mut Bytes, what: &str) -> Result<u16> {
    if src.remaining() < 2 {
        return Err(FrameError::InvalidHeaderBlock(format!("truncated {what}")));
    }
    Ok(src.get_u16_le())
}

fn read_field(src: &mut Bytes, what: &str) -> Result<String> {
    let len = read_u16(src, what)? as usize;
    if src.remaining() < len {
        return Err(FrameError::InvalidHeaderBlock(format!("truncated {what}")));
    }
    let raw = src.split_to(len);
    String::from_utf8(raw.to_vec())
        .map_err(|_| FrameError::InvalidHeaderBlock(format!("{what} is not utf-8")))
}
