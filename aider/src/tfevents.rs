//! Scalar extraction from TensorBoard event files.
//!
//! Event files are TFRecord-framed protobuf `Event` messages. Only the
//! handful of fields behind classic scalar summaries are decoded here:
//! `Event.step`, `Summary.Value.tag` and `Summary.Value.simple_value`;
//! everything else is skipped by wire type. Record checksums are not
//! verified.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TfEventsError {
    #[error("failed to read event file: {0}")]
    Io(#[from] std::io::Error),
    #[error("truncated record at byte {0}")]
    Truncated(usize),
}

/// Ordered (step, value) series for one scalar tag, in file order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScalarSeries {
    pub steps: Vec<i64>,
    pub values: Vec<f32>,
}

/// Reads every scalar summary in a TensorBoard event file, keyed by tag.
pub fn read_scalars(path: &Path) -> Result<BTreeMap<String, ScalarSeries>, TfEventsError> {
    let bytes = fs::read(path)?;
    let mut scalars = BTreeMap::new();

    // TFRecord frame: u64 LE payload length, u32 length CRC, payload,
    // u32 payload CRC.
    let mut offset = 0usize;
    while offset < bytes.len() {
        let header = bytes
            .get(offset..offset + 12)
            .ok_or(TfEventsError::Truncated(offset))?;
        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&header[..8]);
        let len = u64::from_le_bytes(len_bytes) as usize;

        let data_start = offset + 12;
        let data_end = data_start
            .checked_add(len)
            .ok_or(TfEventsError::Truncated(offset))?;
        if data_end + 4 > bytes.len() {
            return Err(TfEventsError::Truncated(offset));
        }
        decode_event(&bytes[data_start..data_end], &mut scalars);
        offset = data_end + 4;
    }
    Ok(scalars)
}

/// `Event`: field 2 = step (varint), field 5 = summary (message).
/// A malformed payload simply contributes nothing.
fn decode_event(buf: &[u8], scalars: &mut BTreeMap<String, ScalarSeries>) {
    let mut reader = ProtoReader::new(buf);
    let mut step = 0i64;
    let mut summary: Option<&[u8]> = None;
    while let Some((field, wire)) = reader.key() {
        match (field, wire) {
            (2, 0) => match reader.varint() {
                Some(value) => step = value as i64,
                None => return,
            },
            (5, 2) => match reader.bytes() {
                Some(payload) => summary = Some(payload),
                None => return,
            },
            _ => {
                if reader.skip(wire).is_none() {
                    return;
                }
            }
        }
    }
    if let Some(summary) = summary {
        decode_summary(summary, step, scalars);
    }
}

/// `Summary`: field 1 = repeated Value (message).
fn decode_summary(buf: &[u8], step: i64, scalars: &mut BTreeMap<String, ScalarSeries>) {
    let mut reader = ProtoReader::new(buf);
    while let Some((field, wire)) = reader.key() {
        match (field, wire) {
            (1, 2) => match reader.bytes() {
                Some(value) => decode_value(value, step, scalars),
                None => return,
            },
            _ => {
                if reader.skip(wire).is_none() {
                    return;
                }
            }
        }
    }
}

/// `Summary.Value`: field 1 = tag (string), field 2 = simple_value (float).
fn decode_value(buf: &[u8], step: i64, scalars: &mut BTreeMap<String, ScalarSeries>) {
    let mut reader = ProtoReader::new(buf);
    let mut tag: Option<String> = None;
    let mut simple_value: Option<f32> = None;
    while let Some((field, wire)) = reader.key() {
        match (field, wire) {
            (1, 2) => match reader.bytes() {
                Some(raw) => tag = std::str::from_utf8(raw).ok().map(str::to_owned),
                None => return,
            },
            (2, 5) => match reader.fixed32() {
                Some(raw) => simple_value = Some(f32::from_le_bytes(raw)),
                None => return,
            },
            _ => {
                if reader.skip(wire).is_none() {
                    return;
                }
            }
        }
    }
    if let (Some(tag), Some(value)) = (tag, simple_value) {
        let series = scalars.entry(tag).or_default();
        series.steps.push(step);
        series.values.push(value);
    }
}

/// Cursor over one protobuf message; every accessor returns `None` on
/// malformed or truncated input.
struct ProtoReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ProtoReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    /// Next field key, or `None` at end of message.
    fn key(&mut self) -> Option<(u64, u8)> {
        if self.pos >= self.buf.len() {
            return None;
        }
        let key = self.varint()?;
        Some((key >> 3, (key & 7) as u8))
    }

    fn varint(&mut self) -> Option<u64> {
        let mut out = 0u64;
        let mut shift = 0u32;
        loop {
            let byte = *self.buf.get(self.pos)?;
            self.pos += 1;
            out |= u64::from(byte & 0x7F) << shift;
            if byte & 0x80 == 0 {
                return Some(out);
            }
            shift += 7;
            if shift >= 64 {
                return None;
            }
        }
    }

    fn bytes(&mut self) -> Option<&'a [u8]> {
        let len = self.varint()? as usize;
        let slice = self.buf.get(self.pos..self.pos.checked_add(len)?)?;
        self.pos += len;
        Some(slice)
    }

    fn fixed32(&mut self) -> Option<[u8; 4]> {
        let slice = self.buf.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        let mut out = [0u8; 4];
        out.copy_from_slice(slice);
        Some(out)
    }

    fn skip(&mut self, wire: u8) -> Option<()> {
        match wire {
            0 => {
                self.varint()?;
            }
            1 => {
                self.buf.get(self.pos..self.pos + 8)?;
                self.pos += 8;
            }
            2 => {
                self.bytes()?;
            }
            5 => {
                self.fixed32()?;
            }
            _ => return None,
        }
        Some(())
    }
}
