use gimli::{EndianSlice, Endianity, RunTimeEndian};

use crate::analysis::image::AttrValue;
use crate::error::DecodeError;

/// Decodes an address or byte offset out of one attribute value.
///
/// Only integer forms, `exprloc` and the three sized block forms are understood.
pub fn decode_integer(value: &AttrValue, endian: RunTimeEndian) -> Result<u64, DecodeError> {
    match value {
        AttrValue::Udata(value) | AttrValue::Address(value) => Ok(*value),
        AttrValue::Sdata(value) => u64::try_from(*value).map_err(|_| DecodeError::Negative(*value)),
        AttrValue::Exprloc(raw) => decode_exprloc(raw, endian),
        AttrValue::Block1(raw) => decode_block(raw, 1, endian),
        AttrValue::Block2(raw) => decode_block(raw, 2, endian),
        AttrValue::Block4(raw) => decode_block(raw, 4, endian),
        AttrValue::Flag(_)
        | AttrValue::String(_)
        | AttrValue::Ref(_)
        | AttrValue::Unsupported(_) => Err(DecodeError::UnsupportedEncoding {
            form: value.form_name(),
        }),
    }
}

fn decode_exprloc(raw: &[u8], endian: RunTimeEndian) -> Result<u64, DecodeError> {
    let mut reader = EndianSlice::new(raw, endian);
    let length =
        gimli::leb128::read::unsigned(&mut reader).map_err(|_| DecodeError::Truncated)?;
    let length = usize::try_from(length).map_err(|_| DecodeError::Truncated)?;
    let expression = reader.slice().get(..length).ok_or(DecodeError::Truncated)?;

    // A single `DW_OP_addr` carries its operand right after the opcode.
    let operand = match expression.split_first() {
        Some((&opcode, operand)) if opcode == gimli::DW_OP_addr.0 => operand,
        _ => expression,
    };
    read_unsigned(operand, endian)
}

fn decode_block(raw: &[u8], prefix_width: usize, endian: RunTimeEndian) -> Result<u64, DecodeError> {
    let prefix = raw.get(..prefix_width).ok_or(DecodeError::Truncated)?;
    let length = usize::try_from(read_unsigned(prefix, endian)?)
        .map_err(|_| DecodeError::Truncated)?;

    // Block values take in the byte after the declared length as well.
    let end = prefix_width
        .saturating_add(length)
        .saturating_add(1)
        .min(raw.len());
    read_unsigned(&raw[prefix_width..end], endian)
}

fn read_unsigned(bytes: &[u8], endian: RunTimeEndian) -> Result<u64, DecodeError> {
    if bytes.len() > 8 {
        return Err(DecodeError::IntegerTooWide { len: bytes.len() });
    }
    let accumulate = |acc: u64, byte: &u8| (acc << 8) | u64::from(*byte);
    let value = if endian.is_little_endian() {
        bytes.iter().rev().fold(0, accumulate)
    } else {
        bytes.iter().fold(0, accumulate)
    };
    Ok(value)
}
