// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Minimal support of the numpy `.npy` format for 2D `f32` arrays.
//!
//! Only what is needed to exchange depth maps with python tools:
//! little endian `f32`, C (row major) order, two dimensions.
//! Format description: <https://numpy.org/doc/stable/reference/generated/numpy.lib.format.html>

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use nalgebra::DMatrix;
use std::io::{self, Cursor, Read, Write};

use crate::error::{Error, Result};

/// Magic string at the start of every `.npy` file.
pub const MAGIC: &[u8] = b"\x93NUMPY";

/// Total size of the preamble (magic, version, header) is a multiple of this.
const ALIGNMENT: usize = 64;

/// Write a matrix in `.npy` format 1.0.
pub fn write<W: Write>(writer: &mut W, mat: &DMatrix<f32>) -> io::Result<()> {
    let (nrows, ncols) = mat.shape();
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        nrows, ncols
    );
    // magic + version + header length + header + '\n'
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(std::iter::repeat(' ').take(padding));
    header.push('\n');
    let header_len = u16::try_from(header.len())
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "npy header too long"))?;

    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_u16::<LittleEndian>(header_len)?;
    writer.write_all(header.as_bytes())?;
    // Transposition turns the column major storage into row major.
    for x in mat.transpose().iter() {
        writer.write_f32::<LittleEndian>(*x)?;
    }
    Ok(())
}

/// Encode a matrix into `.npy` bytes.
pub fn to_bytes(mat: &DMatrix<f32>) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::with_capacity(ALIGNMENT + 4 * mat.len());
    write(&mut buffer, mat)?;
    Ok(buffer)
}

/// Decode a 2D `f32` matrix from `.npy` bytes.
pub fn read(bytes: &[u8]) -> Result<DMatrix<f32>> {
    let invalid = |msg: &str| Error::Archive(format!("npy: {}", msg));
    if bytes.len() < MAGIC.len() + 2 || &bytes[..MAGIC.len()] != MAGIC {
        return Err(invalid("missing magic string"));
    }
    let mut cursor = Cursor::new(&bytes[MAGIC.len()..]);
    let major = cursor.read_u8().map_err(|_| invalid("truncated"))?;
    let _minor = cursor.read_u8().map_err(|_| invalid("truncated"))?;
    let header_len = match major {
        1 => cursor.read_u16::<LittleEndian>().map(usize::from),
        2 | 3 => cursor.read_u32::<LittleEndian>().map(|l| l as usize),
        _ => return Err(invalid("unsupported version")),
    }
    .map_err(|_| invalid("truncated"))?;

    if header_len > remaining(&cursor) {
        return Err(invalid("truncated header"));
    }
    let mut header = vec![0; header_len];
    cursor
        .read_exact(&mut header)
        .map_err(|_| invalid("truncated header"))?;
    let header = std::str::from_utf8(&header).map_err(|_| invalid("non utf8 header"))?;
    let (nrows, ncols) = parse::header(header).map_err(|e| invalid(&e))?;

    // The shape comes from the file, check it against the data before allocating.
    let data_len = nrows
        .checked_mul(ncols)
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| invalid("shape too large"))?;
    if data_len != remaining(&cursor) {
        return Err(invalid("data length does not match shape"));
    }
    let mut data = vec![0.0; nrows * ncols];
    cursor
        .read_f32_into::<LittleEndian>(&mut data)
        .map_err(|_| invalid("truncated data"))?;
    Ok(DMatrix::from_row_slice(nrows, ncols, &data))
}

/// Number of bytes not read yet.
fn remaining(cursor: &Cursor<&[u8]>) -> usize {
    let len = cursor.get_ref().len();
    len.saturating_sub(usize::try_from(cursor.position()).unwrap_or(len))
}

/// Parse the python dictionary describing the array.
mod parse {
    use nom::{
        branch::alt,
        bytes::complete::{tag, take_until},
        character::complete::{char, digit1, multispace0},
        combinator::{map, map_res, opt, value},
        multi::separated_list0,
        sequence::{delimited, separated_pair, terminated},
        IResult,
    };

    #[derive(Clone, PartialEq, Debug)]
    enum Value<'a> {
        Str(&'a str),
        Bool(bool),
        Shape(Vec<usize>),
    }

    /// Check the header and return the shape `(nrows, ncols)`.
    pub fn header(input: &str) -> Result<(usize, usize), String> {
        let (_, entries) = dict(input).map_err(|e| format!("bad header: {}", e))?;
        let mut shape = None;
        for (key, val) in entries {
            match (key, val) {
                ("descr", Value::Str("<f4")) => (),
                ("descr", other) => return Err(format!("unsupported descr {:?}", other)),
                ("fortran_order", Value::Bool(false)) => (),
                ("fortran_order", _) => return Err("fortran order not supported".to_string()),
                ("shape", Value::Shape(dims)) => match dims.as_slice() {
                    [nrows, ncols] => shape = Some((*nrows, *ncols)),
                    _ => return Err(format!("expected 2 dimensions, got {:?}", dims)),
                },
                _ => (),
            }
        }
        shape.ok_or_else(|| "no shape in header".to_string())
    }

    // nom parsers #############################################################

    fn dict(input: &str) -> IResult<&str, Vec<(&str, Value)>> {
        delimited(
            ws(char('{')),
            terminated(separated_list0(ws(char(',')), entry), opt(ws(char(',')))),
            ws(char('}')),
        )(input)
    }

    fn entry(input: &str) -> IResult<&str, (&str, Value)> {
        separated_pair(ws(quoted), char(':'), ws(entry_value))(input)
    }

    fn entry_value(input: &str) -> IResult<&str, Value> {
        alt((
            map(quoted, Value::Str),
            value(Value::Bool(true), tag("True")),
            value(Value::Bool(false), tag("False")),
            map(shape, Value::Shape),
        ))(input)
    }

    fn quoted(input: &str) -> IResult<&str, &str> {
        delimited(char('\''), take_until("'"), char('\''))(input)
    }

    // Tuple of dimensions, like `(375, 1242)` or `(3,)`.
    fn shape(input: &str) -> IResult<&str, Vec<usize>> {
        delimited(
            char('('),
            terminated(
                separated_list0(ws(char(',')), ws(dimension)),
                opt(ws(char(','))),
            ),
            char(')'),
        )(input)
    }

    fn dimension(input: &str) -> IResult<&str, usize> {
        map_res(digit1, str::parse)(input)
    }

    fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
    where
        F: FnMut(&'a str) -> IResult<&'a str, O>,
    {
        delimited(multispace0, inner, multispace0)
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn numpy_header() {
            let h = "{'descr': '<f4', 'fortran_order': False, 'shape': (375, 1242), }      \n";
            assert_eq!(Ok((375, 1242)), header(h));
        }

        #[test]
        fn keys_in_any_order() {
            let h = "{'shape': (2, 3), 'fortran_order': False, 'descr': '<f4'}";
            assert_eq!(Ok((2, 3)), header(h));
        }

        #[test]
        fn wrong_dtype() {
            let h = "{'descr': '<f8', 'fortran_order': False, 'shape': (2, 3), }";
            assert!(header(h).is_err());
        }

        #[test]
        fn one_dimension() {
            let h = "{'descr': '<f4', 'fortran_order': False, 'shape': (6,), }";
            assert!(header(h).is_err());
        }
    }
}

// TESTS #############################################################
