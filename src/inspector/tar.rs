//! Minimal reader for the tar stream embedded in a bundle
//!
//! Only the fields the inspector needs are decoded: the entry name, the size
//! and the directory type flag. Checksums, ustar prefixes and long-name
//! extensions are ignored.

use std::io::{self, Read};

/// Tar block size; headers and payload padding are aligned to it
pub(crate) const BLOCK_LEN: usize = 512;

const NAME_LEN: usize = 100;
const SIZE_OFFSET: usize = 124;
const SIZE_LEN: usize = 12;
const TYPEFLAG_OFFSET: usize = 156;
const DIRECTORY_TYPE: u8 = b'5';

/// Decoded header of one tar entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct EntryHeader {
    pub name: String,
    pub size: u64,
    pub is_dir: bool,
}

/// Read the next header
///
/// Returns `Ok(None)` at the end of the archive: a clean end of stream on a
/// block boundary, a block whose first byte is zero, or an empty or
/// non-ASCII name. A stream that ends inside a header is an error.
pub(crate) fn read_header<R: Read + ?Sized>(r: &mut R) -> io::Result<Option<EntryHeader>> {
    let mut block = [0u8; BLOCK_LEN];
    if !read_exact_or_eof(r, &mut block)? {
        return Ok(None);
    }
    if block[0] == 0 {
        return Ok(None);
    }

    let name = cstr_bytes(&block[..NAME_LEN]);
    if name.is_empty() || !name.is_ascii() {
        return Ok(None);
    }
    // ASCII checked above
    let name = String::from_utf8_lossy(name).into_owned();

    let size = parse_size_octal(&block[SIZE_OFFSET..SIZE_OFFSET + SIZE_LEN])?;

    Ok(Some(EntryHeader {
        name,
        size,
        is_dir: block[TYPEFLAG_OFFSET] == DIRECTORY_TYPE,
    }))
}

/// Read exactly `size` payload bytes
pub(crate) fn read_payload<R: Read + ?Sized>(r: &mut R, size: u64) -> io::Result<Vec<u8>> {
    let len = usize::try_from(size)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "tar entry too large"))?;
    let mut payload = vec![0u8; len];
    r.read_exact(&mut payload)?;
    Ok(payload)
}

/// Discard exactly `n` bytes without buffering them
pub(crate) fn skip<R: Read + ?Sized>(r: &mut R, n: u64) -> io::Result<()> {
    if n == 0 {
        return Ok(());
    }
    let copied = io::copy(&mut r.take(n), &mut io::sink())?;
    if copied < n {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "tar truncated payload",
        ));
    }
    Ok(())
}

/// Bytes of padding after a payload of `size` bytes
pub(crate) fn padding(size: u64) -> u64 {
    let rem = size % BLOCK_LEN as u64;
    if rem == 0 { 0 } else { BLOCK_LEN as u64 - rem }
}

fn cstr_bytes(field: &[u8]) -> &[u8] {
    match field.iter().position(|&b| b == 0) {
        Some(i) => &field[..i],
        None => field,
    }
}

/// Octal size field, NUL/space padded on either side; empty means zero
fn parse_size_octal(field: &[u8]) -> io::Result<u64> {
    let digits = cstr_bytes(field).trim_ascii();
    let mut value: u64 = 0;
    for &d in digits {
        if !(b'0'..=b'7').contains(&d) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "tar size field is not octal",
            ));
        }
        value = value
            .checked_mul(8)
            .and_then(|v| v.checked_add(u64::from(d - b'0')))
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "tar size overflow"))?;
    }
    Ok(value)
}

/// Fill `dst`; `Ok(false)` on a clean end of stream before the first byte
fn read_exact_or_eof<R: Read + ?Sized>(r: &mut R, dst: &mut [u8]) -> io::Result<bool> {
    let mut off = 0;
    while off < dst.len() {
        let n = match r.read(&mut dst[off..]) {
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        if n == 0 {
            if off == 0 {
                return Ok(false);
            }
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "tar truncated header",
            ));
        }
        off += n;
    }
    Ok(true)
}
