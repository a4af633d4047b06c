//! Bounds-checked readers over a byte slice.
//!
//! Every read checks `remaining()` first, so a short frame becomes a
//! [`ProtocolError::Framing`] instead of a panic inside `bytes::Buf`.

use bytes::{Buf, BufMut};

use crate::error::{ProtocolError, ProtocolResult};

pub(crate) fn take_u8(buf: &mut &[u8], field: &str) -> ProtocolResult<u8> {
    if !buf.has_remaining() {
        return Err(ProtocolError::truncated(field));
    }
    Ok(buf.get_u8())
}

/// Read a big-endian u64 length and convert it to `usize`.
pub(crate) fn take_len(buf: &mut &[u8], field: &str) -> ProtocolResult<usize> {
    if buf.remaining() < 8 {
        return Err(ProtocolError::truncated(field));
    }
    let len = buf.get_u64();
    usize::try_from(len)
        .map_err(|_| ProtocolError::Framing(format!("{field} {len} does not fit in memory")))
}

pub(crate) fn take_bytes<'a>(
    buf: &mut &'a [u8],
    len: usize,
    field: &str,
) -> ProtocolResult<&'a [u8]> {
    if buf.remaining() < len {
        return Err(ProtocolError::Framing(format!(
            "{field}: need {len} bytes, have {}",
            buf.remaining()
        )));
    }
    let (head, tail) = buf.split_at(len);
    *buf = tail;
    Ok(head)
}

pub(crate) fn take_array<const N: usize>(
    buf: &mut &[u8],
    field: &str,
) -> ProtocolResult<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(take_bytes(buf, N, field)?);
    Ok(out)
}

/// Read a length-prefixed block that must end exactly at the end of `buf`.
pub(crate) fn take_exact_tail<'a>(buf: &mut &'a [u8], field: &str) -> ProtocolResult<&'a [u8]> {
    let len = take_len(buf, field)?;
    if buf.remaining() != len {
        return Err(ProtocolError::Framing(format!(
            "{field} declares {len} bytes, frame carries {}",
            buf.remaining()
        )));
    }
    take_bytes(buf, len, field)
}

pub(crate) fn put_len_prefixed(out: &mut Vec<u8>, data: &[u8]) {
    out.put_u64(data.len() as u64);
    out.put_slice(data);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_reads_are_framing_errors() {
        let mut empty: &[u8] = &[];
        assert!(matches!(take_u8(&mut empty, "tag"), Err(ProtocolError::Framing(_))));
        let mut short: &[u8] = &[0, 0, 0];
        assert!(matches!(take_len(&mut short, "len"), Err(ProtocolError::Framing(_))));
        let mut two: &[u8] = &[1, 2];
        assert!(take_array::<3>(&mut two, "arr").is_err());
    }

    #[test]
    fn exact_tail_rejects_trailing_and_missing_bytes() {
        let mut ok = Vec::new();
        put_len_prefixed(&mut ok, b"abc");
        let mut cur: &[u8] = &ok;
        assert_eq!(take_exact_tail(&mut cur, "payload").unwrap(), b"abc");

        let mut long = ok.clone();
        long.push(0);
        let mut cur: &[u8] = &long;
        assert!(take_exact_tail(&mut cur, "payload").is_err());

        let mut cur: &[u8] = &ok[..ok.len() - 1];
        assert!(take_exact_tail(&mut cur, "payload").is_err());
    }

    #[test]
    fn huge_declared_length_does_not_allocate() {
        let mut frame = Vec::new();
        frame.put_u64(u64::MAX);
        let mut cur: &[u8] = &frame;
        assert!(take_exact_tail(&mut cur, "payload").is_err());
    }
}
