//! Duration probe for ISO-BMFF (MP4/MOV) files.
//!
//! Walks top-level boxes to `moov`, then its children to `mvhd`, and reads the
//! movie timescale and duration. Anything else (WebM, AVI, truncated files)
//! yields `None`; the caller then simply never fires the metadata hook.

fn read_u32_be(data: &[u8], at: usize) -> Option<u32> {
    let b = data.get(at..at + 4)?;
    Some(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
}

fn read_u64_be(data: &[u8], at: usize) -> Option<u64> {
    let b = data.get(at..at + 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(b);
    Some(u64::from_be_bytes(buf))
}

/// Find the payload of the first child box of type `kind` within `data`.
fn find_box<'a>(data: &'a [u8], kind: &[u8; 4]) -> Option<&'a [u8]> {
    let mut pos = 0usize;
    while pos + 8 <= data.len() {
        let size32 = read_u32_be(data, pos)? as u64;
        let box_type = &data[pos + 4..pos + 8];
        let (header, size) = match size32 {
            0 => (8usize, (data.len() - pos) as u64),
            1 => (16usize, read_u64_be(data, pos + 8)?),
            n => (8usize, n),
        };
        if size < header as u64 {
            return None;
        }
        let end = pos.checked_add(usize::try_from(size).ok()?)?;
        if end > data.len() {
            return None;
        }
        if box_type == kind {
            return Some(&data[pos + header..end]);
        }
        pos = end;
    }
    None
}

/// Movie duration in seconds from the `mvhd` box, if present and sane.
pub fn probe_duration(data: &[u8]) -> Option<f64> {
    let moov = find_box(data, b"moov")?;
    let mvhd = find_box(moov, b"mvhd")?;
    let version = *mvhd.first()?;
    let (timescale, duration) = if version == 1 {
        (read_u32_be(mvhd, 20)?, read_u64_be(mvhd, 24)?)
    } else {
        (read_u32_be(mvhd, 12)?, read_u32_be(mvhd, 16)? as u64)
    };
    if timescale == 0 || duration == u64::MAX || (version == 0 && duration == u32::MAX as u64) {
        return None;
    }
    let secs = duration as f64 / timescale as f64;
    tracing::debug!(timescale, duration, secs, "probed mvhd duration");
    Some(secs)
}
