//! `Range` header parsing for single byte ranges.

/// Inclusive byte range within a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct ByteRange {
  pub(super) start: u64,
  pub(super) end: u64,
}

impl ByteRange {
  pub(super) fn len(&self) -> u64 {
    self.end - self.start + 1
  }

  /// Shorten the range to at most `max` bytes, keeping the start.
  pub(super) fn capped(self, max: u64) -> Self {
    let max = max.max(1);
    Self {
      start: self.start,
      end: self.end.min(self.start.saturating_add(max - 1)),
    }
  }

  /// Value for the `Content-Range` header.
  pub(super) fn content_range(&self, size: u64) -> String {
    format!("bytes {}-{}/{}", self.start, self.end, size)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum RangeRequest {
  /// No usable Range header; serve from the start.
  Full,
  Partial(ByteRange),
  /// Syntactically valid, but nothing of the file is covered.
  Unsatisfiable,
}

/// Interpret a `Range` header against a file of `size` bytes.
///
/// Malformed values and multi-range requests are ignored (served as `Full`).
pub(super) fn parse_range(header: Option<&str>, size: u64) -> RangeRequest {
  let Some(ranges) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
    return RangeRequest::Full;
  };
  if ranges.contains(',') {
    return RangeRequest::Full;
  }
  let Some((first, last)) = ranges.split_once('-') else {
    return RangeRequest::Full;
  };
  let (first, last) = (first.trim(), last.trim());

  let range = match (first.is_empty(), last.is_empty()) {
    // "-500": final 500 bytes
    (true, false) => {
      let Ok(suffix) = last.parse::<u64>() else {
        return RangeRequest::Full;
      };
      if suffix == 0 || size == 0 {
        return RangeRequest::Unsatisfiable;
      }
      ByteRange {
        start: size.saturating_sub(suffix),
        end: size - 1,
      }
    }
    // "500-" or "500-999"
    (false, _) => {
      let Ok(start) = first.parse::<u64>() else {
        return RangeRequest::Full;
      };
      let end = if last.is_empty() {
        u64::MAX
      } else {
        match last.parse::<u64>() {
          Ok(end) if end >= start => end,
          _ => return RangeRequest::Full,
        }
      };
      if start >= size {
        return RangeRequest::Unsatisfiable;
      }
      ByteRange {
        start,
        end: end.min(size - 1),
      }
    }
    (true, true) => return RangeRequest::Full,
  };

  RangeRequest::Partial(range)
}
