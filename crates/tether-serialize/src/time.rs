//! Durations and time points.
//!
//! A duration is a signed nanosecond tick count behind an `auto_size`
//! header; a time point is its duration since `UNIX_EPOCH`. No unit tag
//! travels on the wire, so both peers must use these rules (or agree on
//! another unit out of band).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{Decode, DecodeError, Encode, InputArchive, OutputArchive};

impl Encode for Duration {
    fn encode(&self, out: &mut OutputArchive) {
        out.put_auto_int(self.as_nanos() as i64);
    }
}

impl Decode for Duration {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let nanos = input.take_auto_int()?;
        u64::try_from(nanos)
            .map(Duration::from_nanos)
            .map_err(|_| DecodeError::InvalidValue("negative duration"))
    }
}

impl Encode for SystemTime {
    fn encode(&self, out: &mut OutputArchive) {
        let nanos = match self.duration_since(UNIX_EPOCH) {
            Ok(after) => after.as_nanos() as i64,
            Err(before) => -(before.duration().as_nanos() as i64),
        };
        out.put_auto_int(nanos);
    }
}

impl Decode for SystemTime {
    fn decode(input: &mut InputArchive<'_>) -> Result<Self, DecodeError> {
        let nanos = input.take_auto_int()?;
        let offset = Duration::from_nanos(nanos.unsigned_abs());
        let time = if nanos >= 0 {
            UNIX_EPOCH.checked_add(offset)
        } else {
            UNIX_EPOCH.checked_sub(offset)
        };
        time.ok_or(DecodeError::InvalidValue("time point out of range"))
    }
}
