//! Update session engine
//!
//! Manages write sessions for staging a new firmware image into a
//! target partition: `begin` pre-erases the region the image needs,
//! `write`/`write_at` stage data sequentially or at explicit offsets,
//! and `end`/`abort` close the session. Sessions are identified by
//! opaque integer tokens held in a table inside [`Updater`], so stale
//! or made-up tokens are rejected with a typed error instead of
//! reaching the medium.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use alloc::vec;

use crate::error::{Error, Fault, ImageFault, Result};
use crate::image::{ImageVerifier, HEADER_PROBE_LEN};
use crate::medium::{FlashMedium, NATIVE_BLOCK_SIZE};
use crate::partition::{Partition, PartitionTable};

/// Opaque update-session token
///
/// Tokens are issued monotonically and never reused, so a token stays
/// distinguishable as "closed" rather than aliasing a later session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OtaHandle(
    /// Raw token value
    pub u32,
);

impl OtaHandle {
    /// Raw token value (for display/FFI surfaces)
    pub fn raw(self) -> u32 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Active,
    Finalized,
    Aborted,
}

#[derive(Debug)]
struct Session {
    part: Arc<Partition>,
    /// Expected total image size; 0 = unknown/streaming
    image_size: u32,
    /// Sequential write position
    cursor: u32,
    /// High-water mark of staged bytes (sequential and offset writes)
    staged: u32,
    state: SessionState,
}

/// Update session engine
///
/// Owns the session table. Multiple concurrent sessions against
/// different partitions are permitted; a partition can host at most
/// one active session at a time.
#[derive(Debug, Default)]
pub struct Updater {
    sessions: BTreeMap<u32, Session>,
    next_token: u32,
}

impl Updater {
    /// Create an engine with no sessions
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a session against `part`, pre-erasing the region the
    /// image will need
    ///
    /// `image_size` is rounded up to the native erase size; 0 means
    /// the size is unknown and the whole partition is erased.
    pub fn begin<M: FlashMedium + ?Sized>(
        &mut self,
        medium: &mut M,
        part: &Arc<Partition>,
        image_size: u32,
    ) -> Result<OtaHandle> {
        if self
            .sessions
            .values()
            .any(|s| s.state == SessionState::Active && Arc::ptr_eq(&s.part, part))
        {
            return Err(Error::InvalidArgument);
        }
        if image_size > part.size() {
            return Err(Error::Io(Fault::OutOfRange {
                offset: 0,
                len: image_size,
            }));
        }

        let erase_len = if image_size == 0 {
            part.size()
        } else {
            image_size.div_ceil(NATIVE_BLOCK_SIZE) * NATIVE_BLOCK_SIZE
        };
        log::debug!(
            "ota begin: partition {} image_size={} erasing {} bytes",
            part.label(),
            image_size,
            erase_len
        );
        medium.erase(part.address(), erase_len)?;

        let token = self.next_token;
        self.next_token += 1;
        self.sessions.insert(
            token,
            Session {
                part: Arc::clone(part),
                image_size,
                cursor: 0,
                staged: 0,
                state: SessionState::Active,
            },
        );
        Ok(OtaHandle(token))
    }

    /// Append `data` at the session's sequential write cursor
    pub fn write<M: FlashMedium + ?Sized>(
        &mut self,
        medium: &mut M,
        handle: OtaHandle,
        data: &[u8],
    ) -> Result<()> {
        let session = self.active_session(handle)?;
        let offset = session.cursor;
        Self::stage(medium, session, offset, data)?;
        session.cursor = offset + data.len() as u32;
        Ok(())
    }

    /// Write `data` at an explicit offset within the partition
    ///
    /// Supports out-of-order staging (e.g. parallel chunked
    /// downloads). Does not move the sequential cursor. The target
    /// region must lie within the span erased by `begin`.
    pub fn write_at<M: FlashMedium + ?Sized>(
        &mut self,
        medium: &mut M,
        handle: OtaHandle,
        data: &[u8],
        offset: u32,
    ) -> Result<()> {
        let session = self.active_session(handle)?;
        Self::stage(medium, session, offset, data)
    }

    /// Validate the staged image and finalize the session
    ///
    /// Completeness is checked against the expected image size, then
    /// the image header is handed to `verifier`. On failure the
    /// session stays active so the caller can keep staging or abort.
    pub fn end<M: FlashMedium + ?Sized, V: ImageVerifier>(
        &mut self,
        medium: &mut M,
        verifier: &V,
        handle: OtaHandle,
    ) -> Result<()> {
        let session = self.active_session(handle)?;
        let staged_len = if session.image_size > 0 {
            if session.staged < session.image_size {
                return Err(Error::ValidationFailed(ImageFault::Truncated));
            }
            session.image_size
        } else {
            session.staged
        };
        if staged_len == 0 {
            return Err(Error::ValidationFailed(ImageFault::Truncated));
        }

        let probe_len = (staged_len as usize).min(HEADER_PROBE_LEN);
        let mut header = vec![0u8; probe_len];
        medium.read(session.part.address(), &mut header)?;
        verifier.verify(&session.part, &header)?;

        log::debug!(
            "ota end: partition {} finalized with {} bytes",
            session.part.label(),
            staged_len
        );
        session.state = SessionState::Finalized;
        Ok(())
    }

    /// Discard the session without validation
    ///
    /// Best-effort: the pre-erased region is not re-erased. The token
    /// becomes permanently invalid.
    pub fn abort(&mut self, handle: OtaHandle) -> Result<()> {
        let session = self.active_session(handle)?;
        log::debug!("ota abort: partition {}", session.part.label());
        session.state = SessionState::Aborted;
        Ok(())
    }

    fn active_session(&mut self, handle: OtaHandle) -> Result<&mut Session> {
        let session = self.sessions.get_mut(&handle.0).ok_or(Error::BadHandle)?;
        if session.state != SessionState::Active {
            return Err(Error::SessionClosed);
        }
        Ok(session)
    }

    fn stage<M: FlashMedium + ?Sized>(
        medium: &mut M,
        session: &mut Session,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        let end = offset.checked_add(data.len() as u32);
        match end {
            Some(end) if end <= session.part.size() => {
                medium.write(session.part.address() + offset, data)?;
                session.staged = session.staged.max(end);
                Ok(())
            }
            _ => Err(Error::Io(Fault::OutOfRange {
                offset,
                len: data.len() as u32,
            })),
        }
    }
}

/// Pick the OTA application slot to stage the next update into
///
/// Rotates round-robin through the `ota_*` slots by subtype, starting
/// after `current` (usually the running partition). For a non-OTA
/// `current` (e.g. the factory app) the first slot is returned.
pub fn next_update<'t>(
    table: &'t PartitionTable,
    current: &Partition,
) -> Result<&'t Arc<Partition>> {
    let mut slots: alloc::vec::Vec<&Arc<Partition>> = table
        .iter()
        .filter(|p| p.is_ota_slot())
        .collect();
    slots.sort_by_key(|p| p.subtype());
    if slots.is_empty() {
        return Err(Error::NotFound);
    }
    let next = slots
        .iter()
        .find(|p| current.is_ota_slot() && p.subtype() > current.subtype())
        .copied()
        .unwrap_or(slots[0]);
    Ok(next)
}
