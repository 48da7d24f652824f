//! Claim filing, guarded status transitions, and claim deletion.

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::audit;
use crate::clock::LocalClock;
use crate::db::query;
use crate::error::{DeskError, Result};
use crate::model::{Actor, Claim, ClaimDetails, ClaimLog, ClaimPhoto, ClaimStatus};
use crate::uploads::{UploadStore, sanitize_filename};

/// A photo submitted alongside a new claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoUpload {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

/// A freshly filed claim and the photos stored with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiledClaim {
    pub claim: Claim,
    pub photos: Vec<ClaimPhoto>,
}

/// File a new claim, reported today in the clock's zone, with its photos.
///
/// Every field and photo name is checked before anything is written. The
/// claim and photo rows share one transaction; photo files are written
/// before it commits and removed again if the filing fails.
///
/// # Errors
///
/// Returns a validation error for a blank address or a photo name that
/// sanitizes to nothing, a file-write error, or a storage error. On error
/// nothing is left behind.
pub fn file_claim(
    conn: &mut Connection,
    clock: &LocalClock,
    uploads: &UploadStore,
    details: ClaimDetails,
    photos: &[PhotoUpload],
) -> Result<FiledClaim> {
    let details = details.normalized()?;
    let names = photos
        .iter()
        .map(|photo| {
            sanitize_filename(&photo.original_name).ok_or_else(|| {
                DeskError::validation(
                    "photos",
                    format!("'{}' is not a usable filename", photo.original_name),
                )
            })
        })
        .collect::<Result<Vec<_>>>()?;

    let tx = conn.transaction()?;
    let claim = query::insert_claim(&tx, &details, clock.today(), clock.now_us())?;
    let rows = names
        .iter()
        .map(|name| query::insert_photo(&tx, claim.id, name))
        .collect::<Result<Vec<_>>>()?;

    let mut written = Vec::with_capacity(names.len());
    for (photo, name) in photos.iter().zip(&names) {
        match uploads.save(name, &photo.bytes) {
            Ok(stored) => written.push(stored),
            Err(error) => {
                discard_files(uploads, &written);
                return Err(error);
            }
        }
    }
    if let Err(error) = tx.commit() {
        discard_files(uploads, &written);
        return Err(error.into());
    }

    tracing::info!(claim_id = claim.id, photos = rows.len(), "claim filed");
    Ok(FiledClaim {
        claim,
        photos: rows,
    })
}

fn discard_files(uploads: &UploadStore, names: &[String]) {
    for name in names {
        if let Err(error) = uploads.remove(name) {
            tracing::warn!(filename = %name, %error, "photo from failed filing not removed");
        }
    }
}

/// Result of a status transition request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TransitionOutcome {
    /// The claim was already in the requested state; nothing was written.
    Unchanged { status: ClaimStatus },
    Applied {
        from: ClaimStatus,
        to: ClaimStatus,
        entry: ClaimLog,
    },
    /// The target needs a reason; use [`defer_claim`] or [`close_claim`].
    ReasonRequired { to: ClaimStatus },
}

/// Change a claim's stored status from the manual status picker.
///
/// # Errors
///
/// Returns [`DeskError::ClaimNotFound`] or a storage error.
pub fn change_status(
    conn: &mut Connection,
    clock: &LocalClock,
    actor: &Actor,
    claim_id: i64,
    new_status: ClaimStatus,
) -> Result<TransitionOutcome> {
    let tx = conn.transaction()?;
    let claim = query::require_claim(&tx, claim_id)?;
    if claim.status == new_status {
        return Ok(TransitionOutcome::Unchanged { status: new_status });
    }
    if new_status.requires_reason() {
        return Ok(TransitionOutcome::ReasonRequired { to: new_status });
    }

    query::set_claim_status(&tx, claim_id, new_status)?;
    let entry = audit::record(
        &tx,
        clock,
        claim_id,
        actor.user_id,
        &format!("Status changed from {} to {new_status}", claim.status),
    )?;
    tx.commit()?;
    tracing::info!(claim_id, from = %claim.status, to = %new_status, "claim status changed");

    Ok(TransitionOutcome::Applied {
        from: claim.status,
        to: new_status,
        entry,
    })
}

/// Defer a claim with a reason.
///
/// # Errors
///
/// Returns a validation error for a blank reason,
/// [`DeskError::ClaimNotFound`], or a storage error.
pub fn defer_claim(
    conn: &mut Connection,
    clock: &LocalClock,
    actor: &Actor,
    claim_id: i64,
    reason: &str,
) -> Result<TransitionOutcome> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(DeskError::ReasonRequired(ClaimStatus::Deferred));
    }

    let tx = conn.transaction()?;
    let claim = query::require_claim(&tx, claim_id)?;
    if claim.status == ClaimStatus::Deferred {
        return Ok(TransitionOutcome::Unchanged {
            status: ClaimStatus::Deferred,
        });
    }

    query::set_claim_status(&tx, claim_id, ClaimStatus::Deferred)?;
    let entry = audit::record(
        &tx,
        clock,
        claim_id,
        actor.user_id,
        &format!("Status changed from {} to Deferred. Reason: {reason}", claim.status),
    )?;
    tx.commit()?;
    tracing::info!(claim_id, from = %claim.status, "claim deferred");

    Ok(TransitionOutcome::Applied {
        from: claim.status,
        to: ClaimStatus::Deferred,
        entry,
    })
}

/// Reasons and notes submitted when closing a claim.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClosureForm {
    pub reasons: Option<String>,
    pub notes: Option<String>,
}

/// Close a claim, recording a closure row alongside the audit entry.
///
/// # Errors
///
/// Returns a validation error when both reasons and notes are blank,
/// [`DeskError::ClaimNotFound`], or a storage error.
pub fn close_claim(
    conn: &mut Connection,
    clock: &LocalClock,
    actor: &Actor,
    claim_id: i64,
    form: &ClosureForm,
) -> Result<TransitionOutcome> {
    let reasons = form.reasons.as_deref().map(str::trim).filter(|r| !r.is_empty());
    let notes = form.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    if reasons.is_none() && notes.is_none() {
        return Err(DeskError::ReasonRequired(ClaimStatus::Closed));
    }

    let tx = conn.transaction()?;
    let claim = query::require_claim(&tx, claim_id)?;
    if claim.status == ClaimStatus::Closed {
        return Ok(TransitionOutcome::Unchanged {
            status: ClaimStatus::Closed,
        });
    }

    query::set_claim_status(&tx, claim_id, ClaimStatus::Closed)?;
    query::insert_closure(&tx, claim_id, reasons, notes, clock.now(), clock.now_us())?;

    let mut action = format!(
        "Status changed from {} to Closed. Reason: {}",
        claim.status,
        reasons.unwrap_or("N/A")
    );
    if let Some(notes) = notes {
        action.push_str(&format!(". Notes: {notes}"));
    }
    let entry = audit::record(&tx, clock, claim_id, actor.user_id, &action)?;
    tx.commit()?;
    tracing::info!(claim_id, from = %claim.status, "claim closed");

    Ok(TransitionOutcome::Applied {
        from: claim.status,
        to: ClaimStatus::Closed,
        entry,
    })
}

/// What a claim deletion removed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeletionReport {
    pub claim_id: i64,
    pub photos_removed: usize,
    pub warnings: Vec<String>,
}

/// Delete a claim with its work orders, logs, closures, and photos.
///
/// Rows go first in one transaction; photo files are removed afterwards.
/// A file that is already gone is skipped, and other file errors come back
/// as warnings.
///
/// # Errors
///
/// Returns [`DeskError::ClaimNotFound`] or a storage error.
pub fn delete_claim(
    conn: &mut Connection,
    uploads: &UploadStore,
    claim_id: i64,
) -> Result<DeletionReport> {
    let tx = conn.transaction()?;
    query::require_claim(&tx, claim_id)?;
    let photos = query::list_photos(&tx, claim_id)?;
    query::delete_claim_rows(&tx, claim_id)?;
    tx.commit()?;

    let mut report = DeletionReport {
        claim_id,
        ..DeletionReport::default()
    };
    for photo in photos {
        match uploads.remove(&photo.filename) {
            Ok(true) => report.photos_removed += 1,
            Ok(false) => {
                tracing::debug!(claim_id, filename = %photo.filename, "photo file already gone");
            }
            Err(error) => {
                tracing::warn!(claim_id, filename = %photo.filename, %error, "photo file not removed");
                report
                    .warnings
                    .push(format!("Could not remove {}: {error}", photo.filename));
            }
        }
    }
    tracing::info!(claim_id, photos_removed = report.photos_removed, "claim deleted");
    Ok(report)
}
