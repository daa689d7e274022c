//! Content-addressed merging of photo attachments across edit sessions.
//!
//! When a record is edited, the form hands back two lists: the photos already
//! stored on the record and whatever the user just uploaded. Re-uploading a
//! file, renaming a photo, or submitting the same form twice must not grow
//! the list — identity is the SHA-256 of the payload bytes, so the same image
//! under a new name updates metadata in place instead of duplicating.
//!
//! ## Merge keys
//!
//! Attachments with a payload key by content hash. An attachment whose
//! payload is missing keys by a synthetic per-position token instead, so it
//! survives the merge rather than being silently dropped — the field crew's
//! captions are worth keeping even when the image bytes were lost.
//!
//! ## Ordering
//!
//! The first occurrence of a hash anchors its slot. Existing photos establish
//! the output order; genuinely new uploads append after them. Merging the
//! same upload list twice therefore produces the same result as merging it
//! once.

use crate::types::Attachment;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

/// SHA-256 of a byte payload as a lowercase hex string.
pub fn content_hash(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

/// Merge key for one attachment: content hash, or a positional token for
/// hash-less entries.
fn merge_key(photo: &Attachment, origin: &str, index: usize) -> String {
    if photo.has_payload() {
        content_hash(&photo.data)
    } else {
        format!("{origin}-{index}")
    }
}

/// Merge existing and newly uploaded photo records without duplication.
///
/// Existing photos fold in first, in their original order. A duplicate hash
/// among the existing list collapses to a single slot: the later entry's
/// name and mime overwrite the earlier, but the first occurrence keeps the
/// position. New photos then update matching slots in place (name only when
/// non-blank) or append when their content is unseen. New entries without a
/// payload are skipped.
///
/// Every output name is trimmed; blank names become the standard placeholder.
pub fn merge_photo_records(existing: &[Attachment], new: &[Attachment]) -> Vec<Attachment> {
    let mut merged: HashMap<String, Attachment> = HashMap::new();
    let mut order: Vec<String> = Vec::new();

    for (idx, photo) in existing.iter().enumerate() {
        let key = merge_key(photo, "existing", idx);
        let mut copy = photo.clone();
        copy.name = copy.display_name().to_string();
        match merged.get_mut(&key) {
            Some(slot) => {
                // Same content seen again: metadata wins, position does not move.
                slot.name = copy.name;
                slot.mime = copy.mime;
            }
            None => {
                order.push(key.clone());
                merged.insert(key, copy);
            }
        }
    }

    for photo in new {
        if !photo.has_payload() {
            continue;
        }
        let key = content_hash(&photo.data);
        let cleaned_name = photo.name.trim();
        match merged.get_mut(&key) {
            Some(slot) => {
                if !cleaned_name.is_empty() {
                    slot.name = cleaned_name.to_string();
                }
                if !photo.mime.is_empty() {
                    slot.mime = photo.mime.clone();
                }
            }
            None => {
                let mut copy = photo.clone();
                copy.name = copy.display_name().to_string();
                order.push(key.clone());
                merged.insert(key, copy);
            }
        }
    }

    order
        .into_iter()
        .filter_map(|key| merged.remove(&key))
        .collect()
}
