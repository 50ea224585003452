//! Shared key generation for storage backends.
//!
//! Key format: `preview/{owner_id}/{filename}` for watermarked previews and
//! `original/{owner_id}/{filename}` for full-resolution originals. The owner
//! is the member the photo belongs to. All backends must use this format.

use uuid::Uuid;

/// Storage key for a member's watermarked preview.
pub fn preview_key(owner_id: Uuid, filename: &str) -> String {
    format!("preview/{}/{}", owner_id, filename)
}

/// Storage key for a member's full-resolution original.
pub fn original_key(owner_id: Uuid, filename: &str) -> String {
    format!("original/{}/{}", owner_id, filename)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_are_prefixed_by_class() {
        let owner = Uuid::nil();
        assert_eq!(
            preview_key(owner, "p1.jpg"),
            format!("preview/{}/p1.jpg", owner)
        );
        assert_eq!(
            original_key(owner, "p1.jpg"),
            format!("original/{}/p1.jpg", owner)
        );
    }
}
