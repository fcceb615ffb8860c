//! Content-addressed storage for uploaded profile photos.

use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest as _, Sha256};

use crate::error::Error;

/// Write `bytes` under `media_dir/users/YYYY/MM/DD/<sha256>.<ext>` and return
/// the path relative to `media_dir`.
///
/// Identical uploads on the same day land on the same file.
pub async fn save_photo(
  media_dir: &Path,
  bytes:     &[u8],
  extension: &str,
  now:       DateTime<Utc>,
) -> Result<String, Error> {
  let digest = hex::encode(Sha256::digest(bytes));
  let relative = format!("users/{}/{digest}.{extension}", now.format("%Y/%m/%d"));

  let path = media_dir.join(&relative);
  if let Some(parent) = path.parent() {
    tokio::fs::create_dir_all(parent).await?;
  }
  tokio::fs::write(&path, bytes).await?;

  tracing::debug!(path = %path.display(), "stored photo");
  Ok(relative)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone as _;

  #[tokio::test]
  async fn photo_is_stored_under_its_digest() {
    let dir = std::env::temp_dir()
      .join(format!("bookmarks-media-test-{}", std::process::id()));
    let now = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();

    let relative = save_photo(&dir, b"fake png bytes", "png", now).await.unwrap();
    let digest = hex::encode(Sha256::digest(b"fake png bytes"));
    assert_eq!(relative, format!("users/2024/03/09/{digest}.png"));

    let stored = tokio::fs::read(dir.join(&relative)).await.unwrap();
    assert_eq!(stored, b"fake png bytes");

    // Saving the same content again is harmless.
    let again = save_photo(&dir, b"fake png bytes", "png", now).await.unwrap();
    assert_eq!(again, relative);

    tokio::fs::remove_dir_all(&dir).await.unwrap();
  }
}
