//! Cover thumbnails captured from decoded pages.

use tracing::{debug, warn};

use crate::catalog::BookCatalog;
use crate::source::DecodedImage;

use super::encoder::PageEncoder;

/// Store a thumbnail made from `cover` if the book has none yet.
///
/// Returns whether a thumbnail was stored. Failures are logged and ignored;
/// a missing thumbnail only means the default one is served.
pub async fn record_thumbnail(
    catalog: &dyn BookCatalog,
    encoder: PageEncoder,
    book_id: &str,
    cover: &DecodedImage,
) -> bool {
    let cover = cover.clone();
    let encoded = tokio::task::spawn_blocking(move || encoder.encode_thumbnail(&cover)).await;

    match encoded {
        Ok(Ok(thumbnail)) => {
            let stored = catalog.store_thumbnail_if_absent(book_id, thumbnail).await;
            if stored {
                debug!(book_id = book_id, "Stored thumbnail");
            }
            stored
        }
        Ok(Err(e)) => {
            warn!(book_id = book_id, error = %e, "Failed to encode thumbnail");
            false
        }
        Err(e) => {
            warn!(book_id = book_id, error = %e, "Thumbnail task failed");
            false
        }
    }
}
