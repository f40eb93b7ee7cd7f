use super::*;

/// Removes `id` from the bucket. A blob that is already gone counts as deleted.
pub async fn execute<B>(store: &B, id: &str) -> Result<Outcome>
where
    B: Blobstore + ?Sized,
{
    store.delete(id).await?;
    log::info!("deleted {}", id);
    Ok(Outcome::Done)
}
