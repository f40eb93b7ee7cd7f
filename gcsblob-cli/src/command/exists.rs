use super::*;

pub async fn execute<B>(store: &B, id: &str) -> Result<Outcome>
where
    B: Blobstore + ?Sized,
{
    if store.exists(id).await? {
        log::info!("blob {} exists", id);
        Ok(Outcome::Done)
    } else {
        log::info!("blob {} does not exist", id);
        Ok(Outcome::BlobMissing)
    }
}

#[cfg(test)]
mod tests {
    use super::super::tests::MemoryStore;
    use super::*;

    #[tokio::test]
    async fn reports_presence() {
        let store = MemoryStore::with_blob("here", b"");

        assert_eq!(execute(&store, "here").await.unwrap(), Outcome::Done);
        assert_eq!(execute(&store, "gone").await.unwrap(), Outcome::BlobMissing);
    }
}
