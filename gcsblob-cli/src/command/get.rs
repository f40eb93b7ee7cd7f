use super::*;
use crate::utils;
use futures::StreamExt;
use std::path::Path;
use tokio::{fs::File, io::AsyncWriteExt};

/// Downloads `src` into `dst`. An existing file is truncated before the
/// request is made, so a failed download leaves it empty.
pub async fn execute<B>(store: &B, src: &str, dst: &Path, options: TransferOptions) -> Result<Outcome>
where
    B: Blobstore + ?Sized,
{
    let mut file = File::create(dst)
        .await
        .with_context(|| format!("creating {}", dst.display()))?;

    let download = store.get(src).await?;
    let (mut stream, tracking) = utils::track(download.stream, src, download.len, options.progress);

    let mut written = 0u64;
    let result = async {
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.context("Download failed")?;
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }
        file.flush().await?;
        Result::<()>::Ok(())
    }
    .await;

    drop(stream);
    utils::finish_tracking(tracking).await;
    result?;

    log::info!("downloaded {} ({} bytes) to {}", src, written, dst.display());
    Ok(Outcome::Done)
}
