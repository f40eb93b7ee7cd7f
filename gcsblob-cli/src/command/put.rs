use super::*;
use crate::utils;
use bytes::BytesMut;
use flate2::{write::GzEncoder, Compression};
use futures::{future, stream, StreamExt, TryStreamExt};
use gcsblob_client::{PutOptions, UploadBody, UploadStream};
use std::{
    io::{self, Read, Write},
    path::Path,
};
use tokio::fs::File;
use tokio_util::{
    codec::{BytesCodec, FramedRead},
    io::{ReaderStream, SyncIoBridge},
};

const PIPE_CAPACITY: usize = 64 * 1024;

pub async fn execute<B>(store: &B, src: &Path, dst: &str, options: TransferOptions) -> Result<Outcome>
where
    B: Blobstore + ?Sized,
{
    let file = File::open(src)
        .await
        .with_context(|| format!("opening {}", src.display()))?;
    let len = file.metadata().await?.len();

    let (stream, len): (UploadStream, _) = if options.compress {
        (gzip_pipe(file.into_std().await), None)
    } else {
        let stream = FramedRead::new(file, BytesCodec::new()).map_ok(BytesMut::freeze);
        (Box::pin(stream), Some(len))
    };

    let (stream, tracking) = utils::track(stream, dst, len, options.progress);
    let body = UploadBody::new(Box::pin(stream), len);
    let put_options = PutOptions {
        gzipped: options.compress,
    };

    let result = store.put(body, dst, put_options).await;
    utils::finish_tracking(tracking).await;
    result.context("Upload failed")?;

    log::info!("uploaded {} to {}", src.display(), dst);
    Ok(Outcome::Done)
}

/// Compresses `source` on a blocking worker and returns the read end of the
/// pipe it writes to. A compression failure surfaces as the stream's last item,
/// so the upload aborts instead of storing a truncated object.
fn gzip_pipe<R>(source: R) -> UploadStream
where
    R: Read + Send + 'static,
{
    let (reader, writer) = tokio::io::duplex(PIPE_CAPACITY);
    let writer = SyncIoBridge::new(writer);

    let worker = tokio::task::spawn_blocking(move || {
        compress(source, writer).map_err(|e| {
            log::warn!("gzip failed: {}", e);
            e
        })
    });

    let outcome = stream::once(async move {
        match worker.await {
            Ok(Ok(())) => None,
            Ok(Err(e)) => Some(Err(e)),
            Err(e) => Some(Err(io::Error::new(io::ErrorKind::Other, e))),
        }
    })
    .filter_map(future::ready);

    Box::pin(ReaderStream::new(reader).chain(outcome))
}

/// Writes a gzip stream of `source` into `sink`; dropping `sink` closes the pipe.
fn compress<R: Read, W: Write>(mut source: R, sink: W) -> io::Result<()> {
    let mut encoder = GzEncoder::new(sink, Compression::default());
    io::copy(&mut source, &mut encoder)?;
    encoder.finish()?.flush()
}
