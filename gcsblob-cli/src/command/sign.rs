use super::*;
use std::io::{self, Write};

/// Prints a signed url for `id` to stdout, without a trailing newline.
pub fn execute<B>(store: &B, id: &str, action: SignAction, expiry: Duration) -> Result<Outcome>
where
    B: Blobstore + ?Sized,
{
    let url = store.sign(id, action, expiry)?;
    write_url(&mut io::stdout().lock(), &url)?;
    Ok(Outcome::Done)
}

fn write_url<W: Write>(out: &mut W, url: &str) -> io::Result<()> {
    out.write_all(url.as_bytes())?;
    out.flush()
}
