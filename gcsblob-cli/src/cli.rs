use std::{ffi::OsString, path::PathBuf};
use structopt::{
    clap::{self, AppSettings},
    StructOpt,
};

pub const USAGE_EXAMPLE: &str = "\
EXAMPLES:
    # Upload a blob to the GCS blobstore.
    gcsblob -b bucket put <path/to/file> <remote-blob>

    # Fetch a blob from the GCS blobstore.
    # Destination file will be overwritten if exists.
    gcsblob -b bucket get <remote-blob> <path/to/file>

    # Remove a blob from the GCS blobstore.
    gcsblob -b bucket delete <remote-blob>

    # Check if a blob exists in the GCS blobstore (exit status 3 if it does not).
    gcsblob -b bucket exists <remote-blob>

    # Generate a signed url for a blob.
    # <http action> is GET, PUT, or DELETE,
    # <expiry> is a duration of at most 7 days (e.g. \"6h\").
    # If an encryption key is configured the url users have to send the
    # matching x-goog-encryption-* headers.
    gcsblob -b bucket sign <remote-blob> <http action> <expiry>";

/// Flags spelled with a single dash, the way the blobstore CLIs take them.
const LONG_FLAGS: &[&str] = &["help", "storage-class", "progress"];

/// Help output comes back as an error too; check `use_stderr` to tell them apart.
pub fn parse_args() -> Result<Cli, clap::Error> {
    Cli::from_iter_safe(normalize_args(std::env::args_os()))
}

pub fn print_help() -> std::io::Result<()> {
    Cli::clap()
        .print_long_help()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    println!();
    Ok(())
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "gcsblob",
    about = "Google Cloud Storage blobstore client",
    after_help = USAGE_EXAMPLE,
    global_settings = &[AppSettings::DisableVersion, AppSettings::TrailingVarArg],
)]
pub struct Cli {
    /// Print CLI version
    #[structopt(short = "v")]
    pub show_version: bool,

    /// GCS bucket name
    #[structopt(short = "b", value_name = "bucket")]
    pub bucket: Option<String>,

    /// GCS storage class (defaults to bucket settings)
    #[structopt(long = "storage-class", value_name = "class")]
    pub storage_class: Option<String>,

    /// Compress objects with gzip when uploading
    #[structopt(short = "z")]
    pub compress: bool,

    /// Path to a JSON config file; -b and -storage-class take precedence
    #[structopt(short = "c", value_name = "config", parse(from_os_str))]
    pub config_path: Option<PathBuf>,

    /// Show a progress bar on stderr while transferring
    #[structopt(long = "progress")]
    pub progress: bool,

    /// Command and its arguments
    #[structopt(value_name = "command")]
    pub args: Vec<String>,
}

/// Turns `-storage-class x` and `-help` into their double dash form. Stops at
/// the first positional argument, everything after it belongs to the command.
pub fn normalize_args<I>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = OsString>,
{
    let mut args = args.into_iter();
    let mut normalized: Vec<OsString> = args.next().into_iter().collect();
    let mut expects_value = false;

    while let Some(arg) = args.next() {
        let text = arg.to_string_lossy().into_owned();

        if text == "--" || (!text.starts_with('-') && !expects_value) {
            normalized.push(arg);
            normalized.extend(args);
            break;
        }

        if expects_value {
            expects_value = false;
            normalized.push(arg);
            continue;
        }

        let name = text.trim_start_matches('-');
        let (flag, inline_value) = match name.split_once('=') {
            Some((flag, _)) => (flag, true),
            None => (name, false),
        };

        expects_value = !inline_value && matches!(flag, "b" | "c" | "storage-class");

        if !text.starts_with("--") && LONG_FLAGS.contains(&flag) {
            normalized.push(format!("-{}", text).into());
        } else {
            normalized.push(arg);
        }
    }

    normalized
}
