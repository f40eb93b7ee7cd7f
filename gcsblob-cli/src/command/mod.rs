pub mod delete;
pub mod exists;
pub mod get;
pub mod put;
pub mod sign;

use super::cli::{self, Cli};
use super::duration::{parse_duration, ParseDurationError};
use super::exitcode;
use super::Result;
use anyhow::Context;
use gcsblob_client::{Blobstore, GcsClient};
use gcsblob_models::{Config, SignAction};
use std::{path::PathBuf, time::Duration};
use thiserror::Error;
use tokio::runtime as rt;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A validated command line: the verb and its arguments.
#[derive(Debug, PartialEq, Eq)]
pub enum Invocation {
    Put { src: PathBuf, dst: String },
    Get { src: String, dst: PathBuf },
    Delete { id: String },
    Exists { id: String },
    Sign {
        id: String,
        action: SignAction,
        expiry: Duration,
    },
}

#[derive(Debug, Error)]
pub enum UsageError {
    #[error("Expected at least two arguments got {0}")]
    TooFewArguments(usize),

    #[error("{verb} method expected {expected} arguments got {got}")]
    ArgumentCount {
        verb: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("unknown command: '{0}'")]
    UnknownCommand(String),

    #[error(transparent)]
    InvalidAction(#[from] gcsblob_models::Error),

    #[error("Invalid expiry duration: {0}")]
    InvalidExpiry(#[from] ParseDurationError),
}

impl Invocation {
    /// `args` is every positional argument, the verb included. Argument
    /// counts in errors count the verb too.
    pub fn parse(args: &[String]) -> Result<Self, UsageError> {
        if args.len() < 2 {
            return Err(UsageError::TooFewArguments(args.len()));
        }

        let expect = |verb: &'static str, len: usize, expected: usize| {
            if args.len() == len {
                Ok(())
            } else {
                Err(UsageError::ArgumentCount {
                    verb,
                    expected,
                    got: args.len(),
                })
            }
        };

        let invocation = match args[0].as_str() {
            "put" => {
                expect("put", 3, 2)?;
                Self::Put {
                    src: PathBuf::from(&args[1]),
                    dst: args[2].clone(),
                }
            }
            "get" => {
                expect("get", 3, 2)?;
                Self::Get {
                    src: args[1].clone(),
                    dst: PathBuf::from(&args[2]),
                }
            }
            "delete" => {
                expect("delete", 2, 2)?;
                Self::Delete {
                    id: args[1].clone(),
                }
            }
            "exists" => {
                expect("exists", 2, 2)?;
                Self::Exists {
                    id: args[1].clone(),
                }
            }
            "sign" => {
                expect("sign", 4, 3)?;
                let action = args[2].parse::<SignAction>()?;
                Self::Sign {
                    id: args[1].clone(),
                    action,
                    expiry: parse_duration(&args[3])?,
                }
            }
            other => return Err(UsageError::UnknownCommand(other.to_string())),
        };

        Ok(invocation)
    }

    pub fn verb(&self) -> &'static str {
        match self {
            Self::Put { .. } => "put",
            Self::Get { .. } => "get",
            Self::Delete { .. } => "delete",
            Self::Exists { .. } => "exists",
            Self::Sign { .. } => "sign",
        }
    }
}

/// How a successfully executed command ends the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    BlobMissing,
}

impl Outcome {
    pub fn exit_code(self) -> i32 {
        match self {
            Self::Done => exitcode::OK,
            Self::BlobMissing => exitcode::BLOB_MISSING,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TransferOptions {
    pub compress: bool,
    pub progress: bool,
}

pub fn execute(cli: Cli) -> Result<Outcome> {
    if cli.show_version {
        println!("version {}", VERSION);
        return Ok(Outcome::Done);
    }

    if cli.args.is_empty() {
        cli::print_help()?;
        return Ok(Outcome::Done);
    }

    let config = load_configuration(&cli)?;
    let invocation = Invocation::parse(&cli.args)?;
    let options = TransferOptions {
        compress: cli.compress,
        progress: cli.progress,
    };

    let rt = rt::Runtime::new()?;
    rt.block_on(async move {
        let client = GcsClient::new(&config).context("creating gcs client")?;
        run(&client, invocation, options).await
    })
}

pub async fn run<B>(store: &B, invocation: Invocation, options: TransferOptions) -> Result<Outcome>
where
    B: Blobstore + ?Sized,
{
    let verb = invocation.verb();

    let outcome = match invocation {
        Invocation::Put { src, dst } => put::execute(store, &src, &dst, options).await,
        Invocation::Get { src, dst } => get::execute(store, &src, &dst, options).await,
        Invocation::Delete { id } => delete::execute(store, &id).await,
        Invocation::Exists { id } => exists::execute(store, &id).await,
        Invocation::Sign { id, action, expiry } => sign::execute(store, &id, action, expiry),
    };

    outcome.with_context(|| format!("performing operation {}", verb))
}

fn load_configuration(cli: &Cli) -> Result<Config> {
    let mut config = match &cli.config_path {
        Some(path) => {
            let file = std::fs::File::open(path)
                .with_context(|| format!("opening config {}", path.display()))?;
            Config::from_reader(file)
                .with_context(|| format!("reading config {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(bucket) = &cli.bucket {
        config.bucket_name = bucket.clone();
    }
    if let Some(class) = cli.storage_class.as_deref().filter(|c| !c.is_empty()) {
        config.storage_class = Some(class.parse()?);
    }

    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bytes::Bytes;
    use futures::{stream, TryStreamExt};
    use gcsblob_client::{ClientError, Download, PutOptions, UploadBody};
    use std::{collections::HashMap, io::Write, sync::Mutex};

    /// In-memory blobstore that remembers how each blob was uploaded.
    #[derive(Default)]
    pub struct MemoryStore {
        pub blobs: Mutex<HashMap<String, (Vec<u8>, PutOptions)>>,
    }

    impl MemoryStore {
        pub fn with_blob(id: &str, contents: &[u8]) -> Self {
            let store = Self::default();
            store.blobs.lock().unwrap().insert(
                id.to_string(),
                (contents.to_vec(), PutOptions::default()),
            );
            store
        }

        pub fn blob(&self, id: &str) -> Option<(Vec<u8>, PutOptions)> {
            self.blobs.lock().unwrap().get(id).cloned()
        }
    }

    #[async_trait]
    impl Blobstore for MemoryStore {
        async fn put(
            &self,
            body: UploadBody,
            dst: &str,
            options: PutOptions,
        ) -> gcsblob_client::Result<()> {
            let contents = body
                .stream
                .try_fold(Vec::new(), |mut acc, chunk| async move {
                    acc.extend_from_slice(&chunk);
                    Ok(acc)
                })
                .await
                .expect("upload stream failed");
            if let Some(len) = body.len {
                assert_eq!(len, contents.len() as u64);
            }
            self.blobs
                .lock()
                .unwrap()
                .insert(dst.to_string(), (contents, options));
            Ok(())
        }

        async fn get(&self, src: &str) -> gcsblob_client::Result<Download> {
            let (contents, _) = self
                .blob(src)
                .ok_or_else(|| ClientError::NotFound(src.to_string()))?;
            let len = contents.len() as u64;
            let chunks: Vec<std::io::Result<Bytes>> = contents
                .chunks(4)
                .map(|chunk| Ok(Bytes::copy_from_slice(chunk)))
                .collect();
            Ok(Download {
                stream: Box::pin(stream::iter(chunks)),
                len: Some(len),
            })
        }

        async fn delete(&self, id: &str) -> gcsblob_client::Result<()> {
            self.blobs.lock().unwrap().remove(id);
            Ok(())
        }

        async fn exists(&self, id: &str) -> gcsblob_client::Result<bool> {
            Ok(self.blobs.lock().unwrap().contains_key(id))
        }

        fn sign(
            &self,
            id: &str,
            action: SignAction,
            expiry: Duration,
        ) -> gcsblob_client::Result<String> {
            Ok(format!(
                "https://signed.example/{}?method={}&expires={}",
                id,
                action,
                expiry.as_secs()
            ))
        }
    }

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn parse(raw: &[&str]) -> Result<Invocation, UsageError> {
        Invocation::parse(&args(raw))
    }

    #[test]
    fn needs_a_verb_and_an_argument() {
        assert!(matches!(
            parse(&["exists"]),
            Err(UsageError::TooFewArguments(1))
        ));
        assert_eq!(
            UsageError::TooFewArguments(1).to_string(),
            "Expected at least two arguments got 1"
        );
    }

    #[test]
    fn validates_argument_count_per_verb() {
        let cases: &[(&[&str], &str)] = &[
            (&["put", "src"], "put method expected 2 arguments got 2"),
            (&["put", "a", "b", "c"], "put method expected 2 arguments got 4"),
            (&["get", "src"], "get method expected 2 arguments got 2"),
            (&["delete", "a", "b"], "delete method expected 2 arguments got 3"),
            (&["exists", "a", "b"], "exists method expected 2 arguments got 3"),
            (&["sign", "id", "GET"], "sign method expected 3 arguments got 3"),
            (
                &["sign", "id", "GET", "1h", "extra"],
                "sign method expected 3 arguments got 5",
            ),
        ];

        for (raw, message) in cases {
            assert_eq!(parse(raw).unwrap_err().to_string(), *message);
        }
    }

    #[test]
    fn parses_each_verb() {
        assert_eq!(
            parse(&["put", "local.tgz", "remote"]).unwrap(),
            Invocation::Put {
                src: "local.tgz".into(),
                dst: "remote".into()
            }
        );
        assert_eq!(
            parse(&["get", "remote", "local.tgz"]).unwrap(),
            Invocation::Get {
                src: "remote".into(),
                dst: "local.tgz".into()
            }
        );
        assert_eq!(
            parse(&["delete", "remote"]).unwrap(),
            Invocation::Delete { id: "remote".into() }
        );
        assert_eq!(
            parse(&["exists", "remote"]).unwrap(),
            Invocation::Exists { id: "remote".into() }
        );
        assert_eq!(
            parse(&["sign", "remote", "put", "90m"]).unwrap(),
            Invocation::Sign {
                id: "remote".into(),
                action: SignAction::Put,
                expiry: Duration::from_secs(5400),
            }
        );
    }

    #[test]
    fn rejects_unknown_verbs() {
        let err = parse(&["copy", "a", "b"]).unwrap_err();
        assert_eq!(err.to_string(), "unknown command: 'copy'");
    }

    #[test]
    fn validates_sign_action_and_expiry() {
        let err = parse(&["sign", "id", "post", "1h"]).unwrap_err();
        assert!(matches!(
            err,
            UsageError::InvalidAction(gcsblob_models::Error::InvalidSignAction(ref action))
                if action == "POST"
        ));
        assert_eq!(
            err.to_string(),
            "invalid signing action: POST must be GET, PUT, or DELETE"
        );

        let err = parse(&["sign", "id", "delete", "soon"]).unwrap_err();
        assert!(matches!(err, UsageError::InvalidExpiry(_)));
        assert!(err.to_string().starts_with("Invalid expiry duration: "));
    }

    #[tokio::test]
    async fn exists_maps_missing_blob_to_exit_code_3() {
        let store = MemoryStore::with_blob("present", b"x");

        let outcome = run(
            &store,
            Invocation::Exists {
                id: "present".into(),
            },
            TransferOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome.exit_code(), 0);

        let outcome = run(
            &store,
            Invocation::Exists {
                id: "absent".into(),
            },
            TransferOptions::default(),
        )
        .await
        .unwrap();
        assert_eq!(outcome, Outcome::BlobMissing);
        assert_eq!(outcome.exit_code(), 3);
    }

    #[tokio::test]
    async fn failures_name_the_operation() {
        let store = MemoryStore::default();
        let dir = tempfile::tempdir().unwrap();

        let err = run(
            &store,
            Invocation::Get {
                src: "absent".into(),
                dst: dir.path().join("out"),
            },
            TransferOptions::default(),
        )
        .await
        .unwrap_err();

        assert_eq!(err.to_string(), "performing operation get");
        assert!(format!("{:#}", err).contains("object 'absent' not found"));
    }

    #[tokio::test]
    async fn put_then_get_round_trips_file() {
        let store = MemoryStore::default();
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("in.txt");
        let dst = dir.path().join("out.txt");
        std::fs::File::create(&src)
            .unwrap()
            .write_all(b"some blob contents")
            .unwrap();

        let options = TransferOptions::default();
        run(
            &store,
            Invocation::Put {
                src: src.clone(),
                dst: "blob".into(),
            },
            options,
        )
        .await
        .unwrap();
        let (stored, put_options) = store.blob("blob").unwrap();
        assert_eq!(stored, b"some blob contents");
        assert!(!put_options.gzipped);

        run(
            &store,
            Invocation::Get {
                src: "blob".into(),
                dst: dst.clone(),
            },
            options,
        )
        .await
        .unwrap();
        assert_eq!(std::fs::read(&dst).unwrap(), b"some blob contents");

        run(&store, Invocation::Delete { id: "blob".into() }, options)
            .await
            .unwrap();
        assert!(store.blob("blob").is_none());
    }

    #[test]
    fn missing_bucket_is_fatal() {
        let cli = Cli {
            show_version: false,
            bucket: None,
            storage_class: None,
            compress: false,
            config_path: None,
            progress: false,
            args: args(&["exists", "id"]),
        };

        let err = execute(cli).unwrap_err();
        assert!(err.to_string().starts_with("no bucket name provided"));
    }

    #[test]
    fn flags_override_config_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"bucket_name": "from-file", "storage_class": "COLDLINE", "credentials_source": "none"}}"#
        )
        .unwrap();

        let cli = Cli {
            show_version: false,
            bucket: Some("from-flag".into()),
            storage_class: Some("nearline".into()),
            compress: false,
            config_path: Some(file.path().to_path_buf()),
            progress: false,
            args: Vec::new(),
        };

        let config = load_configuration(&cli).unwrap();
        assert_eq!(config.bucket_name, "from-flag");
        assert_eq!(
            config.storage_class,
            Some(gcsblob_models::StorageClass::Nearline)
        );
        assert!(config.is_read_only());
    }
}
