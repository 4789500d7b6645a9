//! Parallel tier variant builds.
//!
//! One `go build` per tier, each with the family's tier variable set. At most
//! `jobs` builds run at once. The first failure aborts the rest; their child
//! processes are killed when the aborted tasks drop them.

use crate::bundler::error::{Error, ErrorExt, Result};
use crate::tier::Tier;
use std::{
    path::{Path, PathBuf},
    process::Stdio,
    sync::Arc,
};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, BufReader},
    process::Command,
    sync::Semaphore,
    task::JoinSet,
};

/// A built, not yet validated, tier variant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant<T> {
    pub tier: T,
    pub path: PathBuf,
}

/// Builds every tier of `T` into `variants_dir`.
///
/// Variants are returned in [`Tier::all`] order. Build output is streamed
/// line by line, each line prefixed with the tier key.
///
/// # Arguments
///
/// * `go` - The `go` binary
/// * `go_args` - Extra `go build` arguments, forwarded verbatim
/// * `jobs` - Maximum concurrent builds
/// * `name` - Base name for variant files (`<name>.<tier>`)
/// * `variants_dir` - Output directory, created if missing
pub async fn build_variants<T: Tier>(
    go: &Path,
    go_args: &[String],
    jobs: usize,
    name: &str,
    variants_dir: &Path,
) -> Result<Vec<Variant<T>>> {
    tokio::fs::create_dir_all(variants_dir)
        .await
        .fs_context("creating variants directory", variants_dir)?;

    let semaphore = Arc::new(Semaphore::new(jobs.max(1)));
    let go_args: Arc<[String]> = go_args.into();
    let mut tasks = JoinSet::new();

    for (index, tier) in T::all().into_iter().enumerate() {
        let variant = Variant {
            tier,
            path: variants_dir.join(format!("{name}.{}", tier.file_stem())),
        };
        let semaphore = Arc::clone(&semaphore);
        let go = go.to_path_buf();
        let go_args = Arc::clone(&go_args);

        tasks.spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|e| Error::GenericError(format!("build scheduler closed: {e}")))?;
            build_variant(&go, &go_args, variant.tier, &variant.path).await?;
            Ok::<_, Error>((index, variant))
        });
    }

    let mut built = Vec::with_capacity(tasks.len());
    while let Some(joined) = tasks.join_next().await {
        let failure = match joined {
            Ok(Ok(variant)) => {
                built.push(variant);
                continue;
            }
            Ok(Err(e)) => e,
            Err(e) => Error::Join(e),
        };

        log::debug!("aborting {} remaining variant builds", tasks.len());
        tasks.abort_all();
        // Drain so every aborted child is killed before the work dir goes away.
        while tasks.join_next().await.is_some() {}
        return Err(failure);
    }

    built.sort_by_key(|(index, _)| *index);
    Ok(built.into_iter().map(|(_, variant)| variant).collect())
}

async fn build_variant<T: Tier>(go: &Path, go_args: &[String], tier: T, output: &Path) -> Result<()> {
    let key = tier.key();
    log::info!("Building variant {}={}", T::ENV_VAR, key);

    let mut child = Command::new(go)
        .arg("build")
        .arg("-o")
        .arg(output)
        .args(go_args)
        .env(T::ENV_VAR, &key)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|error| Error::CommandFailed {
            command: format!("go build ({}={key})", T::ENV_VAR),
            error,
        })?;

    let prefix = format!("{key}: ");
    tokio::join!(
        forward_lines(child.stdout.take(), &prefix, false),
        forward_lines(child.stderr.take(), &prefix, true),
    );

    let status = child.wait().await.map_err(|error| Error::CommandFailed {
        command: format!("go build ({}={key})", T::ENV_VAR),
        error,
    })?;
    if !status.success() {
        return Err(Error::VariantBuild {
            env_var: T::ENV_VAR,
            tier: key,
            reason: format!("go build failed with {status}"),
        });
    }

    Ok(())
}

/// Copies `reader` to stdout or stderr, one prefixed line at a time.
///
/// After a read error the rest of the stream is discarded rather than left
/// unread, so the child never blocks on a full pipe.
async fn forward_lines<R: AsyncRead + Unpin>(reader: Option<R>, prefix: &str, to_stderr: bool) {
    let Some(reader) = reader else {
        return;
    };
    let mut reader = BufReader::new(reader);
    let mut line = Vec::new();

    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Err(e) => {
                log::warn!("{prefix}output unreadable, discarding the rest: {e}");
                if let Err(e) = tokio::io::copy(&mut reader, &mut tokio::io::sink()).await {
                    log::warn!("{prefix}output discarded after error: {e}");
                }
                break;
            }
            Ok(_) => {
                let text = String::from_utf8_lossy(&line);
                let text = text.trim_end_matches(['\n', '\r']);
                if to_stderr {
                    eprintln!("{prefix}{text}");
                } else {
                    println!("{prefix}{text}");
                }
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::tier::Amd64Tier;
    use std::os::unix::fs::PermissionsExt;

    /// Writes a stand-in `go` that records the tier variable as the output.
    fn fake_go(dir: &Path, fail_tier: Option<&str>) -> PathBuf {
        let fail = fail_tier
            .map(|tier| format!("[ \"$GOAMD64\" = \"{tier}\" ] && {{ echo \"compile error\" >&2; exit 3; }}\n"))
            .unwrap_or_default();
        let script = format!(
            "#!/bin/sh\n\
             [ \"$1\" = build ] && [ \"$2\" = -o ] || exit 64\n\
             echo \"building $GOAMD64 with $4\"\n\
             {fail}\
             printf '%s' \"$GOAMD64\" > \"$3\"\n"
        );
        let path = dir.join("go");
        std::fs::write(&path, script).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    #[tokio::test]
    async fn builds_every_tier_with_its_variable() {
        let tmp = tempfile::tempdir().unwrap();
        let go = fake_go(tmp.path(), None);
        let out = tmp.path().join("variants");

        let variants =
            build_variants::<Amd64Tier>(&go, &["./cmd/app".to_string()], 2, "app", &out)
                .await
                .unwrap();

        assert_eq!(
            variants.iter().map(|v| v.tier).collect::<Vec<_>>(),
            Amd64Tier::all()
        );
        for variant in &variants {
            assert_eq!(variant.path, out.join(format!("app.{}", variant.tier)));
            let contents = std::fs::read_to_string(&variant.path).unwrap();
            assert_eq!(contents, variant.tier.key());
        }
    }

    #[tokio::test]
    async fn failure_names_the_tier() {
        let tmp = tempfile::tempdir().unwrap();
        let go = fake_go(tmp.path(), Some("v3"));

        let err = build_variants::<Amd64Tier>(&go, &[], 1, "app", &tmp.path().join("variants"))
            .await
            .unwrap_err();
        match err {
            Error::VariantBuild { env_var, tier, .. } => {
                assert_eq!(env_var, "GOAMD64");
                assert_eq!(tier, "v3");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn first_failure_stops_the_other_builds() {
        let tmp = tempfile::tempdir().unwrap();
        let marker = tmp.path().join("finished");
        let script = format!(
            "#!/bin/sh\n\
             [ \"$GOAMD64\" = v2 ] && exit 1\n\
             sleep 3\n\
             touch \"{}\"\n",
            marker.display()
        );
        let go = tmp.path().join("go");
        std::fs::write(&go, script).unwrap();
        std::fs::set_permissions(&go, std::fs::Permissions::from_mode(0o755)).unwrap();

        let started = std::time::Instant::now();
        let err = build_variants::<Amd64Tier>(&go, &[], 4, "app", &tmp.path().join("variants"))
            .await
            .unwrap_err();
        let elapsed = started.elapsed();

        match err {
            Error::VariantBuild { tier, .. } => assert_eq!(tier, "v2"),
            other => panic!("unexpected error: {other}"),
        }
        assert!(elapsed < std::time::Duration::from_secs(2), "took {elapsed:?}");

        tokio::time::sleep(std::time::Duration::from_millis(3500)).await;
        assert!(!marker.exists(), "an aborted build ran to completion");
    }

    /// Reader that yields a line, an error, then more output.
    struct FlakyPipe {
        chunks: std::collections::VecDeque<std::io::Result<&'static [u8]>>,
    }

    impl AsyncRead for FlakyPipe {
        fn poll_read(
            mut self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(match self.chunks.pop_front() {
                None => Ok(()),
                Some(Ok(bytes)) => {
                    buf.put_slice(bytes);
                    Ok(())
                }
                Some(Err(e)) => Err(e),
            })
        }
    }

    #[tokio::test]
    async fn read_error_keeps_draining_the_pipe() {
        let mut pipe = FlakyPipe {
            chunks: [
                Ok(&b"first line\n"[..]),
                Err(std::io::Error::other("transient")),
                Ok(&b"second line\n"[..]),
                Ok(&b"third line\n"[..]),
            ]
            .into(),
        };

        forward_lines(Some(&mut pipe), "v1: ", true).await;

        assert!(pipe.chunks.is_empty(), "{} chunks left unread", pipe.chunks.len());
    }

    #[tokio::test]
    async fn missing_go_is_a_command_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let err = build_variants::<Amd64Tier>(
            &tmp.path().join("no-such-go"),
            &[],
            4,
            "app",
            &tmp.path().join("variants"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::CommandFailed { .. }), "{err}");
    }
}
