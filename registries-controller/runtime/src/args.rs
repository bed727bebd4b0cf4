use crate::{
    core::{self, Compiled, Inputs},
    snapshot::Snapshot,
};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
};
use tracing::{debug, info};

#[derive(Debug, Parser)]
#[clap(
    name = "registries-controller",
    about = "Compiles image registry sources and mirror rules into container runtime configuration"
)]
pub struct Args {
    #[clap(
        long,
        default_value = "registries_controller=info,warn",
        env = "REGISTRIES_CONTROLLER_LOG"
    )]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain")]
    log_format: kubert::LogFormat,

    #[clap(flatten)]
    compile: Compile,
}

#[derive(Debug, clap::Args)]
struct Compile {
    /// YAML files holding the cluster `Image` and mirror-rule resources.
    #[clap(long = "snapshot", value_name = "FILE", required = true, num_args = 1..)]
    snapshots: Vec<PathBuf>,

    /// The `registries.conf` base document.
    #[clap(long, value_name = "FILE")]
    registries_template: PathBuf,

    /// The `policy.json` base document.
    #[clap(long, value_name = "FILE")]
    policy_template: PathBuf,

    #[clap(long, env = "RELEASE_IMAGE")]
    release_image: String,

    #[clap(long, value_name = "FILE", required_unless_present = "check")]
    registries_out: Option<PathBuf>,

    #[clap(long, value_name = "FILE", required_unless_present = "check")]
    policy_out: Option<PathBuf>,

    /// Where to write the search registries drop-in, if search registries are configured.
    #[clap(long, value_name = "FILE")]
    search_registries_out: Option<PathBuf>,

    /// Validates the inputs without writing any output.
    #[clap(long)]
    check: bool,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            compile,
        } = self;

        log_format
            .try_init(log_level)
            .context("failed to initialize logging")?;
        compile.run().await
    }
}

impl Compile {
    async fn run(self) -> Result<()> {
        let Self {
            snapshots,
            registries_template,
            policy_template,
            release_image,
            registries_out,
            policy_out,
            search_registries_out,
            check,
        } = self;

        let mut snapshot = Snapshot::default();
        for path in &snapshots {
            let yaml = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("failed to read snapshot {}", path.display()))?;
            snapshot
                .extend_from_yaml(&yaml)
                .with_context(|| format!("failed to load snapshot {}", path.display()))?;
        }
        snapshot.sort();

        let registries_template = read(&registries_template).await?;
        let policy_template = read(&policy_template).await?;
        let sources = snapshot.registry_sources();
        let compiled = core::compile(&Inputs {
            insecure: &sources.insecure_registries,
            blocked: &sources.blocked_registries,
            allowed: &sources.allowed_registries,
            search: &sources.container_runtime_search_registries,
            mirror_sets: snapshot.mirror_sets(),
            release_image: &release_image,
            registries_template: &registries_template,
            policy_template: &policy_template,
        })
        .context("failed to compile registry configuration")?;

        if check {
            info!("Registry configuration is valid");
            return Ok(());
        }

        let Compiled {
            registries,
            policy,
            search_registries,
        } = compiled;
        let mut outputs = Vec::with_capacity(3);
        outputs.extend(registries_out.map(|path| (path, registries)));
        outputs.extend(policy_out.map(|path| (path, policy)));
        let mut stale = None;
        match (search_registries_out, search_registries) {
            (Some(path), Some(search)) => outputs.push((path, search)),
            (Some(path), None) => stale = Some(path),
            (None, Some(_)) => {
                debug!("Search registries are configured but no drop-in path was provided")
            }
            (None, None) => {}
        }

        write_all(&outputs).await?;
        if let Some(path) = stale {
            remove_stale(&path).await?;
        }

        Ok(())
    }
}

async fn read(path: &Path) -> Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read template {}", path.display()))
}

/// Writes every output next to its destination before moving any of them into place, so that a
/// failed write leaves the previous outputs untouched.
async fn write_all(outputs: &[(PathBuf, Vec<u8>)]) -> Result<()> {
    let mut staged = Vec::with_capacity(outputs.len());
    for (path, contents) in outputs {
        let tmp = staging_path(path)?;
        if let Err(error) = tokio::fs::write(&tmp, contents).await {
            for tmp in staged.iter().chain(Some(&tmp)) {
                let _ = tokio::fs::remove_file(tmp).await;
            }
            return Err(error).with_context(|| format!("failed to write {}", path.display()));
        }
        staged.push(tmp);
    }

    for (tmp, (path, contents)) in staged.iter().zip(outputs) {
        tokio::fs::rename(tmp, path)
            .await
            .with_context(|| format!("failed to replace {}", path.display()))?;
        info!(path = %path.display(), bytes = contents.len(), "Wrote configuration");
    }
    Ok(())
}

fn staging_path(path: &Path) -> Result<PathBuf> {
    let name = path
        .file_name()
        .ok_or_else(|| anyhow!("output path {} has no file name", path.display()))?;
    let mut tmp = OsString::from(".");
    tmp.push(name);
    tmp.push(".tmp");
    Ok(path.with_file_name(tmp))
}

async fn remove_stale(path: &Path) -> Result<()> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            info!(path = %path.display(), "Removed search registries drop-in");
            Ok(())
        }
        Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(error) => {
            Err(error).with_context(|| format!("failed to remove stale {}", path.display()))
        }
    }
}
