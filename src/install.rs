use std::{fs, path::Path};

use hostdeps_meta::{archive, locate::Descriptor};

use crate::{
    config::Config,
    error::Error,
    runner::{Runner, Step},
};

/// The autotools sequence for a source tree unpacked at `source_dir`.
///
/// `autogen.sh` only runs when the tree ships one, release tarballs come with
/// `configure` already generated.
pub fn build_steps(source_dir: &Path, prefix: &Path, jobs: usize) -> Vec<Step> {
    let mut steps = Vec::new();
    if source_dir.join("autogen.sh").is_file() {
        steps.push(Step::new("./autogen.sh"));
    }
    steps.push(Step::new("./configure").arg(format!("--prefix={}", prefix.display())));
    steps.push(Step::new("make").arg(format!("-j{}", jobs.max(1))));
    steps.push(Step::new("make").arg("install"));

    steps
        .into_iter()
        .map(|step| step.current_dir(source_dir))
        .collect()
}

/// Downloads, builds and installs the dependency declared by the host tree.
///
/// Runs straight through and stops at the first failure, leaving the download
/// directory as it was at that point.
pub fn install(config: &Config, runner: &mut impl Runner) -> Result<Descriptor, Error> {
    let descriptor = config.locate()?;
    let download_dir = &config.download_dir;
    fs::create_dir_all(download_dir).map_err(|e| Error::Io("create", download_dir.clone(), e))?;

    // Always start from a clean tree, even if the archive didn't change.
    let source_dir = download_dir.join(&descriptor.extracted_folder_name);
    if let Ok(meta) = fs::symlink_metadata(&source_dir) {
        tracing::info!(dir = %source_dir.display(), "removing previous source tree");
        let res = if meta.is_dir() {
            fs::remove_dir_all(&source_dir)
        } else {
            fs::remove_file(&source_dir)
        };
        res.map_err(|e| Error::Io("remove", source_dir.clone(), e))?;
    }

    let archive_path = download_dir.join(&descriptor.archive_name);
    tracing::info!(url = %descriptor.fetch_url, dst = %archive_path.display(), "downloading");
    archive::download(
        &descriptor.fetch_url,
        &archive_path,
        descriptor.sha256.as_deref(),
    )?;
    archive::extract(&archive_path, download_dir)?;
    if !source_dir.is_dir() {
        return Err(Error::MissingFolder(source_dir));
    }

    for step in build_steps(&source_dir, config.install_prefix(), config.jobs) {
        runner.run(&step)?;
    }
    if config.ldconfig {
        runner.run(&Step::new("ldconfig"))?;
    } else {
        tracing::debug!("skipping ldconfig");
    }

    fs::remove_file(&archive_path)
        .map_err(|e| Error::Io("remove", archive_path.clone(), e))?;
    tracing::info!(
        prefix = %config.install_prefix().display(),
        "installed {}",
        config.profile.name
    );

    Ok(descriptor)
}
