use std::{fs, path::PathBuf};

use hostdeps_meta::locate::Descriptor;

use crate::{config::Config, error::Error};

/// How the generated CMake files find the dependency.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// Download and build a fresh copy from the declared url.
    External,
    /// Use an existing installation.
    Installed,
}

/// Files written by [`generate`].
#[derive(Debug)]
pub struct Generated {
    pub descriptor: Descriptor,
    pub version_file: PathBuf,
    pub template: PathBuf,
}

/// Writes the version metadata file and the template for `mode` into the output
/// directory.
///
/// In installed mode an explicitly given install prefix must already contain the
/// dependency's headers. The default prefix is not checked.
pub fn generate(config: &Config, mode: Mode) -> Result<Generated, Error> {
    let profile = config.profile;
    let descriptor = config.locate()?;

    if mode == Mode::Installed {
        if let Some(dir) = &config.install_dir {
            if !dir.join(profile.header_dir).is_dir() {
                return Err(Error::NotInstalled(dir.clone(), profile.header_dir));
            }
        }
    }

    let out = &config.output_dir;
    fs::create_dir_all(out).map_err(|e| Error::Io("create", out.clone(), e))?;

    let cmake = profile.cmake_name();
    let mut contents = format!("set({}_URL {})\n", cmake, descriptor.fetch_url);
    if mode == Mode::Installed {
        contents.push_str(&format!(
            "set({}_INSTALL_DIR {})\n",
            cmake,
            config.install_prefix().display()
        ));
    }

    let version_file = out.join(profile.version_file());
    fs::write(&version_file, contents).map_err(|e| Error::Io("write", version_file.clone(), e))?;
    tracing::info!(file = %version_file.display(), "wrote version metadata");

    let template = profile.template(mode);
    let dst = out.join(template.file_name);
    match &config.template_dir {
        Some(dir) => {
            let src = dir.join(template.file_name);
            fs::copy(&src, &dst).map_err(|e| Error::Io("copy", src, e))?;
        }
        None => fs::write(&dst, template.contents)
            .map_err(|e| Error::Io("write", dst.clone(), e))?,
    }
    tracing::info!(file = %dst.display(), ?mode, "copied template");

    Ok(Generated {
        descriptor,
        version_file,
        template: dst,
    })
}
