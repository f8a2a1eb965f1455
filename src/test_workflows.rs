use std::{
    fs,
    path::{Path, PathBuf},
    thread,
    time::Duration,
};

use assert_matches::assert_matches;
use tempfile::TempDir;

use hostdeps_meta::{
    error::{ArchiveError, Error as LocateError},
    test::{protobuf_block, tarball, write_host},
};

use crate::{
    config::{Config, PROTOBUF},
    error::Error,
    generate::{generate, Mode},
    install::{build_steps, install},
    runner::{CommandError, Runner, Step},
};

const URL: &str = "https://example.org/v1.2.3.tar.gz";

/// Records the steps it is asked to run and fails the one matching `fail`.
#[derive(Debug, Default)]
struct Recorder {
    steps: Vec<String>,
    dirs: Vec<Option<PathBuf>>,
    fail: Option<&'static str>,
}

impl Runner for Recorder {
    fn run(&mut self, step: &Step) -> Result<(), CommandError> {
        self.steps.push(step.to_string());
        self.dirs.push(step.dir.clone());
        match self.fail {
            Some(fail) if step.to_string() == fail => {
                Err(CommandError::Failed(step.to_string(), Some(2)))
            }
            _ => Ok(()),
        }
    }
}

fn scratch() -> TempDir {
    tempfile::tempdir().expect("Failed to create scratch directory")
}

fn host(dir: &Path, url: &str) -> Config {
    write_host(&dir.join("tf"), &protobuf_block(url, "protobuf-1.2.3"))
        .expect("Failed to write host tree");
    Config::new(dir, "tf")
}

/// A host whose protobuf block points at a local archive with `files` under `root/`.
fn host_with_archive(dir: &Path, root: &str, files: &[(&str, &str)]) -> Config {
    let archive = dir.join("mirror/protobuf-1.2.3.tar.gz");
    fs::create_dir_all(archive.parent().unwrap()).unwrap();
    fs::write(&archive, tarball(root, files).unwrap()).unwrap();

    let mut config = host(dir, &format!("file://{}", archive.display()))
        .with_install_dir(Some("prefix".into()))
        .with_download_dir(Some("dl".into()));
    config.jobs = 2;
    config
}

fn release_tree() -> Vec<(&'static str, &'static str)> {
    vec![
        ("configure", "#!/bin/sh\nexit 0\n"),
        ("src/google/protobuf/message.h", "// message.h\n"),
    ]
}

#[test]
fn generate_external() -> Result<(), Error> {
    let dir = scratch();
    let config = host(dir.path(), URL).with_output_dir(Some("out".into()));

    let generated = generate(&config, Mode::External)?;
    let out = dir.path().join("out");
    assert_eq!(generated.version_file, out.join("Protobuf_VERSION.cmake"));
    assert_eq!(
        fs::read_to_string(&generated.version_file).unwrap(),
        "set(Protobuf_URL https://example.org/v1.2.3.tar.gz)\n"
    );

    assert_eq!(generated.template, out.join("Protobuf_EXTERNAL.cmake"));
    assert_eq!(
        fs::read_to_string(&generated.template).unwrap(),
        PROTOBUF.external.contents
    );
    assert!(!out.join("Protobuf_INSTALLED.cmake").exists());
    assert_eq!(generated.descriptor.archive_name, "v1.2.3.tar.gz");

    Ok(())
}

#[test]
fn generate_installed() -> Result<(), Error> {
    let dir = scratch();
    let prefix = dir.path().join("prefix");
    fs::create_dir_all(prefix.join("include/google/protobuf")).unwrap();

    let config = host(dir.path(), URL)
        .with_output_dir(Some("out".into()))
        .with_install_dir(Some(prefix.clone()));
    let generated = generate(&config, Mode::Installed)?;

    assert_eq!(
        fs::read_to_string(&generated.version_file).unwrap(),
        format!(
            "set(Protobuf_URL https://example.org/v1.2.3.tar.gz)\nset(Protobuf_INSTALL_DIR {})\n",
            prefix.display()
        )
    );
    assert_eq!(
        generated.template,
        dir.path().join("out/Protobuf_INSTALLED.cmake")
    );
    assert_eq!(
        fs::read_to_string(&generated.template).unwrap(),
        PROTOBUF.installed.contents
    );
    assert!(!dir.path().join("out/Protobuf_EXTERNAL.cmake").exists());

    Ok(())
}

#[test]
fn generate_installed_default_prefix() -> Result<(), Error> {
    let dir = scratch();
    let config = host(dir.path(), URL);

    // The default prefix is not checked for headers.
    let generated = generate(&config, Mode::Installed)?;
    assert_eq!(generated.version_file, dir.path().join("Protobuf_VERSION.cmake"));
    assert!(fs::read_to_string(&generated.version_file)
        .unwrap()
        .ends_with("set(Protobuf_INSTALL_DIR /usr/local)\n"));

    Ok(())
}

#[test]
fn generate_not_installed() {
    let dir = scratch();
    let config = host(dir.path(), URL)
        .with_output_dir(Some("out".into()))
        .with_install_dir(Some("empty-prefix".into()));

    let res = generate(&config, Mode::Installed);
    println!("left: {:?}", res);
    assert_matches!(res, Err(Error::NotInstalled(p, _)) if p == dir.path().join("empty-prefix"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn generate_overwrites() -> Result<(), Error> {
    let dir = scratch();
    let config = host(dir.path(), URL);
    fs::write(
        dir.path().join("Protobuf_VERSION.cmake"),
        "set(Protobuf_URL stale)\nset(Protobuf_INSTALL_DIR /stale)\n",
    )
    .unwrap();

    generate(&config, Mode::External)?;
    assert_eq!(
        fs::read_to_string(dir.path().join("Protobuf_VERSION.cmake")).unwrap(),
        "set(Protobuf_URL https://example.org/v1.2.3.tar.gz)\n"
    );

    Ok(())
}

#[test]
fn template_dir() -> Result<(), Error> {
    let dir = scratch();
    let templates = dir.path().join("templates");
    fs::create_dir_all(&templates).unwrap();
    fs::write(templates.join("Protobuf_EXTERNAL.cmake"), "# custom\n").unwrap();

    let config = host(dir.path(), URL)
        .with_output_dir(Some("out".into()))
        .with_template_dir(Some("templates".into()));
    let generated = generate(&config, Mode::External)?;
    assert_eq!(fs::read_to_string(generated.template).unwrap(), "# custom\n");

    // Installed mode needs a template the directory doesn't have.
    let res = generate(&config, Mode::Installed);
    println!("left: {:?}", res);
    let message = res.as_ref().map_err(ToString::to_string).err();
    assert_eq!(
        message,
        Some(format!(
            "failed to copy {}",
            templates.join("Protobuf_INSTALLED.cmake").display()
        ))
    );
    assert_matches!(
        res,
        Err(Error::Io("copy", p, _)) if p == templates.join("Protobuf_INSTALLED.cmake")
    );

    Ok(())
}

#[test]
fn generate_missing_metadata() {
    let dir = scratch();
    write_host(
        &dir.path().join("tf"),
        r#"native.http_archive(name = "protobuf", url = "https://example.org/v1.tar.gz")"#,
    )
    .unwrap();
    let config = Config::new(dir.path(), "tf");

    let res = generate(&config, Mode::External);
    println!("left: {:?}", res);
    assert_matches!(res, Err(Error::Locate(LocateError::MetadataMissing(_))));
    assert!(!dir.path().join("Protobuf_VERSION.cmake").exists());

    let res = generate(&Config::new(dir.path(), "missing"), Mode::External);
    println!("left: {:?}", res);
    assert_matches!(res, Err(Error::Locate(LocateError::HostSourceNotFound(..))));
}

#[test]
fn steps() {
    let dir = scratch();
    let steps: Vec<_> = build_steps(dir.path(), Path::new("/opt/pb"), 4)
        .iter()
        .map(Step::to_string)
        .collect();
    assert_eq!(
        steps,
        ["./configure --prefix=/opt/pb", "make -j4", "make install"]
    );

    fs::write(dir.path().join("autogen.sh"), "#!/bin/sh\n").unwrap();
    let steps = build_steps(dir.path(), Path::new("/opt/pb"), 0);
    assert_eq!(steps[0].to_string(), "./autogen.sh");
    assert_eq!(steps[2].to_string(), "make -j1");
    assert!(steps.iter().all(|s| s.dir.as_deref() == Some(dir.path())));
}

#[test]
fn install_replaces_previous_tree() -> Result<(), Error> {
    let dir = scratch();
    let config = host_with_archive(dir.path(), "protobuf-1.2.3", &release_tree());

    let stale = dir.path().join("dl/protobuf-1.2.3");
    fs::create_dir_all(&stale).unwrap();
    fs::write(stale.join("stale.txt"), "old build").unwrap();

    let mut runner = Recorder::default();
    let descriptor = install(&config, &mut runner)?;
    assert_eq!(descriptor.extracted_folder_name, "protobuf-1.2.3");

    assert!(!stale.join("stale.txt").exists());
    assert!(stale.join("configure").is_file());
    assert!(stale.join("src/google/protobuf/message.h").is_file());
    // The downloaded archive is removed once installed.
    assert!(!dir.path().join("dl/protobuf-1.2.3.tar.gz").exists());

    let prefix = dir.path().join("prefix");
    assert_eq!(
        runner.steps,
        [
            format!("./configure --prefix={}", prefix.display()),
            "make -j2".into(),
            "make install".into(),
            "ldconfig".into(),
        ]
    );
    assert!(runner.dirs[..3].iter().all(|d| d.as_deref() == Some(&*stale)));
    assert_eq!(runner.dirs[3], None);

    Ok(())
}

#[test]
fn install_keeps_folders_outside_download_dir() {
    let dir = scratch();
    let victim = dir.path().join("victim");
    fs::create_dir_all(&victim).unwrap();
    fs::write(victim.join("precious.txt"), "keep me").unwrap();
    fs::create_dir_all(dir.path().join("dl")).unwrap();

    for strip_prefix in [victim.display().to_string(), "../victim".into()] {
        write_host(
            &dir.path().join("tf"),
            &protobuf_block("file:///nonexistent/v1.2.3.tar.gz", &strip_prefix),
        )
        .unwrap();
        let config = Config::new(dir.path(), "tf").with_download_dir(Some("dl".into()));

        let mut runner = Recorder::default();
        let res = install(&config, &mut runner);
        println!("{}: {:?}", strip_prefix, res);
        assert_matches!(res, Err(Error::Locate(LocateError::MetadataMissing(_))));
        assert!(victim.join("precious.txt").is_file());
        assert!(runner.steps.is_empty());
    }
}

#[test]
fn install_autogen() -> Result<(), Error> {
    let dir = scratch();
    let mut files = release_tree();
    files.push(("autogen.sh", "#!/bin/sh\n"));
    let mut config = host_with_archive(dir.path(), "protobuf-1.2.3", &files);
    config.ldconfig = false;

    let mut runner = Recorder::default();
    install(&config, &mut runner)?;
    assert_eq!(runner.steps.first().map(String::as_str), Some("./autogen.sh"));
    assert_eq!(runner.steps.last().map(String::as_str), Some("make install"));

    Ok(())
}

#[test]
fn install_stops_at_first_failure() {
    let dir = scratch();
    let config = host_with_archive(dir.path(), "protobuf-1.2.3", &release_tree());

    let mut runner = Recorder {
        fail: Some("make -j2"),
        ..Default::default()
    };
    let res = install(&config, &mut runner);
    println!("left: {:?}", res);
    assert_matches!(
        res,
        Err(Error::Command(CommandError::Failed(cmd, Some(2)))) if cmd == "make -j2"
    );
    assert_eq!(runner.steps.len(), 2);

    // Nothing is cleaned up after a failure.
    assert!(dir.path().join("dl/protobuf-1.2.3.tar.gz").is_file());
    assert!(dir.path().join("dl/protobuf-1.2.3/configure").is_file());
}

#[test]
fn install_bad_archive() {
    let dir = scratch();
    let archive = dir.path().join("mirror/protobuf-1.2.3.tar.gz");
    fs::create_dir_all(archive.parent().unwrap()).unwrap();
    fs::write(&archive, "<html>not found</html>").unwrap();
    let config = host(dir.path(), &format!("file://{}", archive.display()))
        .with_download_dir(Some("dl".into()));

    let stale = dir.path().join("dl/protobuf-1.2.3");
    fs::create_dir_all(&stale).unwrap();

    let mut runner = Recorder::default();
    let res = install(&config, &mut runner);
    println!("left: {:?}", res);
    assert_matches!(res, Err(Error::Archive(ArchiveError::DecompressError(..))));
    assert!(runner.steps.is_empty());
    assert!(!stale.exists());
}

#[test]
fn install_wrong_root_folder() {
    let dir = scratch();
    let config = host_with_archive(dir.path(), "protobuf-main", &release_tree());

    let mut runner = Recorder::default();
    let res = install(&config, &mut runner);
    println!("left: {:?}", res);
    assert_matches!(res, Err(Error::MissingFolder(p)) if p.ends_with("protobuf-1.2.3"));
    assert!(runner.steps.is_empty());
}

#[test]
fn install_invalid_checksum() {
    let dir = scratch();
    let archive = dir.path().join("protobuf-1.2.3.tar.gz");
    fs::write(&archive, tarball("protobuf-1.2.3", &release_tree()).unwrap()).unwrap();
    write_host(
        &dir.path().join("tf"),
        &format!(
            r#"
            native.http_archive(
                name = "protobuf",
                sha256 = "1234",
                url = "file://{}",
                strip_prefix = "protobuf-1.2.3",
            )
            "#,
            archive.display()
        ),
    )
    .unwrap();
    let config = Config::new(dir.path(), "tf").with_download_dir(Some("dl".into()));

    let mut runner = Recorder::default();
    let res = install(&config, &mut runner);
    println!("left: {:?}", res);
    assert_matches!(
        res,
        Err(Error::Archive(ArchiveError::InvalidChecksum(_, expected, _))) if expected == "1234"
    );
    assert!(!dir.path().join("dl/protobuf-1.2.3.tar.gz").exists());
    assert!(runner.steps.is_empty());
}

#[test]
fn install_download() -> Result<(), Error> {
    use tiny_http::{Response, Server, StatusCode};

    let dir = scratch();
    let data = tarball("protobuf-1.2.3", &release_tree()).unwrap();
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();

    let (res, missing) = thread::scope(|s| {
        s.spawn(|| loop {
            let Ok(Some(req)) = server.recv_timeout(Duration::new(3, 0)) else {
                break;
            };
            let _ = if req.url() == "/archive/v1.2.3.tar.gz" {
                req.respond(Response::from_data(data.clone()))
            } else {
                req.respond(Response::new_empty(StatusCode(404)))
            };
        });

        let mut config = host(
            dir.path(),
            &format!("http://{}/archive/v1.2.3.tar.gz", addr),
        )
        .with_install_dir(Some("prefix".into()))
        .with_download_dir(Some("dl".into()));
        config.ldconfig = false;
        let res = install(&config, &mut Recorder::default());

        let missing_host = dir.path().join("missing");
        write_host(
            &missing_host.join("tf"),
            &protobuf_block(&format!("http://{}/not_found.tar.gz", addr), "protobuf-1.2.3"),
        )
        .unwrap();
        let missing = install(
            &Config::new(&missing_host, "tf"),
            &mut Recorder::default(),
        );

        server.unblock();
        (res, missing)
    });

    let descriptor = res?;
    assert_eq!(descriptor.archive_name, "v1.2.3.tar.gz");
    assert!(dir.path().join("dl/protobuf-1.2.3/configure").is_file());
    assert!(!dir.path().join("dl/v1.2.3.tar.gz").exists());

    println!("left: {:?}", missing);
    assert_matches!(missing, Err(Error::Archive(ArchiveError::DownloadError(..))));

    Ok(())
}
