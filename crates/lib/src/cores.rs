//! Downloader for prebuilt emulator cores.
//!
//! Each core ships as one zip per ABI on the nightly buildbot:
//!
//! ```text
//! {base}/arm64-v8a/{core}_libretro_android.so.zip
//! ```
//!
//! The zip is saved into `jniLibs/<abi>/`, extracted there, then removed.

use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum CoreError {
  #[error("core name must not be empty")]
  EmptyName,

  #[error("failed to download {url}: {source}")]
  Request {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("failed to download {url}: HTTP {status}")]
  Status { url: String, status: reqwest::StatusCode },

  #[error("I/O error at {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to extract {path}: {source}")]
  Archive {
    path: PathBuf,
    #[source]
    source: zip::result::ZipError,
  },

  #[error("archive {path} contains an entry escaping the target directory: {name}")]
  UnsafeEntry { path: PathBuf, name: String },
}

fn io_err(path: &Path) -> impl FnOnce(io::Error) -> CoreError {
  move |source| CoreError::Io {
    path: path.to_path_buf(),
    source,
  }
}

/// Download location of `core` for `abi`.
pub fn core_url(base_url: &str, abi: &str, core: &str) -> String {
  format!("{}/{}/{}_libretro_android.so.zip", base_url.trim_end_matches('/'), abi, core)
}

/// Replace the native libraries of every ABI in `abis` with `core`.
///
/// Each ABI directory under `jni_libs_dir` is wiped first, so a failed
/// download leaves it empty rather than holding a stale core. Returns the
/// extracted files.
pub async fn fetch_core(core: &str, base_url: &str, jni_libs_dir: &Path, abis: &[&str]) -> Result<Vec<PathBuf>, CoreError> {
  let core = core.trim();
  if core.is_empty() {
    return Err(CoreError::EmptyName);
  }

  let client = reqwest::Client::new();
  let mut extracted = Vec::new();

  for abi in abis {
    let abi_dir = jni_libs_dir.join(abi);
    reset_dir(&abi_dir).await?;

    let url = core_url(base_url, abi, core);
    info!(core = %core, abi = %abi, url = %url, "downloading core");
    let bytes = download(&client, &url).await?;

    let archive_path = abi_dir.join(format!("{}_libretro_android.so.zip", core));
    tokio::fs::write(&archive_path, &bytes)
      .await
      .map_err(io_err(&archive_path))?;

    extracted.extend(extract_zip(&archive_path, &abi_dir)?);

    tokio::fs::remove_file(&archive_path)
      .await
      .map_err(io_err(&archive_path))?;
    debug!(abi = %abi, size = bytes.len(), "core installed");
  }

  info!(core = %core, files = extracted.len(), "core fetch complete");
  Ok(extracted)
}

async fn reset_dir(dir: &Path) -> Result<(), CoreError> {
  match tokio::fs::remove_dir_all(dir).await {
    Ok(()) => debug!(path = ?dir, "removed previous libraries"),
    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
    Err(e) => return Err(io_err(dir)(e)),
  }
  tokio::fs::create_dir_all(dir).await.map_err(io_err(dir))
}

async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, CoreError> {
  let request_err = |source| CoreError::Request {
    url: url.to_string(),
    source,
  };

  let response = client.get(url).send().await.map_err(request_err)?;
  let status = response.status();
  if !status.is_success() {
    return Err(CoreError::Status {
      url: url.to_string(),
      status,
    });
  }

  Ok(response.bytes().await.map_err(request_err)?.to_vec())
}

/// Extract every file entry of `archive_path` into `dest`, keeping relative paths.
pub fn extract_zip(archive_path: &Path, dest: &Path) -> Result<Vec<PathBuf>, CoreError> {
  let zip_err = |source| CoreError::Archive {
    path: archive_path.to_path_buf(),
    source,
  };

  let file = File::open(archive_path).map_err(io_err(archive_path))?;
  let mut archive = zip::ZipArchive::new(BufReader::new(file)).map_err(zip_err)?;
  let mut written = Vec::new();

  for i in 0..archive.len() {
    let mut entry = archive.by_index(i).map_err(zip_err)?;
    let relative = entry.enclosed_name().ok_or_else(|| CoreError::UnsafeEntry {
      path: archive_path.to_path_buf(),
      name: entry.name().to_string(),
    })?;
    let dest_path = dest.join(relative);

    if entry.is_dir() {
      fs::create_dir_all(&dest_path).map_err(io_err(&dest_path))?;
      continue;
    }

    if let Some(parent) = dest_path.parent() {
      fs::create_dir_all(parent).map_err(io_err(parent))?;
    }
    let mut out = File::create(&dest_path).map_err(io_err(&dest_path))?;
    io::copy(&mut entry, &mut out).map_err(io_err(&dest_path))?;

    #[cfg(unix)]
    {
      use std::os::unix::fs::PermissionsExt;
      if let Some(mode) = entry.unix_mode() {
        fs::set_permissions(&dest_path, fs::Permissions::from_mode(mode)).map_err(io_err(&dest_path))?;
      }
    }

    written.push(dest_path);
  }

  Ok(written)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::{Cursor, Write};
  use tempfile::TempDir;
  use zip::write::SimpleFileOptions;

  fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
      writer.start_file(*name, SimpleFileOptions::default()).unwrap();
      writer.write_all(content.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
  }

  #[test]
  fn core_url_layout() {
    assert_eq!(
      core_url("http://host/latest/", "x86", "mgba"),
      "http://host/latest/x86/mgba_libretro_android.so.zip"
    );
  }

  #[test]
  fn extract_zip_writes_entries() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("core.zip");
    fs::write(&archive, zip_bytes(&[("mgba_libretro_android.so", "elf")])).unwrap();

    let out = temp.path().join("out");
    let written = extract_zip(&archive, &out).unwrap();

    assert_eq!(written, vec![out.join("mgba_libretro_android.so")]);
    assert_eq!(fs::read_to_string(&written[0]).unwrap(), "elf");
  }

  #[test]
  fn extract_zip_rejects_garbage() {
    let temp = TempDir::new().unwrap();
    let archive = temp.path().join("core.zip");
    fs::write(&archive, "not a zip").unwrap();

    let err = extract_zip(&archive, temp.path()).unwrap_err();
    assert!(matches!(err, CoreError::Archive { .. }));
  }

  #[tokio::test]
  async fn empty_core_name_is_rejected() {
    let temp = TempDir::new().unwrap();
    let err = fetch_core("  ", "http://unused", temp.path(), &["x86"]).await.unwrap_err();
    assert!(matches!(err, CoreError::EmptyName));
  }

  #[tokio::test]
  async fn fetch_core_replaces_each_abi_dir() {
    let mut server = mockito::Server::new_async().await;
    let mut mocks = Vec::new();
    for abi in ["arm64-v8a", "x86"] {
      let body = zip_bytes(&[("mgba_libretro_android.so", abi)]);
      let mock = server
        .mock("GET", format!("/{}/mgba_libretro_android.so.zip", abi).as_str())
        .with_status(200)
        .with_body(body)
        .create_async()
        .await;
      mocks.push(mock);
    }

    let temp = TempDir::new().unwrap();
    let jni = temp.path().join("jniLibs");
    fs::create_dir_all(jni.join("x86")).unwrap();
    fs::write(jni.join("x86/old_libretro_android.so"), "stale").unwrap();

    let files = fetch_core("mgba", &server.url(), &jni, &["arm64-v8a", "x86"]).await.unwrap();

    for mock in &mocks {
      mock.assert_async().await;
    }
    assert_eq!(files.len(), 2);
    assert_eq!(
      fs::read_to_string(jni.join("x86/mgba_libretro_android.so")).unwrap(),
      "x86"
    );
    assert!(!jni.join("x86/old_libretro_android.so").exists());
    assert!(!jni.join("x86/mgba_libretro_android.so.zip").exists());
  }

  #[tokio::test]
  async fn http_error_is_reported() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
      .mock("GET", "/x86/nope_libretro_android.so.zip")
      .with_status(404)
      .create_async()
      .await;

    let temp = TempDir::new().unwrap();
    let err = fetch_core("nope", &server.url(), temp.path(), &["x86"]).await.unwrap_err();

    match err {
      CoreError::Status { status, .. } => assert_eq!(status.as_u16(), 404),
      other => panic!("expected status error, got {:?}", other),
    }
  }
}
