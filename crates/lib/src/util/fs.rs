use std::fs;
use std::io;
use std::path::Path;

/// Copy `src` to `dest`, creating any missing parent directories of `dest`.
///
/// Returns the number of bytes copied.
pub fn copy_creating_parents(src: &Path, dest: &Path) -> io::Result<u64> {
  if let Some(parent) = dest.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent)?;
  }
  fs::copy(src, dest)
}
