//! Common test utilities: scripted stand-ins for the ssh client

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A switch CLI that ignores its ssh arguments and talks over stdio.
///
/// Enable secret is `s3cret`.
pub const FAKE_SWITCH: &str = r#"#!/bin/sh
prompt='sw1>'
printf 'Welcome to sw1\r\n%s' "$prompt"
while IFS= read -r line; do
  printf '%s\r\n' "$line"
  case "$line" in
    'terminal length 0') ;;
    enable)
      printf 'Password: '
      IFS= read -r secret
      printf '\r\n'
      if [ "$secret" = "s3cret" ]; then
        prompt='sw1#'
      else
        printf '%% Access denied\r\n'
      fi
      ;;
    'show version')
      printf 'Cisco IOS Software\r\nuptime is 5 weeks\r\n'
      ;;
    'show interfaces status')
      printf 'Gi1 connected full\r\nGi2 notconnect half\r\n'
      ;;
    'reload')
      exit 0
      ;;
    exit)
      exit 0
      ;;
    *)
      printf '%% Invalid input detected\r\n'
      ;;
  esac
  printf '%s' "$prompt"
done
"#;

/// A client that fails the way ssh does when the port is closed
pub const REFUSED: &str = r#"#!/bin/sh
echo 'ssh: connect to host 10.9.9.9 port 22: Connection refused' >&2
exit 255
"#;

/// A client that connects but never shows a prompt
pub const SILENT: &str = r#"#!/bin/sh
printf 'banner without prompt'
sleep 30
"#;

/// Write an executable script into `dir` and return its path
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, body).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
}

/// Temporary directory holding a single script
pub fn script_dir(name: &str, body: &str) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = write_script(dir.path(), name, body);
    (dir, path)
}
