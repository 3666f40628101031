//! Fake Vina executables for tests.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

/// Writes a pose and a log to whatever `--out` / `--log` point at.
pub(crate) const SUCCESSFUL_RUN: &str = r#"while [ $# -gt 0 ]; do
  case "$1" in
    --out) out="$2"; shift ;;
    --log) log="$2"; shift ;;
  esac
  shift
done
printf 'MODEL 1\nREMARK VINA RESULT:    -7.1      0.000      0.000\nENDMDL\n' > "$out"
printf 'AutoDock Vina v1.2.5\nmode |   affinity | dist from best mode\n-----+------------+----------\n   1         -7.1          0\nError estimate: none\n' > "$log"
echo "Writing output ... done."
"#;

pub(crate) const NO_OUTPUT_RUN: &str = r#"echo "Writing output ... done."
echo "Docking finished" >&2
"#;

/// Write `body` as an executable `/bin/sh` script in `dir`.
///
/// The script is written to a temporary file that is closed before it is
/// renamed into place, so no writable handle exists once it can be executed.
pub(crate) fn fake_vina(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-vina.sh");
    let mut file = tempfile::NamedTempFile::new_in(dir).unwrap();
    write!(file, "#!/bin/sh\n{}\n", body).unwrap();
    let staged = file.into_temp_path();
    std::fs::set_permissions(&staged, std::fs::Permissions::from_mode(0o755)).unwrap();
    staged.persist(&path).unwrap();
    path
}
