use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::execution::{CommandSpec, ProcessSpawnRequest};
use crate::integration::{DesktopIntegration, IntegrationResult, IntegrationStep, IntegrationWarning};

pub const ICON_EXTRACT_TIMEOUT: Duration = Duration::from_secs(10);

// Extraction lands in `<cwd>/squashfs-root`.
const EXTRACT_ROOT: &str = "squashfs-root";
const EXTRACT_PATTERNS: [&str; 2] = [".DirIcon", "*.png"];

fn icon_candidates(app_name: &str) -> [String; 4] {
    [
        ".DirIcon".to_string(),
        "icon.png".to_string(),
        "Icon.png".to_string(),
        format!("{app_name}.png"),
    ]
}

impl DesktopIntegration {
    /// Copies the AppImage's bundled icon to `<icons dir>/<app>.png`.
    pub fn extract_appimage_icon(&self, appimage: &Path, app_name: &str) -> IntegrationResult<PathBuf> {
        let step = IntegrationStep::IconExtraction;
        let scratch = tempfile::tempdir().map_err(|error| {
            IntegrationWarning::new(step, format!("failed to create scratch directory: {error}"))
        })?;

        let mut extracted_any = false;
        let mut last_failure = None;
        for pattern in EXTRACT_PATTERNS {
            let request = ProcessSpawnRequest::new(
                CommandSpec::new(appimage)
                    .args(["--appimage-extract", pattern])
                    .working_dir(scratch.path()),
            )
            .timeout(ICON_EXTRACT_TIMEOUT);

            match self.runner.run(request) {
                Ok(_) => extracted_any = true,
                Err(error) => {
                    tracing::debug!(
                        path = %appimage.display(),
                        pattern,
                        message = %error.message,
                        "appimage extraction failed"
                    );
                    last_failure = Some(error.message);
                }
            }
        }

        if !extracted_any {
            return Err(IntegrationWarning::new(
                step,
                last_failure.unwrap_or_else(|| "extraction produced nothing".to_string()),
            ));
        }

        let root = scratch.path().join(EXTRACT_ROOT);
        fs::create_dir_all(&self.layout.icons_dir).map_err(|error| {
            IntegrationWarning::io(step, "create", &self.layout.icons_dir, error)
        })?;
        let destination = self.layout.icons_dir.join(format!("{app_name}.png"));

        // `.DirIcon` is usually a symlink whose target may not have been extracted.
        for candidate in icon_candidates(app_name) {
            let source = root.join(&candidate);
            if fs::copy(&source, &destination).is_ok() {
                tracing::debug!(icon = %destination.display(), source = %candidate, "extracted appimage icon");
                return Ok(destination);
            }
        }

        Err(IntegrationWarning::new(
            step,
            format!("no icon found in '{}'", appimage.display()),
        ))
    }
}
