use std::fs;
use std::path::PathBuf;

use crate::execution::CommandSpec;
use crate::integration::{DesktopIntegration, IntegrationReport, IntegrationStep, IntegrationWarning};

const DEFAULTS_SECTION: &str = "[Default Applications]";

pub fn mime_type(app_name: &str, extension: &str) -> String {
    format!("application/x-{app_name}-{}", extension.trim_start_matches('.'))
}

pub fn mime_package_xml(app_name: &str, extension: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <mime-info xmlns=\"http://www.freedesktop.org/standards/shared-mime-info\">\n  \
         <mime-type type=\"{mime}\">\n    \
         <comment>{app} {ext} file</comment>\n    \
         <glob pattern=\"*{ext}\"/>\n  \
         </mime-type>\n\
         </mime-info>\n",
        mime = escape_xml(&mime_type(app_name, extension)),
        app = escape_xml(app_name),
        ext = escape_xml(extension),
    )
}

/// Sets `mime=desktop_file` under `[Default Applications]` in a `defaults.list` body.
///
/// Other sections and lines are kept as they were; the section is appended when missing.
pub fn merge_defaults(existing: &str, mime: &str, desktop_file: &str) -> String {
    let association = format!("{mime}={desktop_file}");
    let mut lines: Vec<String> = existing.lines().map(str::to_string).collect();

    let mut in_defaults = false;
    let mut section_end = None;
    let mut replaced = false;
    for (index, line) in lines.iter_mut().enumerate() {
        let trimmed = line.trim();
        if trimmed.starts_with('[') && trimmed.ends_with(']') {
            in_defaults = trimmed == DEFAULTS_SECTION;
            if in_defaults {
                section_end = Some(index);
            }
            continue;
        }
        if !in_defaults {
            continue;
        }
        if !trimmed.is_empty() {
            section_end = Some(index);
        }
        if matches!(line.split_once('='), Some((key, _)) if key.trim() == mime) {
            *line = association.clone();
            replaced = true;
        }
    }

    if !replaced {
        match section_end {
            Some(index) => lines.insert(index + 1, association),
            None => {
                lines.push(DEFAULTS_SECTION.to_string());
                lines.push(association);
            }
        }
    }

    let mut merged = lines.join("\n");
    merged.push('\n');
    merged
}

impl DesktopIntegration {
    /// Registers one synthetic mime type per extension and makes `<app>.desktop` its default handler.
    pub fn associate_mime(&self, app_name: &str, extensions: &[&str]) -> IntegrationReport {
        let mut report = IntegrationReport::default();
        let step = IntegrationStep::MimeAssociation;
        let packages_dir = self.layout().mime_packages_dir();

        if let Err(error) = fs::create_dir_all(&packages_dir) {
            report.warn(IntegrationWarning::io(step, "create", &packages_dir, error));
            return report;
        }

        let mut registered = Vec::new();
        for extension in extensions {
            let suffix = extension.trim_start_matches('.');
            let path = packages_dir.join(format!("{app_name}-{suffix}.xml"));
            match fs::write(&path, mime_package_xml(app_name, extension)) {
                Ok(()) => {
                    report.artifacts.push(path);
                    registered.push(mime_type(app_name, extension));
                }
                Err(error) => report.warn(IntegrationWarning::io(step, "write", &path, error)),
            }
        }

        if registered.is_empty() {
            return report;
        }

        if let Err(warning) = self.run_tool(
            step,
            CommandSpec::new("update-mime-database").arg(self.layout().mime_dir.to_string_lossy()),
        ) {
            report.warn(warning);
        }

        report.record(self.write_defaults(app_name, &registered));
        report
    }

    fn write_defaults(
        &self,
        app_name: &str,
        mime_types: &[String],
    ) -> Result<Vec<PathBuf>, IntegrationWarning> {
        let step = IntegrationStep::MimeAssociation;
        let path = self.layout().defaults_list();

        let mut body = match fs::read_to_string(&path) {
            Ok(body) => body,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(error) => return Err(IntegrationWarning::io(step, "read", &path, error)),
        };

        let desktop_file = format!("{app_name}.desktop");
        for mime in mime_types {
            body = merge_defaults(&body, mime, &desktop_file);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| IntegrationWarning::io(step, "create", parent, error))?;
        }
        fs::write(&path, body).map_err(|error| IntegrationWarning::io(step, "write", &path, error))?;
        Ok(vec![path])
    }
}

fn escape_xml(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;

    use super::{merge_defaults, mime_package_xml, mime_type};
    use crate::config::InstallerLayout;
    use crate::integration::DesktopIntegration;
    use crate::integration::test_support::RecordingRunner;

    #[test]
    fn mime_type_drops_leading_dot() {
        assert_eq!(mime_type("tool", ".tar.gz"), "application/x-tool-tar.gz");
    }

    #[test]
    fn package_xml_declares_glob() {
        let xml = mime_package_xml("tool", ".run");
        assert!(xml.contains("<mime-type type=\"application/x-tool-run\">"));
        assert!(xml.contains("<glob pattern=\"*.run\"/>"));
        assert!(xml.contains("<comment>tool .run file</comment>"));
    }

    #[test]
    fn merge_keeps_unrelated_lines_and_replaces_existing_key() {
        let existing = "[Default Applications]\ntext/plain=gedit.desktop\napplication/x-tool-run=old.desktop\n";
        let merged = merge_defaults(existing, "application/x-tool-run", "tool.desktop");
        assert_eq!(
            merged,
            "[Default Applications]\ntext/plain=gedit.desktop\napplication/x-tool-run=tool.desktop\n"
        );
    }

    #[test]
    fn merge_stays_inside_default_applications() {
        let existing = "[Default Applications]\ntext/plain=gedit.desktop\n\
                        [Removed Associations]\nimage/png=eog.desktop\n";
        let merged = merge_defaults(existing, "application/x-tool-run", "tool.desktop");
        assert_eq!(
            merged,
            "[Default Applications]\ntext/plain=gedit.desktop\napplication/x-tool-run=tool.desktop\n\
             [Removed Associations]\nimage/png=eog.desktop\n"
        );
    }

    #[test]
    fn merge_ignores_same_key_in_foreign_section() {
        let existing = "[Added Associations]\napplication/x-tool-run=other.desktop\n";
        let merged = merge_defaults(existing, "application/x-tool-run", "tool.desktop");
        assert_eq!(
            merged,
            "[Added Associations]\napplication/x-tool-run=other.desktop\n\
             [Default Applications]\napplication/x-tool-run=tool.desktop\n"
        );
    }

    #[test]
    fn merge_into_empty_file_adds_section_header() {
        assert_eq!(
            merge_defaults("", "application/x-a-run", "a.desktop"),
            "[Default Applications]\napplication/x-a-run=a.desktop\n"
        );
    }

    #[test]
    fn association_writes_packages_and_updates_databases() {
        let home = tempfile::tempdir().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let integration =
            DesktopIntegration::new(InstallerLayout::rooted(home.path()), runner.clone());

        let report = integration.associate_mime("tool", &[".tar.gz", ".tgz"]);

        assert!(!report.is_degraded());
        assert!(home.path().join(".local/share/mime/packages/tool-tar.gz.xml").is_file());
        assert!(home.path().join(".local/share/mime/packages/tool-tgz.xml").is_file());
        assert_eq!(runner.argvs().len(), 1);
        assert_eq!(runner.argvs()[0][0], "update-mime-database");

        let defaults =
            fs::read_to_string(home.path().join(".local/share/applications/defaults.list")).unwrap();
        assert!(defaults.contains("application/x-tool-tar.gz=tool.desktop\n"));
        assert!(defaults.contains("application/x-tool-tgz=tool.desktop\n"));
    }
}
