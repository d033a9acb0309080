use std::path::Path;

pub const GENERIC_ICON: &str = "application-x-executable";
pub const UNINSTALL_ICON: &str = "edit-delete";

const LAUNCHER_CATEGORIES: &str = "Utility;Application;";
const UNINSTALL_CATEGORIES: &str = "Utility;System;";
const COMMENT: &str = "Application installed by appdrop";

/// A freedesktop `[Desktop Entry]` file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DesktopEntry {
    pub name: String,
    pub comment: String,
    pub exec: String,
    pub icon: String,
    pub terminal: bool,
    pub startup_wm_class: Option<String>,
    pub categories: String,
}

impl DesktopEntry {
    pub fn launcher(name: impl Into<String>, target: &Path) -> Self {
        Self {
            name: name.into(),
            comment: COMMENT.to_string(),
            exec: quote_exec_arg(&target.to_string_lossy()),
            icon: GENERIC_ICON.to_string(),
            terminal: false,
            startup_wm_class: None,
            categories: LAUNCHER_CATEGORIES.to_string(),
        }
    }

    /// Entry that removes an installed application; `command` defaults to deleting `install_path`.
    pub fn uninstaller(app_name: &str, install_path: &Path, command: Option<&str>) -> Self {
        let exec = match command {
            Some(command) => command.to_string(),
            None => format!(
                "rm -rf {}",
                quote_exec_arg(&install_path.to_string_lossy())
            ),
        };

        Self {
            name: format!("Uninstall {app_name}"),
            comment: format!("Uninstall {app_name}"),
            exec,
            icon: UNINSTALL_ICON.to_string(),
            terminal: true,
            startup_wm_class: None,
            categories: UNINSTALL_CATEGORIES.to_string(),
        }
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_startup_wm_class(mut self, class: impl Into<String>) -> Self {
        self.startup_wm_class = Some(class.into());
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::from("[Desktop Entry]\nVersion=1.0\nType=Application\n");
        out.push_str(&format!("Name={}\n", single_line(&self.name)));
        out.push_str(&format!("Comment={}\n", single_line(&self.comment)));
        out.push_str(&format!("Exec={}\n", single_line(&self.exec)));
        out.push_str(&format!("Icon={}\n", single_line(&self.icon)));
        out.push_str(&format!("Terminal={}\n", self.terminal));
        if let Some(class) = &self.startup_wm_class {
            out.push_str(&format!("StartupWMClass={}\n", single_line(class)));
        }
        out.push_str(&format!("Categories={}\n", self.categories));
        out
    }
}

// Desktop entry values are line-oriented.
fn single_line(value: &str) -> String {
    value.replace(['\n', '\r'], " ")
}

fn quote_exec_arg(arg: &str) -> String {
    let mut quoted = String::with_capacity(arg.len() + 2);
    quoted.push('"');
    for ch in arg.chars() {
        if matches!(ch, '"' | '`' | '$' | '\\') {
            quoted.push('\\');
        }
        quoted.push(ch);
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::DesktopEntry;

    #[test]
    fn launcher_renders_freedesktop_fields() {
        let rendered = DesktopEntry::launcher("Krita", Path::new("/home/ada/Applications/Krita.AppImage"))
            .with_startup_wm_class("Krita")
            .render();

        assert_eq!(
            rendered,
            "[Desktop Entry]\n\
             Version=1.0\n\
             Type=Application\n\
             Name=Krita\n\
             Comment=Application installed by appdrop\n\
             Exec=\"/home/ada/Applications/Krita.AppImage\"\n\
             Icon=application-x-executable\n\
             Terminal=false\n\
             StartupWMClass=Krita\n\
             Categories=Utility;Application;\n"
        );
    }

    #[test]
    fn uninstaller_defaults_to_recursive_removal() {
        let entry = DesktopEntry::uninstaller("tool", Path::new("/opt/My Tool"), None);
        assert_eq!(entry.exec, "rm -rf \"/opt/My Tool\"");
        assert!(entry.terminal);

        let rendered = entry.render();
        assert!(rendered.contains("Icon=edit-delete\n"));
        assert!(rendered.contains("Categories=Utility;System;\n"));
        assert!(!rendered.contains("StartupWMClass"));
    }

    #[test]
    fn uninstaller_keeps_caller_command() {
        let entry = DesktopEntry::uninstaller("tool", Path::new("/opt/tool"), Some("tool --uninstall"));
        assert_eq!(entry.exec, "tool --uninstall");
    }

    #[test]
    fn exec_quoting_escapes_reserved_characters() {
        let entry = DesktopEntry::launcher("x", Path::new("/tmp/a\"b$c"));
        assert_eq!(entry.exec, "\"/tmp/a\\\"b\\$c\"");
    }
}
