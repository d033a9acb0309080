use std::fmt::{Display, Formatter};
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Closed set of package formats the installer knows how to handle.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PackageFormat {
    Deb,
    AppImage,
    TarGzip,
    TarXz,
    TarPlain,
    Snap,
    Flatpak,
    Run,
    Bin,
}

// Two-segment suffixes are matched before the single trailing extension.
const COMPOUND_SUFFIXES: &[(&str, PackageFormat)] = &[
    (".tar.gz", PackageFormat::TarGzip),
    (".tar.xz", PackageFormat::TarXz),
];

const EXTENSIONS: &[(&str, PackageFormat)] = &[
    ("deb", PackageFormat::Deb),
    ("appimage", PackageFormat::AppImage),
    ("tgz", PackageFormat::TarGzip),
    ("tar", PackageFormat::TarPlain),
    ("snap", PackageFormat::Snap),
    ("flatpak", PackageFormat::Flatpak),
    ("run", PackageFormat::Run),
    ("bin", PackageFormat::Bin),
];

impl PackageFormat {
    pub const ALL: [PackageFormat; 9] = [
        PackageFormat::Deb,
        PackageFormat::AppImage,
        PackageFormat::TarGzip,
        PackageFormat::TarXz,
        PackageFormat::TarPlain,
        PackageFormat::Snap,
        PackageFormat::Flatpak,
        PackageFormat::Run,
        PackageFormat::Bin,
    ];

    pub fn detect(path: &Path) -> Option<Self> {
        let name = path.file_name()?.to_str()?.to_ascii_lowercase();

        if let Some((_, format)) = COMPOUND_SUFFIXES
            .iter()
            .find(|(suffix, _)| name.len() > suffix.len() && name.ends_with(suffix))
        {
            return Some(*format);
        }

        let extension = Path::new(&name).extension()?.to_str()?;
        EXTENSIONS
            .iter()
            .find(|(candidate, _)| *candidate == extension)
            .map(|(_, format)| *format)
    }

    pub fn tag(self) -> &'static str {
        match self {
            Self::Deb => "deb",
            Self::AppImage => "appimage",
            Self::TarGzip => "tar-gzip",
            Self::TarXz => "tar-xz",
            Self::TarPlain => "tar-plain",
            Self::Snap => "snap",
            Self::Flatpak => "flatpak",
            Self::Run => "run",
            Self::Bin => "bin",
        }
    }

    pub fn is_archive(self) -> bool {
        matches!(self, Self::TarGzip | Self::TarXz | Self::TarPlain)
    }

    pub fn is_executable(self) -> bool {
        matches!(self, Self::Run | Self::Bin)
    }

    /// File extensions registered as mime associations for apps installed from this format.
    pub fn association_extensions(self) -> &'static [&'static str] {
        match self {
            Self::AppImage => &[".appimage"],
            Self::TarGzip => &[".tar.gz", ".tgz"],
            Self::TarXz => &[".tar.xz"],
            Self::Run => &[".run"],
            Self::Bin => &[".bin"],
            Self::Deb | Self::TarPlain | Self::Snap | Self::Flatpak => &[],
        }
    }
}

impl Display for PackageFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Strips the package suffix from a file name, treating `.tar.gz`/`.tar.xz` as one suffix.
pub fn package_stem(file_name: &str) -> &str {
    let lowered = file_name.to_ascii_lowercase();
    for (suffix, _) in COMPOUND_SUFFIXES {
        if lowered.len() > suffix.len() && lowered.ends_with(suffix) {
            return &file_name[..file_name.len() - suffix.len()];
        }
    }

    match file_name.rfind('.') {
        Some(index) if index > 0 => &file_name[..index],
        _ => file_name,
    }
}

/// The package stem when it is usable as a single path component below an install root.
pub fn app_name(file_name: &str) -> Option<&str> {
    let stem = package_stem(file_name);
    let usable = !stem.trim().is_empty()
        && stem != "."
        && stem != ".."
        && !stem.contains(['/', '\\', '\0']);
    usable.then_some(stem)
}

/// Human-readable rendering of the suffix that failed detection.
pub fn unrecognized_suffix(path: &Path) -> String {
    path.extension()
        .map(|extension| extension.to_string_lossy().to_ascii_lowercase())
        .filter(|extension| !extension.is_empty())
        .unwrap_or_else(|| "<none>".to_string())
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::{PackageFormat, app_name, package_stem, unrecognized_suffix};

    #[test]
    fn compound_suffix_wins_over_trailing_extension() {
        assert_eq!(
            PackageFormat::detect(Path::new("/tmp/tool-1.2.tar.gz")),
            Some(PackageFormat::TarGzip)
        );
        assert_eq!(
            PackageFormat::detect(Path::new("/tmp/tool-1.2.tar.xz")),
            Some(PackageFormat::TarXz)
        );
        // a bare .gz is not an archive format on its own
        assert_eq!(PackageFormat::detect(Path::new("/tmp/notes.gz")), None);
    }

    #[test]
    fn detection_is_case_insensitive() {
        assert_eq!(
            PackageFormat::detect(Path::new("Editor-x86_64.AppImage")),
            Some(PackageFormat::AppImage)
        );
        assert_eq!(
            PackageFormat::detect(Path::new("BUNDLE.TAR.GZ")),
            Some(PackageFormat::TarGzip)
        );
    }

    #[test]
    fn every_single_extension_maps_to_a_format() {
        let cases = [
            ("a.deb", PackageFormat::Deb),
            ("a.tgz", PackageFormat::TarGzip),
            ("a.tar", PackageFormat::TarPlain),
            ("a.snap", PackageFormat::Snap),
            ("a.flatpak", PackageFormat::Flatpak),
            ("a.run", PackageFormat::Run),
            ("a.bin", PackageFormat::Bin),
        ];
        for (name, expected) in cases {
            assert_eq!(PackageFormat::detect(Path::new(name)), Some(expected), "{name}");
            // deterministic
            assert_eq!(PackageFormat::detect(Path::new(name)), Some(expected), "{name}");
        }
    }

    #[test]
    fn unknown_or_missing_suffix_is_unsupported() {
        assert_eq!(PackageFormat::detect(Path::new("virus.xyz")), None);
        assert_eq!(PackageFormat::detect(Path::new("README")), None);
        assert_eq!(PackageFormat::detect(Path::new(".tar.gz")), None);
        assert_eq!(unrecognized_suffix(Path::new("virus.XYZ")), "xyz");
        assert_eq!(unrecognized_suffix(Path::new("README")), "<none>");
    }

    #[test]
    fn stem_drops_whole_archive_suffix() {
        assert_eq!(package_stem("tool-1.2.tar.gz"), "tool-1.2");
        assert_eq!(package_stem("Tool.TAR.XZ"), "Tool");
        assert_eq!(package_stem("Editor.AppImage"), "Editor");
        assert_eq!(package_stem("setup"), "setup");
        assert_eq!(package_stem(".hidden"), ".hidden");
    }

    #[test]
    fn dot_only_stems_are_not_app_names() {
        assert_eq!(app_name("tool-1.2.tar.gz"), Some("tool-1.2"));
        assert_eq!(app_name("....tar.gz"), Some("..."));
        assert_eq!(app_name("..tar.gz"), None);
        assert_eq!(app_name("...tar.gz"), None);
        assert_eq!(app_name("..AppImage"), None);
        assert_eq!(app_name(" .run"), None);
    }

    #[test]
    fn tags_are_unique() {
        let mut tags: Vec<_> = PackageFormat::ALL.iter().map(|f| f.tag()).collect();
        tags.sort_unstable();
        tags.dedup();
        assert_eq!(tags.len(), PackageFormat::ALL.len());
    }
}
