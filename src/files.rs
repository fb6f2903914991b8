use url::Url;

pub const OTHER_CLASS: &str = "file-type-other";

/// Extension to CSS class token.
const TYPES: &[(&str, &str)] = &[
    ("png", "file-type-png"),
    ("jpg", "file-type-jpg"),
    ("jpeg", "file-type-jpg"),
    ("gif", "file-type-gif"),
    ("pdf", "file-type-pdf"),
    ("doc", "file-type-word"),
    ("docx", "file-type-word"),
    ("ppt", "file-type-ppt"),
    ("pptx", "file-type-ppt"),
    ("xls", "file-type-excel"),
    ("xlsx", "file-type-excel"),
    ("zip", "file-type-zip"),
    ("rar", "file-type-zip"),
    ("7z", "file-type-zip"),
    ("swf", "file-type-swf"),
    ("mp4", "file-type-mp4"),
    ("mp3", "file-type-mp3"),
];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];

/// Lowercased extension of a file name, URI or URL. Query strings and
/// fragments are ignored; a name without a dot has no extension.
pub fn extension(name: &str) -> String {
    let path = path_part(name);
    let file = path.rsplit('/').next().unwrap_or_default();
    match file.rfind('.') {
        Some(pos) => file[pos + 1..].to_ascii_lowercase(),
        None => String::new(),
    }
}

pub fn file_class(name: &str) -> &'static str {
    let ext = extension(name);
    TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, class)| *class)
        .unwrap_or(OTHER_CLASS)
}

pub fn is_image(name: &str) -> bool {
    IMAGE_EXTENSIONS.contains(&extension(name).as_str())
}

pub fn is_audio(name: &str) -> bool {
    extension(name) == "mp3"
}

pub fn is_video(name: &str) -> bool {
    extension(name) == "mp4"
}

/// Last non-empty path segment, used as the file name for downloads.
pub fn file_name(name: &str) -> Option<String> {
    path_part(name)
        .rsplit('/')
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn path_part(name: &str) -> String {
    match Url::parse(name) {
        Ok(url) if !url.cannot_be_a_base() => url.path().to_string(),
        _ => name
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .to_string(),
    }
}
