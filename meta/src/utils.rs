use std::path::{Component, Path};

/// Final path segment of a url: everything after its last `/`.
///
/// Query strings and fragments are kept as they are, and a url ending in `/`
/// yields an empty name.
pub fn archive_name(url: &str) -> &str {
    match url.rfind('/') {
        Some(i) => &url[i + 1..],
        None => url,
    }
}

/// Archive name without any query string or fragment, used to guess the format.
pub fn strip_query(name: &str) -> &str {
    let end = name.find(|c| c == '?' || c == '#').unwrap_or(name.len());
    &name[..end]
}

/// Treats empty strings as missing.
pub fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// Treats names that would resolve outside of the directory they are joined to
/// as missing: absolute paths, `..`, `.` and drive prefixes.
pub fn relative_name(value: Option<&str>) -> Option<&str> {
    non_empty(value).filter(|v| {
        Path::new(v)
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
    })
}
