//! Cache-tag classification.
//!
//! Maps a request path to the ordered tag sequence attached to the cached
//! response. The same function feeds the tagging layer at request time and
//! the purge side's tag vocabulary, so the two can never drift apart.

/// Classify a pathname into its cache-tag sequence.
///
/// Rules, in precedence order:
///
/// 1. A trailing `/` is dropped (except for the root itself).
/// 2. A final segment with a real extension is a file: tags are the
///    extension, the filename without its extension, then every ancestor
///    segment from the root down to the file's parent.
/// 3. The root `/` tags as `html`, `home`.
/// 4. Any other path tags as `html` followed by each segment in order.
///
/// All tags are emitted lowercase; empty components are dropped. The input
/// must already be a bare pathname (no query or fragment). Pure and total:
/// no input panics.
pub fn classify(path: &str) -> Vec<String> {
    let path = if path.len() > 1 && path.ends_with('/') {
        &path[..path.len() - 1]
    } else {
        path
    };

    if path == "/" {
        return vec!["html".to_string(), "home".to_string()];
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if let Some(last) = segments.last()
        && let Some((filename, extension)) = split_file_segment(last)
    {
        let mut tags = Vec::with_capacity(segments.len() + 1);
        tags.push(extension.to_ascii_lowercase());
        if !filename.is_empty() {
            tags.push(filename.to_ascii_lowercase());
        }
        for segment in &segments[..segments.len() - 1] {
            tags.push(segment.to_ascii_lowercase());
        }
        return tags;
    }

    let mut tags = Vec::with_capacity(segments.len() + 1);
    tags.push("html".to_string());
    for segment in segments {
        tags.push(segment.to_ascii_lowercase());
    }
    tags
}

/// Split `name.ext` into `(name, ext)` when the segment names a file.
///
/// A segment is a file when it contains a `.` followed by at least one
/// character at the end; a bare trailing dot does not count.
fn split_file_segment(segment: &str) -> Option<(&str, &str)> {
    let dot = segment.rfind('.')?;
    let extension = &segment[dot + 1..];
    if extension.is_empty() {
        return None;
    }
    Some((&segment[..dot], extension))
}
