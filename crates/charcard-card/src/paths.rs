//! Path string helpers that treat `/` and `\` alike.

/// Final segment of a path, splitting on both separators.
pub(crate) fn last_segment(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// File name without its last extension. Dotfiles keep their leading dot.
pub(crate) fn file_stem(path: &str) -> &str {
    let name = last_segment(path);
    match name.rfind('.') {
        Some(0) | None => name,
        Some(dot) => &name[..dot],
    }
}
