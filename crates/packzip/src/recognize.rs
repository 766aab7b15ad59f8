//! File name based format recognition.

use std::path::Path;

/// Extensions of files that are ZIP containers under another name.
pub const KNOWN_EXTENSIONS: &[&str] = &["pack", "demo", "save", "addon", "box", "pk3", "zip"];

/// Returns `true` if `name` ends in one of the known container extensions.
///
/// The comparison ignores ASCII case. Only the name is examined; the file
/// contents are never opened.
///
/// ```
/// assert!(packzip::recognize("maps/e1m1.PK3"));
/// assert!(!packzip::recognize("readme.txt"));
/// ```
pub fn recognize(name: &str) -> bool {
    let Some((_, extension)) = name.rsplit_once('.') else {
        return false;
    };
    // A trailing separator means the dot belonged to a directory.
    if extension.contains(['/', '\\']) {
        return false;
    }
    KNOWN_EXTENSIONS
        .iter()
        .any(|known| extension.eq_ignore_ascii_case(known))
}

/// Path flavored [`recognize`].
pub fn recognize_path(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| KNOWN_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
}
