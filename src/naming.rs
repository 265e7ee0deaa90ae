//! Centralized parsing for the distortion frame naming convention.
//!
//! The distortion tool writes its output frames as `glitch_out<N>.png`
//! with *unpadded* decimal indices (`glitch_out0.png`, `glitch_out10.png`).
//! Lexicographic order therefore interleaves frames (0, 1, 10, 11, 2, ...),
//! so every consumer must order frames by parsed index, never by filename
//! string. This module is the single place that knows the convention.

use std::path::{Path, PathBuf};

/// Filename stem prefix of distortion output frames.
pub const FRAME_PREFIX: &str = "glitch_out";

/// Extension of distortion output frames.
pub const FRAME_EXTENSION: &str = "png";

/// Filename of frame `index`: `glitch_out<index>.png`.
pub fn frame_name(index: u32) -> String {
    format!("{FRAME_PREFIX}{index}.{FRAME_EXTENSION}")
}

/// Parse the frame index out of a filename.
///
/// Returns `None` for anything that is not exactly
/// `glitch_out<decimal>.png`:
/// - `"glitch_out7.png"` → `Some(7)`
/// - `"glitch_out12.png"` → `Some(12)`
/// - `"glitch_out.png"` → `None` (no index)
/// - `"glitch_out7.gif"` → `None` (wrong extension)
/// - `"source.jpg"` → `None`
pub fn parse_frame_index(file_name: &str) -> Option<u32> {
    let stem = file_name.strip_suffix(&format!(".{FRAME_EXTENSION}"))?;
    let digits = stem.strip_prefix(FRAME_PREFIX)?;
    if digits.is_empty() {
        return None;
    }
    digits.parse().ok()
}

/// Select the frame files from a directory listing and return them in
/// natural numeric order.
///
/// Non-frame entries are ignored. The returned paths are sorted by parsed
/// index: 0, 1, 2, ..., 10, 11 — not the lexicographic 0, 1, 10, 11, 2.
pub fn ordered_frames<I>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = PathBuf>,
{
    let mut frames: Vec<(u32, PathBuf)> = paths
        .into_iter()
        .filter_map(|path| {
            let index = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(parse_frame_index)?;
            Some((index, path))
        })
        .collect();
    frames.sort_by_key(|(index, _)| *index);
    frames.into_iter().map(|(_, path)| path).collect()
}

/// List a directory and return its frame files in natural numeric order.
pub fn frames_in_dir(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut entries = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        entries.push(entry?.path());
    }
    Ok(ordered_frames(entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_name_is_unpadded() {
        assert_eq!(frame_name(0), "glitch_out0.png");
        assert_eq!(frame_name(7), "glitch_out7.png");
        assert_eq!(frame_name(12), "glitch_out12.png");
    }

    #[test]
    fn parse_round_trips_frame_name() {
        for index in [0, 1, 9, 10, 11, 123] {
            assert_eq!(parse_frame_index(&frame_name(index)), Some(index));
        }
    }

    #[test]
    fn parse_rejects_missing_index() {
        assert_eq!(parse_frame_index("glitch_out.png"), None);
    }

    #[test]
    fn parse_rejects_wrong_extension() {
        assert_eq!(parse_frame_index("glitch_out3.gif"), None);
        assert_eq!(parse_frame_index("glitch_out3"), None);
    }

    #[test]
    fn parse_rejects_other_working_files() {
        assert_eq!(parse_frame_index("source.jpg"), None);
        assert_eq!(parse_frame_index("glitch.png"), None);
        assert_eq!(parse_frame_index("loop.gif"), None);
    }

    #[test]
    fn parse_rejects_non_decimal_index() {
        assert_eq!(parse_frame_index("glitch_outx.png"), None);
        assert_eq!(parse_frame_index("glitch_out-1.png"), None);
    }

    #[test]
    fn ordering_is_numeric_not_lexicographic() {
        // Twelve unpadded frames: lexicographic order would interleave
        // (0, 1, 10, 11, 2, ...). Consumers need 0..=11.
        let mut paths: Vec<PathBuf> = (0..12).map(|i| PathBuf::from(frame_name(i))).collect();
        paths.sort(); // deliberately scramble into lexicographic order

        let ordered = ordered_frames(paths);
        let names: Vec<String> = ordered
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        let expected: Vec<String> = (0..12).map(frame_name).collect();
        assert_eq!(names, expected);
    }

    #[test]
    fn ordering_ignores_non_frame_files() {
        let paths = vec![
            PathBuf::from("/run/loop.gif"),
            PathBuf::from("/run/glitch_out1.png"),
            PathBuf::from("/run/source.jpg"),
            PathBuf::from("/run/glitch_out0.png"),
        ];
        let ordered = ordered_frames(paths);
        assert_eq!(
            ordered,
            vec![
                PathBuf::from("/run/glitch_out0.png"),
                PathBuf::from("/run/glitch_out1.png"),
            ]
        );
    }

    #[test]
    fn frames_in_dir_reads_and_orders() {
        let tmp = tempfile::TempDir::new().unwrap();
        for i in [10, 0, 2, 1] {
            std::fs::write(tmp.path().join(frame_name(i)), "").unwrap();
        }
        std::fs::write(tmp.path().join("source.jpg"), "").unwrap();

        let frames = frames_in_dir(tmp.path()).unwrap();
        let indices: Vec<u32> = frames
            .iter()
            .map(|p| parse_frame_index(p.file_name().unwrap().to_str().unwrap()).unwrap())
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 10]);
    }
}
