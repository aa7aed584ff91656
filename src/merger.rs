// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Merges encode-side segment files into one container via ffmpeg's concat
//! demuxer, in the temporal order spec.md §6 names authoritative: data
//! parts (sorted), then metadata, then pre-metadata.
//!
//! Deletion of the source segments is driven off ffmpeg's own `-progress
//! pipe:1` stream, read concurrently with the non-blocking merge, exactly
//! as `merge_mp4_files_incremental.py` does: each segment is deleted, one
//! at a time, as soon as the merge's output timestamp has passed that
//! segment's cumulative duration plus a 10-second safety buffer — not
//! bulk-deleted after an estimated delay once the merge has already
//! finished.

use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::config::Config;
use crate::content_type::ContentType;
use crate::error::VortexError;
use crate::segmenter::SegmentManifest;

const DELETION_BUFFER: Duration = Duration::from_secs(10);

/// One source segment's path and the output timestamp (seconds, measured
/// from the start of the merged container) past which it is safe to delete.
struct DeletionPoint {
    path: PathBuf,
    delete_after: Duration,
}

/// Merge every segment in `manifest` into `output_path`, deleting each
/// source segment as soon as ffmpeg's own progress stream reports the
/// merge has passed that segment's cumulative duration plus a 10-second
/// buffer, mirroring `merge_mp4_files_incremental.py`'s cleanup pattern.
pub fn merge(cfg: &Config, manifest: &SegmentManifest, output_path: &Path, overwrite: bool) -> Result<(), VortexError> {
    if !overwrite && output_path.exists() {
        return Err(VortexError::Io(format!(
            "output video {} already exists and overwrite was not requested",
            output_path.display()
        )));
    }

    let mut data_parts: Vec<_> = manifest.segments.iter().filter(|s| s.content_type == ContentType::DataContent).collect();
    data_parts.sort_by(|a, b| a.path.cmp(&b.path));
    let metadata = manifest.segments.iter().find(|s| s.content_type == ContentType::Metadata);
    let pre_metadata = manifest.segments.iter().find(|s| s.content_type == ContentType::PreMetadata);

    let ordered: Vec<_> = data_parts.into_iter().chain(metadata).chain(pre_metadata).collect();
    if ordered.is_empty() {
        return Err(VortexError::Internal("no segments produced by the encoder to merge".to_string()));
    }

    let list_path = concat_list_path(output_path);
    write_concat_list(&list_path, ordered.iter().map(|s| s.path.as_path()))?;

    let fps = cfg.output_fps.max(1) as f64;
    let mut cumulative_secs = 0.0;
    let mut deletion_points = Vec::with_capacity(ordered.len());
    for segment in &ordered {
        cumulative_secs += segment.raw_frame_count as f64 / fps;
        deletion_points.push(DeletionPoint {
            path: segment.path.clone(),
            delete_after: Duration::from_secs_f64(cumulative_secs) + DELETION_BUFFER,
        });
    }

    let mut child = Command::new(&cfg.ffmpeg_path)
        .args(["-hide_banner", "-loglevel", "error", "-f", "concat", "-safe", "0", "-i"])
        .arg(&list_path)
        .args(["-c", "copy", "-y", "-progress", "pipe:1"])
        .arg(output_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| VortexError::Io(format!("spawning ffmpeg concat merge: {err}")))?;

    let progress_stdout = child.stdout.take().expect("ffmpeg spawned with piped stdout");
    let monitor = std::thread::Builder::new()
        .name("vortex-merge-progress".into())
        .spawn(move || delete_as_merge_progresses(progress_stdout, deletion_points))
        .expect("spawning merge progress monitor thread");

    let status = child.wait().map_err(|err| VortexError::Io(format!("waiting for ffmpeg concat merge: {err}")))?;
    let undeleted = monitor.join().expect("merge progress monitor thread panicked");
    let _ = std::fs::remove_file(&list_path);
    if !status.success() {
        return Err(VortexError::Io(format!("ffmpeg concat merge exited with status {status}")));
    }

    // Anything the progress stream never caught up to (including the last
    // segment, which has no later timestamp to exceed) is deleted now that
    // the merge has definitely finished and released its file handles.
    for path in undeleted {
        let _ = std::fs::remove_file(path);
    }

    Ok(())
}

/// Read ffmpeg's `-progress pipe:1` key=value stream, deleting each segment
/// in `deletion_points` (in order) the moment `out_time_ms` surpasses its
/// `delete_after` threshold. Returns the segments never reached (deleted by
/// the caller once the merge process has exited).
fn delete_as_merge_progresses(stdout: impl std::io::Read, deletion_points: Vec<DeletionPoint>) -> Vec<PathBuf> {
    let mut pending = deletion_points.into_iter();
    let mut next = pending.next();
    let reader = BufReader::new(stdout);

    for line in reader.lines().map_while(Result::ok) {
        let Some(value) = line.strip_prefix("out_time_ms=") else {
            continue;
        };
        let Ok(out_time_ms) = value.parse::<i64>() else {
            continue;
        };
        let elapsed = Duration::from_secs_f64((out_time_ms.max(0) as f64) / 1_000_000.0);

        while let Some(point) = &next {
            if elapsed < point.delete_after {
                break;
            }
            let _ = std::fs::remove_file(&point.path);
            next = pending.next();
        }
    }

    next.into_iter().map(|point| point.path).chain(pending.map(|point| point.path)).collect()
}

fn concat_list_path(output_path: &Path) -> PathBuf {
    let mut name = output_path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".concat.txt");
    output_path.with_file_name(name)
}

fn write_concat_list<'a>(list_path: &Path, paths: impl Iterator<Item = &'a Path>) -> Result<(), VortexError> {
    let mut list_file = std::fs::File::create(list_path)?;
    for path in paths {
        writeln!(list_file, "file '{}'", path.display()).map_err(|err| VortexError::Io(format!("writing concat list: {err}")))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn concat_list_path_appends_suffix_without_replacing_extension() {
        let path = Path::new("/tmp/out.mp4");
        assert_eq!(concat_list_path(path), PathBuf::from("/tmp/out.mp4.concat.txt"));
    }

    #[test]
    fn deletes_each_segment_as_its_threshold_is_crossed() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("content_part01.mp4");
        let second = dir.path().join("metadata.mp4");
        std::fs::write(&first, b"x").unwrap();
        std::fs::write(&second, b"x").unwrap();

        let points = vec![
            DeletionPoint { path: first.clone(), delete_after: Duration::from_secs(10) },
            DeletionPoint { path: second.clone(), delete_after: Duration::from_secs(20) },
        ];

        // Progress crosses the first threshold but not the second.
        let progress = "out_time_ms=5000000\nout_time_ms=12000000\nprogress=continue\n";
        let undeleted = delete_as_merge_progresses(Cursor::new(progress.as_bytes().to_vec()), points);

        assert!(!first.exists(), "segment past its threshold should be deleted");
        assert!(second.exists(), "segment not yet past its threshold should survive");
        assert_eq!(undeleted, vec![second]);
    }

    #[test]
    fn every_segment_survives_when_progress_never_advances() {
        let dir = tempfile::tempdir().unwrap();
        let only = dir.path().join("pre_metadata.mp4");
        std::fs::write(&only, b"x").unwrap();

        let points = vec![DeletionPoint { path: only.clone(), delete_after: Duration::from_secs(10) }];
        let undeleted = delete_as_merge_progresses(Cursor::new(Vec::new()), points);

        assert!(only.exists());
        assert_eq!(undeleted, vec![only]);
    }
}
