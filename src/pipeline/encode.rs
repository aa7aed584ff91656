// vortexstore - Data compression resistant video generator.
// Copyright 2025 0verv0ltage
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Encode-side scheduling: a reader thread streams carrier frames off a
//! piped `ffmpeg` decode, a worker pool paints each against the next encode
//! plan chunk, and the calling thread reorders completions before handing
//! them to the segmenter in logical-frame order.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use crossbeam_channel::bounded;
use image::{ImageBuffer, RgbImage};

use crate::backpressure::BackpressureGate;
use crate::config::Config;
use crate::content_type::ContentType;
use crate::encoding_map::EncodingMap;
use crate::error::VortexError;
use crate::painter;
use crate::producer::Chunk;
use crate::segmenter::Segmenter;

use super::{Indexed, ReorderBuffer};

struct Job {
    content_type: ContentType,
    symbols: String,
    carrier: RgbImage,
}

fn spawn_carrier_reader(cfg: &Config, carrier_path: &Path) -> Result<Child, VortexError> {
    Command::new(&cfg.ffmpeg_path)
        .args(["-hide_banner", "-loglevel", "error", "-i"])
        .arg(carrier_path)
        .args(["-f", "rawvideo", "-pix_fmt", "bgr24", "-"])
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|err| VortexError::Io(format!("spawning ffmpeg carrier reader: {err}")))
}

/// Read exactly one `width`x`height` BGR24 frame, converting it to the
/// `image` crate's native RGB layout. `Ok(None)` on clean EOF before any
/// bytes of the frame were read.
fn read_one_frame<R: Read>(reader: &mut R, width: u32, height: u32) -> Result<Option<RgbImage>, VortexError> {
    let frame_len = width as usize * height as usize * 3;
    let mut buf = vec![0u8; frame_len];
    let mut filled = 0;
    while filled < frame_len {
        let n = reader.read(&mut buf[filled..]).map_err(|err| VortexError::Io(format!("reading carrier frame: {err}")))?;
        if n == 0 {
            return if filled == 0 {
                Ok(None)
            } else {
                Err(VortexError::Protocol("carrier video ended mid-frame".to_string()))
            };
        }
        filled += n;
    }
    for px in buf.chunks_exact_mut(3) {
        px.swap(0, 2);
    }
    Ok(ImageBuffer::from_raw(width, height, buf))
}

/// Run the full encode pipeline: stream carrier frames, paint `chunks`
/// across a worker pool sized to available parallelism, and write the
/// reordered result to `segmenter`.
pub fn run(cfg: &Config, em: &EncodingMap, carrier_path: &Path, chunks: Vec<Chunk>, segmenter: &mut Segmenter) -> Result<(), VortexError> {
    let mut child = spawn_carrier_reader(cfg, carrier_path)?;
    let mut carrier_stdout = child.stdout.take().expect("ffmpeg spawned with piped stdout");

    let worker_count = std::thread::available_parallelism().map(std::num::NonZeroUsize::get).unwrap_or(1);
    let (job_tx, job_rx) = bounded::<Indexed<Job>>(worker_count * 4);
    let (result_tx, result_rx) = bounded::<Indexed<(ContentType, u32, RgbImage)>>(worker_count * 4);
    let stop = Arc::new(AtomicBool::new(false));
    let failure: Arc<Mutex<Option<VortexError>>> = Arc::new(Mutex::new(None));
    let gate = Arc::new(BackpressureGate::spawn(cfg));

    let (frame_width, frame_height) = (cfg.frame_width, cfg.frame_height);
    let reader_stop = Arc::clone(&stop);
    let reader_failure = Arc::clone(&failure);
    let reader_handle = std::thread::Builder::new()
        .name("vortex-carrier-reader".into())
        .spawn(move || {
            for (index, chunk) in chunks.into_iter().enumerate() {
                if reader_stop.load(Ordering::Relaxed) {
                    return;
                }
                let carrier = match read_one_frame(&mut carrier_stdout, frame_width, frame_height) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        *reader_failure.lock().expect("failure mutex poisoned") =
                            Some(VortexError::Protocol("carrier frame EOF before data exhausted".to_string()));
                        reader_stop.store(true, Ordering::Relaxed);
                        return;
                    }
                    Err(err) => {
                        *reader_failure.lock().expect("failure mutex poisoned") = Some(err);
                        reader_stop.store(true, Ordering::Relaxed);
                        return;
                    }
                };
                let job = Job { content_type: chunk.content_type, symbols: chunk.symbols, carrier };
                if job_tx.send(Indexed { index: index as u64, value: job }).is_err() {
                    return;
                }
            }
        })
        .expect("spawning carrier reader thread");

    let mut worker_handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let job_rx = job_rx.clone();
        let result_tx = result_tx.clone();
        let cfg = cfg.clone();
        let em = em.clone();
        let stop = Arc::clone(&stop);
        let gate = Arc::clone(&gate);
        worker_handles.push(
            std::thread::Builder::new()
                .name("vortex-encode-worker".into())
                .spawn(move || {
                    while let Ok(job) = job_rx.recv() {
                        if stop.load(Ordering::Relaxed) {
                            break;
                        }
                        gate.wait_until_resumed();
                        let painted = painter::paint_frame(&job.value.carrier, &cfg, &em, job.value.content_type, &job.value.symbols);
                        let repetitions = cfg.geometry(job.value.content_type).total_frames_repetition;
                        let result = Indexed { index: job.index, value: (job.value.content_type, repetitions, painted) };
                        if result_tx.send(result).is_err() {
                            break;
                        }
                    }
                })
                .expect("spawning encode worker thread"),
        );
    }
    drop(job_rx);
    drop(result_tx);

    let mut reorder = ReorderBuffer::new();
    let mut write_err = None;
    while let Ok(item) = result_rx.recv() {
        for (content_type, repetitions, frame) in reorder.push(item) {
            if write_err.is_none() {
                if let Err(err) = segmenter.write_frame(content_type, &frame, repetitions) {
                    write_err = Some(err);
                    stop.store(true, Ordering::Relaxed);
                }
            }
        }
    }

    reader_handle.join().expect("carrier reader thread panicked");
    for handle in worker_handles {
        handle.join().expect("encode worker thread panicked");
    }
    let _ = child.wait();

    if let Some(err) = write_err {
        return Err(err);
    }
    if let Some(err) = failure.lock().expect("failure mutex poisoned").take() {
        return Err(err);
    }
    Ok(())
}
