// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Au-Zone Technologies. All Rights Reserved.

use args::Args;
use clap::Parser;
use edgefirst_edgeproc::{
    image::save_rgba,
    stats::{FpsCounter, FrameStats},
    FrameProcessor, ProcessPath,
};
use std::{error::Error, fs, time::Instant};
use tracing::{debug, info, info_span, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};

mod args;

fn init_tracing(args: &Args) -> Result<(), Box<dyn Error>> {
    let default_level = if args.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let journald = if args.journald {
        match tracing_journald::layer() {
            Ok(layer) => Some(layer),
            Err(e) => {
                eprintln!("journald unavailable: {e}");
                None
            }
        }
    } else {
        None
    };

    let tracy = if args.tracy {
        tracy_client::Client::start();
        Some(tracing_tracy::TracyLayer::default())
    } else {
        None
    };

    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer())
        .with(journald)
        .with(tracy);
    tracing::subscriber::set_global_default(subscriber)?;
    tracing_log::LogTracer::init()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(&args)?;

    let geometry = args.frame_geometry()?;
    let (out_width, out_height) = args.output_dims()?;
    let mut output = vec![0u8; args.output_len()?];

    let processor = if args.no_edges {
        FrameProcessor::new(None)
    } else {
        FrameProcessor::system()
    };
    match processor.detector() {
        Some(detector) => info!("edge detection using {}", detector.backend_name()),
        None if args.no_edges => info!("edge detection disabled"),
        None => warn!("edge detection unavailable, emitting grayscale"),
    }

    let data = fs::read(&args.input)?;
    let frame_len = geometry.nv21_len();
    if data.len() < frame_len {
        return Err(format!(
            "{} holds {} bytes but a {} NV21 frame needs {}",
            args.input.display(),
            data.len(),
            geometry,
            frame_len
        )
        .into());
    }
    if data.len() % frame_len != 0 {
        warn!(
            "ignoring {} trailing bytes in {}",
            data.len() % frame_len,
            args.input.display()
        );
    }

    let mut fps = FpsCounter::new(args.fps_window);
    let mut stats = FrameStats::default();
    for (index, frame) in data.chunks_exact(frame_len).enumerate() {
        let _span = info_span!("frame", index).entered();
        let now = Instant::now();
        let path = processor.process(frame, geometry.width(), geometry.height(), &mut output)?;
        let process_time = now.elapsed();
        let rate = fps.tick();

        match &path {
            ProcessPath::Edges => debug!("edges: {:?} fps: {:.1}", process_time, rate),
            ProcessPath::Grayscale(reason) => {
                debug!("grayscale ({}): {:?} fps: {:.1}", reason, process_time, rate)
            }
        }
        stats.record(&path);
    }

    save_rgba(&args.output, &output, out_width, out_height)?;
    info!(
        "saved {}x{} frame to {}",
        out_width,
        out_height,
        args.output.display()
    );

    println!("{}", stats.to_json(geometry, fps.fps()));
    Ok(())
}
