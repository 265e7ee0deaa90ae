//! # Glitchpost
//!
//! A generative glitch-art bot. Each run selects a photograph from a
//! search service, derives a two-color palette, tints and crops the image,
//! feeds it through an external pixel-sorting tool, burns a generated
//! caption into every output frame, assembles a looping GIF, and posts the
//! result to the configured social platforms.
//!
//! # Architecture: A Linear Pipeline
//!
//! One run is a straight line through seven stages:
//!
//! ```text
//! 1. Source    search + download      → photograph (retried until usable)
//! 2. Compose   tint + crop + palette  → staged image and caption color
//! 3. Distort   external pixel sorter  → N animation frames
//! 4. Caption   generate + composite   → frames with burned-in text
//! 5. Assemble  frames                 → looping GIF
//! 6. Publish   media + status post    → per-platform outcomes
//! 7. Cleanup   temp directory drop    → nothing left behind
//! ```
//!
//! Failures split into two camps: fetching a photo and deriving a palette
//! are *retried inside their stage* (a failed attempt has no side
//! effects), while everything downstream is forward-only — an external
//! tool exiting non-zero fails the run, which still cleans up on the way
//! out.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`pipeline`] | Orchestrator — stage sequencing, workspace lifecycle, run report |
//! | [`source`] | Photo search/download adapter with the retry loop and blocklist |
//! | [`palette`] | Palette derivation — pairing service loop with complement fallback |
//! | [`compose`] | In-memory raster ops: tint overlay, random crop, background sample |
//! | [`distort`] | External pixel-sorting tool invocation and frame verification |
//! | [`caption`] | Sentence generation, sanitization, per-frame text compositing |
//! | [`assemble`] | Natural-order frame collection, GIF assembly, still export |
//! | [`publish`] | Mastodon and Bluesky clients behind a common platform trait |
//! | [`color`] | Pure RGB arithmetic: hex forms, complement |
//! | [`naming`] | `glitch_out<N>.png` frame convention and numeric ordering |
//! | [`params`] | The single random-parameter provider |
//! | [`tool`] | No-shell external command runner with captured stderr |
//! | [`config`] | `config.toml` loading, validation, stock file generation |
//!
//! # Design Decisions
//!
//! ## In-Memory Hand-Offs, Files Only at Tool Boundaries
//!
//! Stages exchange `image::DynamicImage` values. Files exist exactly where
//! an external process needs them — the staged distortion input, the
//! distortion output frames, and the assembled GIF — and they live in a
//! per-run temporary directory, so concurrent runs cannot trample each
//! other's working files.
//!
//! ## No Shell Anywhere
//!
//! Every external tool is invoked with an argument array through
//! [`tool::ToolRunner`]. Caption text never passes through a shell, so no
//! quoting of it can break an invocation. The historical caption sanitizer
//! ([`caption::sanitize`]) is retained as a content policy, not as the
//! injection defense it would otherwise have to be.
//!
//! ## One Random-Parameter Provider
//!
//! Tint color, crop offset, distortion angle and intensity, search
//! keyword, result page, font, and caption anchor are all drawn through
//! [`params::ParamSource`]. Tests script exact sequences; production draws
//! from the thread RNG.
//!
//! ## Explicit Retry Policy
//!
//! Photo fetching retries forever by default — the operation is idempotent
//! and failure-free of side effects — but the bound is a config value, not
//! an idiom buried in a loop. Palette pairing is bounded and falls back to
//! the local complement. Nothing else retries.
//!
//! ## Publishing Tolerates Partial Failure
//!
//! Each platform is attempted independently and the run report carries
//! per-platform outcomes. A dead instance loses one post on one platform,
//! not the whole run.

pub mod assemble;
pub mod caption;
pub mod color;
pub mod compose;
pub mod config;
pub mod distort;
pub mod naming;
pub mod palette;
pub mod params;
pub mod pipeline;
pub mod publish;
pub mod source;
pub mod tool;
