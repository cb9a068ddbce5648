//! spinquad viewer
//!
//! Opens an 800x600 window and draws a textured quad spinning about the Z
//! axis, keeping two frames in flight.
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p spinquad-viewer -- [OPTIONS]
//! ```
//!
//! Run from the repository root so `shaders/vert.spv`, `shaders/frag.spv` and
//! `textures/texture.png` resolve.
//!
//! ## Options
//!
//! - `--vsync`: Present with FIFO instead of preferring MAILBOX
//! - `--validation` / `--no-validation`: Force the Khronos validation layer
//!   on or off (default: on in debug builds)
//! - `--frames-in-flight <N>`: Frames recorded ahead of the GPU (default: 2)
//! - `--texture <PATH>`: Image to map onto the quad
//! - `-h, --help`: Print help message
//!
//! ## Environment Variables
//!
//! - `RUST_LOG`: Set log level (e.g., info, debug, trace)

mod args;

use spinquad_app::{run_app, AppConfig};

use crate::args::ViewerArgs;

const TITLE: &str = "spinquad";

fn main() -> anyhow::Result<()> {
    let args = ViewerArgs::from_env();
    if args.help {
        print_help();
        return Ok(());
    }

    run_app(args.apply(AppConfig::new(TITLE)))
}

fn print_help() {
    eprintln!(
        "spinquad viewer: a spinning textured quad on Vulkan

USAGE:
    cargo run -p spinquad-viewer -- [OPTIONS]

OPTIONS:
    --vsync                   Present with FIFO (default: prefer MAILBOX)
    --validation              Enable the Khronos validation layer
    --no-validation           Disable the Khronos validation layer
    --frames-in-flight <N>    Frames recorded ahead of the GPU (default: 2)
    --texture <PATH>          Texture file (default: textures/texture.png)
    -h, --help                Print this help message

ASSETS:
    shaders/vert.spv, shaders/frag.spv   compile from shaders/shader.{{vert,frag}}
                                         with glslc (see shaders/README.md)

ENVIRONMENT VARIABLES:
    RUST_LOG                  Set log level (e.g., info, debug, trace)"
    );
}
