//! Command line options.

use std::path::PathBuf;

use spinquad_app::AppConfig;

/// Options that override [`AppConfig`] defaults.
#[derive(Debug, Default, PartialEq)]
pub struct ViewerArgs {
    pub help: bool,
    pub vsync: bool,
    /// `Some` when `--validation` or `--no-validation` was given.
    pub validation: Option<bool>,
    pub frames_in_flight: Option<usize>,
    pub texture: Option<PathBuf>,
}

impl ViewerArgs {
    /// Parse the process arguments.
    pub fn from_env() -> Self {
        Self::parse(std::env::args().skip(1))
    }

    /// Parse arguments, ignoring unknown flags and malformed values.
    pub fn parse<I>(args: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<String>,
    {
        let mut parsed = Self::default();
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => parsed.help = true,
                "--vsync" => parsed.vsync = true,
                "--validation" => parsed.validation = Some(true),
                "--no-validation" => parsed.validation = Some(false),
                "--frames-in-flight" => {
                    if let Some(v) = args.next().and_then(|v| v.parse().ok()) {
                        parsed.frames_in_flight = Some(v);
                    }
                }
                "--texture" => parsed.texture = args.next().map(PathBuf::from),
                _ => {}
            }
        }

        parsed
    }

    /// Apply the overrides on top of `config`.
    pub fn apply(&self, mut config: AppConfig) -> AppConfig {
        config = config.with_vsync(self.vsync);
        if let Some(validation) = self.validation {
            config = config.with_validation(validation);
        }
        if let Some(frames) = self.frames_in_flight {
            config = config.with_frames_in_flight(frames);
        }
        if let Some(texture) = &self.texture {
            config = config.with_texture(texture.clone());
        }
        config
    }
}
