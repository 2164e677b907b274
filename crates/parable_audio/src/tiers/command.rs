//! Offline text-to-speech through a local program.

use crate::{SegmentAudio, SynthesisTier};
use async_trait::async_trait;
use parable_core::Segment;
use parable_error::{GeneratorError, GeneratorErrorKind, ParableResult};
use std::process::Stdio;
use tokio::process::Command;

/// Speech from a local engine that writes WAV to stdout.
///
/// The segment text is appended as the last argument, e.g.
/// `espeak-ng -v zh --stdout <text>`. A missing executable reports the tier
/// as unavailable so the pipeline moves straight on to the next tier.
#[derive(Debug, Clone)]
pub struct CommandSpeechTier {
    program: String,
    args: Vec<String>,
}

impl CommandSpeechTier {
    /// Tier running `program` with `args` before the segment text.
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Build from a full command line such as `["espeak-ng", "--stdout"]`.
    ///
    /// Returns `None` for an empty command line.
    pub fn from_command_line(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl SynthesisTier for CommandSpeechTier {
    fn name(&self) -> &str {
        "local-tts"
    }

    #[tracing::instrument(skip(self, segment), fields(program = %self.program, index = segment.index()))]
    async fn try_apply(&self, segment: &Segment) -> ParableResult<SegmentAudio> {
        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(segment.text())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    GeneratorError::new(GeneratorErrorKind::Unavailable(format!(
                        "{} is not installed",
                        self.program
                    )))
                } else {
                    GeneratorError::failed(self.name(), format!("spawn {}: {}", self.program, e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(GeneratorError::failed(
                self.name(),
                format!("{} exited with {}: {}", self.program, output.status, stderr.trim()),
            )
            .into());
        }

        tracing::debug!(size = output.stdout.len(), "Local engine produced audio");
        Ok(SegmentAudio::Encoded {
            bytes: output.stdout,
            format: "audio/wav".to_string(),
        })
    }
}
