
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use tracing::debug;

/// Turns an image of a question into text
pub trait TextRecognizer {
    fn recognize(&self, image: &[u8]) -> Result<String>;
}

/// Screenshot recognition settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    pub enabled: bool,
    /// OCR program reading an image on stdin and writing text to stdout
    pub command: String,
    pub args: Vec<String>,
}

impl Default for OcrConfig {
    #[inline]
    fn default() -> Self {
        Self {
            enabled: false,
            command: "tesseract".to_string(),
            args: vec!["stdin".to_string(), "stdout".to_string()],
        }
    }
}

/// Recognizer running an external OCR program such as `tesseract`
#[derive(Debug, Clone)]
pub struct TesseractRecognizer {
    command: String,
    args: Vec<String>,
}

impl TesseractRecognizer {
    #[inline]
    pub fn new(config: &OcrConfig) -> Self {
        Self {
            command: config.command.clone(),
            args: config.args.clone(),
        }
    }

    /// Recognizer for an enabled configuration, `None` when OCR is off
    #[inline]
    pub fn from_config(config: &OcrConfig) -> Option<Self> {
        config.enabled.then(|| Self::new(config))
    }
}

impl TextRecognizer for TesseractRecognizer {
    #[inline]
    fn recognize(&self, image: &[u8]) -> Result<String> {
        debug!("Running {} on {} byte image", self.command, image.len());

        let mut child = Command::new(&self.command)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start OCR command: {}", self.command))?;

        // stdin is dropped before waiting so the program sees end of input
        let sent = child
            .stdin
            .take()
            .context("OCR command stdin unavailable")
            .and_then(|mut stdin| {
                stdin
                    .write_all(image)
                    .context("Failed to send image to OCR command")
            });
        if let Err(e) = sent {
            if let Err(kill_error) = child.kill() {
                debug!("Failed to kill {}: {}", self.command, kill_error);
            }
            if let Err(wait_error) = child.wait() {
                debug!("Failed to reap {}: {}", self.command, wait_error);
            }
            return Err(e);
        }

        let output = child
            .wait_with_output()
            .context("Failed to read OCR command output")?;

        if !output.status.success() {
            bail!(
                "OCR command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
