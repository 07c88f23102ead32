//! Test doubles for driving `JobHandler` without network, tools or a model

#![allow(dead_code)]

use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use transcribe_worker::config::ToolsConfig;
use transcribe_worker::media::{AudioDownloader, CommandOutput, DurationProbe, ProcessRunner};
use transcribe_worker::transcription::{
    ModelCell, Segment, TranscriptMode, Transcriber, TranscriptionError,
};
use transcribe_worker::JobHandler;

/// What the fake yt-dlp does
#[derive(Clone, Copy)]
pub enum Download {
    /// Writes a short silent WAV
    Wav,
    /// Writes bytes that are not a WAV
    Garbage,
    /// Exits 1 with the given stderr
    Fail(&'static str),
}

/// Fake yt-dlp + ffprobe
pub struct FakeTools {
    pub download: Download,
    pub ffprobe_stdout: &'static str,
    pub delay: Duration,
    pub outputs: Mutex<Vec<PathBuf>>,
}

impl FakeTools {
    pub fn new(download: Download, ffprobe_stdout: &'static str) -> Self {
        Self {
            download,
            ffprobe_stdout,
            delay: Duration::ZERO,
            outputs: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn outputs(&self) -> Vec<PathBuf> {
        self.outputs.lock().unwrap().clone()
    }
}

fn ok(stdout: &[u8]) -> CommandOutput {
    CommandOutput {
        success: true,
        code: Some(0),
        stdout: stdout.to_vec(),
        stderr: Vec::new(),
    }
}

pub fn write_silence_wav(path: &Path, samples: usize) {
    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: 44100,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec).unwrap();
    for _ in 0..samples * 2 {
        writer.write_sample(0_i16).unwrap();
    }
    writer.finalize().unwrap();
}

impl ProcessRunner for FakeTools {
    fn run(&self, program: &str, args: &[String]) -> io::Result<CommandOutput> {
        std::thread::sleep(self.delay);

        if program == "ffprobe" {
            let path = Path::new(args.last().unwrap());
            if !path.exists() {
                return Ok(CommandOutput {
                    success: false,
                    code: Some(1),
                    stdout: Vec::new(),
                    stderr: b"No such file or directory".to_vec(),
                });
            }
            return Ok(ok(self.ffprobe_stdout.as_bytes()));
        }

        let idx = args.iter().position(|a| a == "-o").unwrap();
        let audio_format = {
            let fmt = args.iter().position(|a| a == "--audio-format").unwrap();
            args[fmt + 1].clone()
        };
        let path = PathBuf::from(args[idx + 1].replace("%(ext)s", &audio_format));

        match self.download {
            Download::Wav => write_silence_wav(&path, 4410),
            Download::Garbage => std::fs::write(&path, b"ID3 definitely mp3").unwrap(),
            Download::Fail(stderr) => {
                return Ok(CommandOutput {
                    success: false,
                    code: Some(1),
                    stdout: Vec::new(),
                    stderr: stderr.as_bytes().to_vec(),
                })
            }
        }
        self.outputs.lock().unwrap().push(path);
        Ok(ok(b""))
    }
}

/// Transcriber returning fixed segments, or a fixed failure
pub struct FakeTranscriber {
    pub segments: Vec<Segment>,
    pub fail: Option<&'static str>,
}

impl Transcriber for FakeTranscriber {
    fn transcribe(&self, audio_data: &[f32]) -> Result<Vec<Segment>, TranscriptionError> {
        assert!(!audio_data.is_empty(), "transcriber received no samples");
        match self.fail {
            Some(msg) => Err(TranscriptionError::StateCreation(msg.to_owned())),
            None => Ok(self.segments.clone()),
        }
    }
}

pub fn model(segments: Vec<Segment>) -> ModelCell {
    ModelCell::new(move || {
        Ok(Arc::new(FakeTranscriber {
            segments: segments.clone(),
            fail: None,
        }) as Arc<dyn Transcriber>)
    })
}

pub fn failing_model(msg: &'static str) -> ModelCell {
    ModelCell::new(move || {
        Ok(Arc::new(FakeTranscriber {
            segments: Vec::new(),
            fail: Some(msg),
        }) as Arc<dyn Transcriber>)
    })
}

pub fn handler(tools: Arc<FakeTools>, model: ModelCell, dir: &Path) -> JobHandler {
    let config = ToolsConfig {
        temp_dir: dir.to_path_buf(),
        ..ToolsConfig::default()
    };
    JobHandler::new(
        AudioDownloader::new(tools.clone(), &config),
        DurationProbe::new(tools, "ffprobe"),
        model,
        TranscriptMode::Plain,
    )
}

pub fn dir_entries(dir: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect()
}
