use clap::Parser;
use std::path::PathBuf;
use tsencode::encode::EncodeRequest;
use tsencode_plan::ScheduleArg;

#[derive(Parser)]
#[command(name = "tsencode")]
#[command(author, version, about = "Transcode broadcast recordings to MP4 with ffmpeg")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging and always show ffmpeg output
    #[arg(short, long)]
    pub verbose: bool,

    /// Ignore filename tags: main audio only, no subtitles
    #[arg(long)]
    pub ignore_tags: bool,

    /// Also write extra audio and subtitle streams to separate files
    #[arg(long)]
    pub split_tracks: bool,

    /// Print the ffmpeg command line instead of running it
    #[arg(long)]
    pub dry_run: bool,

    /// Recording to transcode
    #[arg(required = true)]
    pub input: PathBuf,

    /// EPG schedule document (*.json) or legacy audio component type
    pub schedule: Option<String>,
}

impl Cli {
    pub fn request(&self) -> EncodeRequest {
        EncodeRequest {
            input: self.input.clone(),
            schedule: self.schedule.as_deref().map(ScheduleArg::from_positional),
            ignore_tags: self.ignore_tags,
            split_tracks: self.split_tracks,
        }
    }
}
