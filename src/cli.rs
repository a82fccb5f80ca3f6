use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::export::ExportFormat;

#[derive(Parser, Debug)]
#[command(
    name = "tubescribe",
    version,
    about = "Turn video links into editable, speaker-labelled transcripts"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Generate a transcript and summary for a video link
    Transcribe {
        /// Video URL (youtube.com/watch, youtu.be, embed and similar forms)
        url: String,

        /// Also write the finished transcript in this format
        #[arg(long)]
        export: Option<ExportFormat>,

        /// Export file path (defaults to transcript-<video id>.<ext>)
        #[arg(short, long, requires = "export")]
        output: Option<PathBuf>,
    },

    /// List, show or delete saved projects
    History {
        #[command(subcommand)]
        action: HistoryAction,
    },

    /// Change a segment's speaker label or text
    Edit {
        /// Saved job id
        job: String,
        /// Segment id
        segment: String,

        #[arg(long)]
        speaker: Option<String>,

        #[arg(long)]
        text: Option<String>,
    },

    /// Rewrite one segment's text for clarity and grammar
    Refine {
        /// Saved job id
        job: String,
        /// Segment id
        segment: String,
    },

    /// Render a saved transcript
    Export {
        /// Saved job id
        job: String,

        #[arg(long, default_value = "txt")]
        format: ExportFormat,

        /// Output file (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sign in so finished jobs are saved to history
    Login {
        #[arg(long, default_value = "")]
        name: String,

        #[arg(long, default_value = "")]
        email: String,
    },

    /// Sign out
    Logout,

    /// Show the signed-in user
    Whoami,

    /// Write a default config file with comments
    InitConfig {
        /// Where to write (defaults to the platform config directory)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum HistoryAction {
    /// Saved projects, most recently completed first
    List,
    /// Print one saved project
    Show { job: String },
    /// Remove a saved project
    Delete { job: String },
}
