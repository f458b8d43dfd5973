//! Command-line arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(
    name = "rtt",
    version,
    about = "Turn videos into searchable transcript archives",
    after_help = "EXAMPLES:\n  \
                  rtt process lecture.mp4\n  \
                  rtt process ./videos --concurrency 4 --collection lectures\n  \
                  rtt process https://www.youtube.com/@prelinger --no-enrich\n  \
                  rtt process batch.json\n  \
                  rtt resume\n  \
                  rtt status"
)]
pub struct Cli {
    /// Configuration file. Defaults apply when omitted.
    #[arg(short, long, global = true, env = "RTT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Resolve inputs into jobs and run them as one batch
    Process(ProcessArgs),

    /// Run every job with a sidecar in the work directory
    Resume(ResumeArgs),

    /// List jobs with a sidecar, their stage and last error
    Status(StatusArgs),

    /// Print the videos of a channel
    Channel {
        /// Channel URL, e.g. https://www.youtube.com/@handle
        url: String,
    },

    /// Check that every configured collaborator is usable
    Check,
}

#[derive(Debug, Args)]
pub struct ProcessArgs {
    /// Files, directories, manifests (.json), video URLs or channel URLs
    #[arg(required = true)]
    pub inputs: Vec<String>,

    /// Jobs run at the same time
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    /// Skip enrichment; the raw transcript is indexed as is
    #[arg(long)]
    pub no_enrich: bool,

    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Title of the video. Only used when the inputs resolve to one job.
    #[arg(long)]
    pub title: Option<String>,

    /// Background passed to the enricher for every job
    #[arg(long)]
    pub context: Option<String>,

    /// Collection name recorded in every archive
    #[arg(long)]
    pub collection: Option<String>,
}

#[derive(Debug, Args)]
pub struct ResumeArgs {
    #[arg(short = 'j', long)]
    pub concurrency: Option<usize>,

    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct StatusArgs {
    #[arg(long)]
    pub work_dir: Option<PathBuf>,

    /// Print one JSON object per job
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process() {
        let cli = Cli::try_parse_from([
            "rtt",
            "process",
            "a.mp4",
            "https://example.com/b.mp4",
            "-j",
            "3",
            "--no-enrich",
            "--collection",
            "lectures",
            "--output-dir",
            "/out",
        ])
        .unwrap();

        assert!(!cli.log_json);
        match cli.command {
            Command::Process(args) => {
                assert_eq!(args.inputs, vec!["a.mp4", "https://example.com/b.mp4"]);
                assert_eq!(args.concurrency, Some(3));
                assert!(args.no_enrich);
                assert_eq!(args.collection.as_deref(), Some("lectures"));
                assert_eq!(args.output_dir, Some(PathBuf::from("/out")));
                assert!(args.work_dir.is_none());
                assert!(args.title.is_none());
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_process_requires_inputs() {
        assert!(Cli::try_parse_from(["rtt", "process"]).is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli =
            Cli::try_parse_from(["rtt", "status", "--log-json", "--config", "rtt.toml"]).unwrap();
        assert!(cli.log_json);
        assert_eq!(cli.config, Some(PathBuf::from("rtt.toml")));
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn test_parse_channel_and_check() {
        let cli = Cli::try_parse_from(["rtt", "channel", "https://www.youtube.com/@x"]).unwrap();
        assert!(matches!(cli.command, Command::Channel { ref url } if url.ends_with("@x")));

        let cli = Cli::try_parse_from(["rtt", "check"]).unwrap();
        assert!(matches!(cli.command, Command::Check));
    }

    #[test]
    fn test_parse_resume() {
        let cli = Cli::try_parse_from(["rtt", "resume", "--concurrency", "1"]).unwrap();
        match cli.command {
            Command::Resume(args) => assert_eq!(args.concurrency, Some(1)),
            other => panic!("unexpected command {:?}", other),
        }
    }
}
