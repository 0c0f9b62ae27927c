use std::path::PathBuf;

use clap::Parser;

use crate::script::DEFAULT_MODEL;

#[derive(Parser, Debug, Clone)]
#[command(name = "trendclips", about = "Turns trending topics into short narrated videos")]
pub struct Args {
    /// Google Trends region code
    #[clap(long, default_value = "MX")]
    pub geo: String,

    /// Google Trends host language
    #[clap(long, default_value = "es-MX")]
    pub hl: String,

    #[clap(long, default_value_t = 3)]
    pub max_topics: usize,

    /// Independent scripts generated per topic
    #[clap(long, default_value_t = 2, value_parser = clap::value_parser!(u32).range(1..))]
    pub variations: u32,

    #[clap(long, default_value = DEFAULT_MODEL)]
    pub model: String,

    /// Directory receiving clip folders and final videos
    #[clap(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Scenes rendered concurrently per variation
    #[clap(long, default_value_t = 1)]
    pub render_jobs: usize,

    /// Skip scripts that do not have exactly six scenes
    #[clap(long)]
    pub strict_scenes: bool,

    #[clap(long, default_value = "ffmpeg")]
    pub ffmpeg: String,

    #[clap(long, default_value_t = 60)]
    pub request_timeout_secs: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["trendclips"]);
        assert_eq!(args.geo, "MX");
        assert_eq!(args.variations, 2);
        assert_eq!(args.max_topics, 3);
        assert_eq!(args.render_jobs, 1);
        assert!(!args.strict_scenes);
        assert_eq!(args.out_dir, PathBuf::from("."));
    }

    #[test]
    fn zero_variations_rejected() {
        assert!(Args::try_parse_from(["trendclips", "--variations", "0"]).is_err());
    }
}
