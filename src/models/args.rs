use std::path::PathBuf;
use clap::Parser;
use crate::models::profile::Profile;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Test profile
    #[arg(value_enum, default_value_t = Profile::Quick)]
    pub profile: Profile,

    /// JSON target description (endpoints, roster, duplex events)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Base URL of the service under test
    #[arg(long, env = "LOADPROBE_BASE_URL")]
    pub base_url: Option<String>,

    /// WebSocket URL (defaults to the base URL with a ws scheme and /ws path)
    #[arg(long, env = "LOADPROBE_WS_URL")]
    pub ws_url: Option<String>,

    /// Directory the markdown and JSON reports are written to
    #[arg(long, env = "LOADPROBE_REPORTS_DIR")]
    pub reports_dir: Option<PathBuf>,

    /// Debug logging, no progress bars
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Keep the host awake for the duration of the run
    #[arg(long, default_value_t = false)]
    pub keep_awake: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_defaults_to_quick() {
        let args = Args::try_parse_from(["loadprobe"]).unwrap();
        assert_eq!(args.profile, Profile::Quick);
        assert!(!args.verbose);
    }

    #[test]
    fn full_profile_with_flags() {
        let args = Args::try_parse_from([
            "loadprobe",
            "full",
            "--base-url",
            "http://10.0.0.5:8080",
            "--reports-dir",
            "out",
        ])
        .unwrap();
        assert_eq!(args.profile, Profile::Full);
        assert_eq!(args.base_url.as_deref(), Some("http://10.0.0.5:8080"));
        assert_eq!(args.reports_dir, Some(PathBuf::from("out")));
    }

    #[test]
    fn unknown_profile_is_rejected() {
        assert!(Args::try_parse_from(["loadprobe", "soak"]).is_err());
        assert!(Args::try_parse_from(["loadprobe", "quick", "extra"]).is_err());
    }
}
