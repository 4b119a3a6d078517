//! Command-line arguments

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "miqat")]
#[command(about = "Prayer times, qiblah direction and offline adhan")]
#[command(version)]
pub struct Cli {
    /// Configuration directory (defaults to ./.miqat or ~/.miqat)
    #[arg(short, long, env = "MIQAT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct LocationArgs {
    /// Latitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lng")]
    pub lat: Option<f64>,

    /// Longitude in decimal degrees
    #[arg(long, allow_hyphen_values = true, requires = "lat")]
    pub lng: Option<f64>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show today's schedule and count down to the next prayer
    Next {
        #[command(flatten)]
        location: LocationArgs,

        /// Print a single countdown line and exit
        #[arg(long)]
        once: bool,

        /// Play the configured adhan when a prayer time is reached
        #[arg(long)]
        adhan: bool,
    },

    /// Print the qiblah bearing for a location
    Qiblah {
        #[command(flatten)]
        location: LocationArgs,

        /// Current device heading, to check alignment
        #[arg(long)]
        heading: Option<f64>,
    },

    /// Resolve an address and store it as the manual location
    Locate {
        /// Free-form address, e.g. "Paris, France"
        address: String,

        /// Only print the result
        #[arg(long)]
        dry_run: bool,
    },

    /// List the available adhan voices
    Voices,

    /// Cache a voice (regular and Fajr recordings) for offline playback
    Download {
        /// Voice id (defaults to the configured voice)
        voice: Option<String>,
    },

    /// Play an adhan now
    Play {
        /// Voice id (defaults to the configured voice)
        voice: Option<String>,

        /// `1v`, `2v` or `full` (defaults to the configured style)
        #[arg(long)]
        style: Option<String>,

        /// Prayer name, selects the Fajr recording when relevant
        #[arg(long, default_value = "Dhuhr")]
        prayer: String,
    },

    /// Show or change which prayers sound the adhan
    Alerts {
        /// Fajr, Dhuhr, Asr, Maghrib or Isha
        #[arg(requires = "state")]
        prayer: Option<String>,

        state: Option<Switch>,
    },

    /// Inspect or maintain the audio cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Switch {
    On,
    Off,
}

#[derive(Subcommand, Debug, Clone, Copy)]
pub enum CacheAction {
    /// List stored recordings
    List,
    /// Remove every stored recording
    Purge,
    /// Drop index rows without file and files without index row
    Consolidate,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_negative_coordinates() {
        let cli = Cli::try_parse_from(["miqat", "qiblah", "--lat", "-33.86", "--lng", "151.2"]).unwrap();
        match cli.command {
            Command::Qiblah { location, .. } => {
                assert_eq!(location.lat, Some(-33.86));
                assert_eq!(location.lng, Some(151.2));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_alerts_toggle() {
        let cli = Cli::try_parse_from(["miqat", "alerts", "Asr", "off"]).unwrap();
        match cli.command {
            Command::Alerts { prayer, state } => {
                assert_eq!(prayer.as_deref(), Some("Asr"));
                assert_eq!(state, Some(Switch::Off));
            }
            other => panic!("unexpected command {other:?}"),
        }
        assert!(Cli::try_parse_from(["miqat", "alerts", "Asr"]).is_err());
        assert!(Cli::try_parse_from(["miqat", "alerts"]).is_ok());
    }

    #[test]
    fn test_lat_requires_lng() {
        assert!(Cli::try_parse_from(["miqat", "qiblah", "--lat", "10"]).is_err());
    }
}
