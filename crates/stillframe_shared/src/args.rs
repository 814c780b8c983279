use std::path::PathBuf;
use std::time::Duration;

/// Built-in test pattern shown when no image file is given
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pattern {
    #[default]
    Bars,
    Gradient,
    Checker,
}

impl Pattern {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "bars" => Some(Self::Bars),
            "gradient" => Some(Self::Gradient),
            "checker" => Some(Self::Checker),
            _ => None,
        }
    }
}

/// Global arguments provided at process start
pub struct GlobalArgs {
    /// Path to the DRM device node
    pub device: PathBuf,
    /// Path to a raw image file sized to the active mode
    pub image: Option<PathBuf>,
    /// Pattern to generate when no image file is given
    pub pattern: Pattern,
    /// How long to keep the frame on screen
    pub hold: Duration,
    /// Path to the log file (stderr when absent)
    pub log_file: Option<String>,
}

impl Default for GlobalArgs {
    fn default() -> Self {
        Self {
            device: PathBuf::from("/dev/dri/card0"),
            image: None,
            pattern: Pattern::default(),
            hold: Duration::from_secs(3600),
            log_file: None,
        }
    }
}

impl GlobalArgs {
    /// Parse global arguments. `None` indicates that the program should exit.
    pub fn parse(mut args: impl Iterator<Item = String>) -> Option<Self> {
        let mut parsed = Self::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => {
                    print_help();
                    return None;
                }
                "--device" => parsed.device = PathBuf::from(value(&mut args, "--device")?),
                "--image" => parsed.image = Some(PathBuf::from(value(&mut args, "--image")?)),
                "--pattern" => {
                    let name = value(&mut args, "--pattern")?;
                    let Some(pattern) = Pattern::from_name(&name) else {
                        eprintln!("Unknown pattern '{name}'");
                        print_help();
                        return None;
                    };
                    parsed.pattern = pattern;
                }
                "--hold" => {
                    let seconds = value(&mut args, "--hold")?;
                    let Ok(seconds) = seconds.parse::<u64>() else {
                        eprintln!("Invalid hold duration '{seconds}'");
                        print_help();
                        return None;
                    };
                    parsed.hold = Duration::from_secs(seconds);
                }
                "--log-file" => parsed.log_file = Some(value(&mut args, "--log-file")?),
                other => {
                    eprintln!("Unknown argument '{other}'");
                    print_help();
                    return None;
                }
            }
        }

        Some(parsed)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> Option<String> {
    let value = args.next();
    if value.is_none() {
        eprintln!("Missing value for {flag}");
        print_help();
    }
    value
}

fn print_help() {
    println!("Usage: stillframe [OPTIONS]");
    println!("Options:");
    println!("  --device <path>      DRM device node (default: /dev/dri/card0)");
    println!("  --image <path>       Raw image file sized to the active mode");
    println!("  --pattern <name>     bars, gradient or checker (default: bars)");
    println!("  --hold <seconds>     How long to keep the frame up (default: 3600)");
    println!("  --log-file <path>    Append logs to a file instead of stderr");
    println!("  -h, --help           Print this help message and exit");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Option<GlobalArgs> {
        GlobalArgs::parse(args.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn no_arguments_yields_defaults() {
        let args = parse(&[]).unwrap();

        assert_eq!(args.device, PathBuf::from("/dev/dri/card0"));
        assert_eq!(args.image, None);
        assert_eq!(args.pattern, Pattern::Bars);
        assert_eq!(args.hold, Duration::from_secs(3600));
        assert_eq!(args.log_file, None);
    }

    #[test]
    fn help_exits_without_parsing() {
        assert!(parse(&["--help"]).is_none());
        assert!(parse(&["-h"]).is_none());
    }

    #[test]
    fn device_and_image_take_paths() {
        let args = parse(&["--device", "/dev/dri/card1", "--image", "frame.raw"]).unwrap();

        assert_eq!(args.device, PathBuf::from("/dev/dri/card1"));
        assert_eq!(args.image, Some(PathBuf::from("frame.raw")));
    }

    #[test]
    fn hold_parses_seconds() {
        let args = parse(&["--hold", "10"]).unwrap();

        assert_eq!(args.hold, Duration::from_secs(10));
    }

    #[test]
    fn invalid_hold_exits() {
        assert!(parse(&["--hold", "soon"]).is_none());
    }

    #[test]
    fn pattern_names_resolve() {
        assert_eq!(parse(&["--pattern", "gradient"]).unwrap().pattern, Pattern::Gradient);
        assert_eq!(parse(&["--pattern", "checker"]).unwrap().pattern, Pattern::Checker);
        assert!(parse(&["--pattern", "plasma"]).is_none());
    }

    #[test]
    fn missing_value_exits() {
        assert!(parse(&["--device"]).is_none());
    }

    #[test]
    fn unknown_argument_exits() {
        assert!(parse(&["--frobnicate"]).is_none());
    }
}
