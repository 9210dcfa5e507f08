//! Line-based control commands
//!
//! One command per stdin line, e.g. `rec 1 2 3`, `next`, `play 2`.

use anyhow::{anyhow, bail, Context, Result};

use looptap_core::audio::Direction;
use looptap_core::input::DetectionMode;
use looptap_core::TrackId;

pub const HELP: &str = "\
Commands:
  rec <ids..>        record tracks one after another (first starts now)
  next               stop the current take, play it, record the next
  start <id>         start recording a single track
  stop <id>          stop recording a track
  play <id>          start playback
  pause <id>         stop playback
  clear <id>         erase a track
  arm <ids..>        record on the next detected onset
  disarm <ids..>     cancel arming
  threshold <value>  onset threshold (linear amplitude)
  mode <mean|rms>    onset detection mode
  gate <on|off>      input gate
  monitor <on|off>   input monitoring
  status             show track states
  devices            list audio devices
  input <n>          use input device n (applies after save + restart)
  output <n>         use output device n (applies after save + restart)
  save               write the current config
  reset              clear everything
  quit";

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Record(Vec<TrackId>),
    Next,
    Start(TrackId),
    Stop(TrackId),
    Play(TrackId),
    Pause(TrackId),
    Clear(TrackId),
    Arm(Vec<TrackId>),
    Disarm(Vec<TrackId>),
    Threshold(f32),
    Mode(DetectionMode),
    Gate(bool),
    Monitor(bool),
    Status,
    Devices,
    SelectDevice { direction: Direction, index: usize },
    Save,
    Reset,
    Help,
    Quit,
}

/// Parse one input line; blank lines yield `None`
pub fn parse(line: &str) -> Result<Option<Command>> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let command = match verb.to_ascii_lowercase().as_str() {
        "rec" | "record" => Command::Record(track_ids(&args)?),
        "next" | "n" => Command::Next,
        "start" => Command::Start(single_track(&args)?),
        "stop" => Command::Stop(single_track(&args)?),
        "play" => Command::Play(single_track(&args)?),
        "pause" => Command::Pause(single_track(&args)?),
        "clear" => Command::Clear(single_track(&args)?),
        "arm" => Command::Arm(track_ids(&args)?),
        "disarm" => Command::Disarm(track_ids(&args)?),
        "threshold" | "thr" => {
            let value = args.first().ok_or_else(|| anyhow!("threshold needs a value"))?;
            let value: f32 = value
                .parse()
                .with_context(|| format!("invalid threshold '{}'", value))?;
            if !value.is_finite() || value < 0.0 {
                bail!("threshold must be a non-negative number");
            }
            Command::Threshold(value)
        }
        "mode" => match args.first().copied() {
            Some("mean") => Command::Mode(DetectionMode::MeanAbsolute),
            Some("rms") => Command::Mode(DetectionMode::BlockRms),
            _ => bail!("mode must be 'mean' or 'rms'"),
        },
        "gate" => Command::Gate(on_off(&args)?),
        "monitor" => Command::Monitor(on_off(&args)?),
        "status" | "s" => Command::Status,
        "devices" => Command::Devices,
        "input" => Command::SelectDevice {
            direction: Direction::Input,
            index: device_index(&args)?,
        },
        "output" => Command::SelectDevice {
            direction: Direction::Output,
            index: device_index(&args)?,
        },
        "save" => Command::Save,
        "reset" => Command::Reset,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{}' (try 'help')", other),
    };
    Ok(Some(command))
}

fn track_ids(args: &[&str]) -> Result<Vec<TrackId>> {
    if args.is_empty() {
        bail!("expected at least one track id");
    }
    args.iter()
        .map(|arg| {
            arg.parse::<usize>()
                .map(TrackId)
                .with_context(|| format!("invalid track id '{}'", arg))
        })
        .collect()
}

fn single_track(args: &[&str]) -> Result<TrackId> {
    match track_ids(args)?.as_slice() {
        [id] => Ok(*id),
        _ => bail!("expected exactly one track id"),
    }
}

fn device_index(args: &[&str]) -> Result<usize> {
    let arg = args.first().ok_or_else(|| anyhow!("expected a device number (see 'devices')"))?;
    arg.parse()
        .with_context(|| format!("invalid device number '{}'", arg))
}

fn on_off(args: &[&str]) -> Result<bool> {
    match args.first().copied() {
        Some("on") | Some("1") | Some("true") => Ok(true),
        Some("off") | Some("0") | Some("false") => Ok(false),
        _ => bail!("expected 'on' or 'off'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_track_commands() {
        assert_eq!(
            parse("rec 1 2 3").unwrap(),
            Some(Command::Record(vec![TrackId(1), TrackId(2), TrackId(3)]))
        );
        assert_eq!(parse("  PLAY 2 ").unwrap(), Some(Command::Play(TrackId(2))));
        assert_eq!(parse("next").unwrap(), Some(Command::Next));
        assert_eq!(
            parse("arm 4").unwrap(),
            Some(Command::Arm(vec![TrackId(4)]))
        );
    }

    #[test]
    fn test_parse_settings() {
        assert_eq!(parse("threshold 0.05").unwrap(), Some(Command::Threshold(0.05)));
        assert_eq!(
            parse("mode rms").unwrap(),
            Some(Command::Mode(DetectionMode::BlockRms))
        );
        assert_eq!(parse("gate on").unwrap(), Some(Command::Gate(true)));
        assert_eq!(parse("monitor off").unwrap(), Some(Command::Monitor(false)));
    }

    #[test]
    fn test_parse_device_commands() {
        assert_eq!(parse("devices").unwrap(), Some(Command::Devices));
        assert_eq!(
            parse("output 2").unwrap(),
            Some(Command::SelectDevice {
                direction: Direction::Output,
                index: 2
            })
        );
        assert_eq!(
            parse("input 0").unwrap(),
            Some(Command::SelectDevice {
                direction: Direction::Input,
                index: 0
            })
        );
        assert!(parse("input").is_err());
        assert!(parse("output usb").is_err());
    }

    #[test]
    fn test_blank_line_is_none() {
        assert_eq!(parse("   ").unwrap(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse("rec").is_err());
        assert!(parse("play one").is_err());
        assert!(parse("stop 1 2").is_err());
        assert!(parse("threshold -1").is_err());
        assert!(parse("gate maybe").is_err());
        assert!(parse("dance").is_err());
    }
}
