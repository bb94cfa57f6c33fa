//! `run` subcommand — drive the lamp on this machine.
//!
//! Lines typed on stdin stand in for the lamp's HTTP endpoints:
//!
//! ```text
//! effect <name> [static=<color>] [snake=<color>]
//! mode monitoring|provisioning
//! reset
//! join <ssid> [password]
//! status
//! ```

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::mpsc::{self, Receiver};
use std::time::{Duration, Instant};

use wifiglow_lib::command::{Command, EffectRequest, StatusSnapshot};
use wifiglow_lib::controller::{DeviceMode, ModeController};
use wifiglow_lib::effects::EffectId;

use super::{
    FileCredentialStore, RUNNING, Result, WifiglowError, credentials_path, load_config,
};
use crate::host::{FileButton, HostBoard, SimulatedRadio, TerminalStrip};
use crate::transport::HttpTransport;

/// Polls the simulated radio answers `Pending` to before connecting.
const SIMULATED_PENDING_POLLS: u32 = 2;

pub(super) struct RunOptions {
    pub ticks: Option<u64>,
    pub tick_ms: u64,
    pub render: bool,
    pub fail_association: bool,
    pub reset_file: Option<PathBuf>,
}

/// A parsed console line.
#[derive(Debug, PartialEq)]
enum ConsoleInput {
    Send(Command),
    Status,
}

fn parse_console_line(line: &str) -> std::result::Result<Option<ConsoleInput>, String> {
    let mut words = line.split_whitespace();
    let Some(verb) = words.next() else {
        return Ok(None);
    };
    let input = match verb.to_ascii_lowercase().as_str() {
        "effect" => {
            let name = words.next().ok_or("usage: effect <name> [static=#RRGGBB] [snake=#RRGGBB]")?;
            let mut request = EffectRequest::new(EffectId::from_name(name));
            for arg in words {
                match arg.split_once('=') {
                    Some(("static", color)) => request = request.with_static_color(color),
                    Some(("snake", color)) => request = request.with_snake_color(color),
                    _ => return Err(format!("unknown effect argument \"{arg}\"")),
                }
            }
            ConsoleInput::Send(Command::SetEffect(request))
        }
        "mode" => match words.next() {
            Some("monitoring") => ConsoleInput::Send(Command::SetMode(DeviceMode::Monitoring)),
            Some("provisioning") => ConsoleInput::Send(Command::SetMode(DeviceMode::Provisioning)),
            _ => return Err("usage: mode monitoring|provisioning".into()),
        },
        "reset" => ConsoleInput::Send(Command::RequestReset),
        "join" => {
            let ssid = words.next().ok_or("usage: join <ssid> [password]")?;
            ConsoleInput::Send(Command::SubmitCredentials {
                ssid: ssid.to_string(),
                password: words.next().unwrap_or_default().to_string(),
            })
        }
        "status" => ConsoleInput::Status,
        other => return Err(format!("unknown command \"{other}\"")),
    };
    Ok(Some(input))
}

/// Read console lines on a background thread.
fn spawn_console() -> Receiver<ConsoleInput> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            match parse_console_line(&line) {
                Ok(Some(input)) => {
                    if tx.send(input).is_err() {
                        break;
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("[input]  {e}"),
            }
        }
    });
    rx
}

fn print_snapshot(snapshot: &StatusSnapshot) {
    let probe = match snapshot.connectivity.last_probe_ms {
        Some(at) => format!(
            "{} (at {at}ms)",
            if snapshot.connectivity.reachable {
                "reachable"
            } else {
                "unreachable"
            }
        ),
        None => "not probed".into(),
    };
    println!(
        "[status] mode={} effect={} internet={probe}",
        snapshot.mode, snapshot.effect
    );
}

pub(super) fn cmd_run(opts: RunOptions, custom_config: Option<&Path>) -> Result<()> {
    let config = load_config(custom_config);
    if let Err(problems) = config.validate() {
        let list: Vec<String> = problems.iter().map(ToString::to_string).collect();
        return Err(WifiglowError::Config(format!(
            "refusing to run with an invalid config: {}",
            list.join("; ")
        )));
    }
    let controller_config = config.controller_config();
    let creds = credentials_path(custom_config)?;
    println!("[store]  {}", creds.display());

    let mut board = HostBoard {
        store: FileCredentialStore::new(creds),
        radio: SimulatedRadio::new(opts.fail_association, SIMULATED_PENDING_POLLS),
        transport: HttpTransport::new()?,
        button: FileButton::new(opts.reset_file),
        strip: TerminalStrip::new(opts.render),
    };
    let console = spawn_console();
    let start = Instant::now();
    let tick = Duration::from_millis(opts.tick_ms);
    let mut ticks = 0u64;

    loop {
        let mut controller =
            ModeController::boot(board, controller_config.clone(), std::thread::sleep);
        let handle = controller.handle();
        println!(
            "[mode]   {} ({})",
            controller.current_mode(),
            controller.current_effect()
        );
        let mut shown_effect = controller.current_effect().clone();
        let mut restart = false;

        while RUNNING.load(Ordering::SeqCst) && opts.ticks.is_none_or(|max| ticks < max) {
            while let Ok(input) = console.try_recv() {
                match input {
                    ConsoleInput::Send(command) => {
                        handle.send(command);
                    }
                    ConsoleInput::Status => print_snapshot(&controller.status_snapshot()),
                }
            }

            let now = start.elapsed().as_millis() as u64;
            let report = controller.tick(now);
            ticks += 1;

            if report.reset_fired {
                println!("[reset]  credentials cleared");
            }
            if let Some(reachable) = report.probe {
                log::debug!("probe at {now}ms: reachable={reachable}");
            }
            if controller.current_effect() != &shown_effect {
                shown_effect = controller.current_effect().clone();
                println!("[mode]   {} ({shown_effect})", controller.current_mode());
            }
            if report.restart_requested {
                println!("[boot]   new credentials stored, restarting");
                restart = true;
                break;
            }
            std::thread::sleep(tick);
        }

        board = controller.into_board();
        if !restart {
            break;
        }
    }

    board.strip.finish();
    println!("[done]   {ticks} ticks, {} frames", board.strip.frames());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Option<ConsoleInput> {
        parse_console_line(line).unwrap()
    }

    #[test]
    fn blank_line_is_nothing() {
        assert_eq!(parse("   "), None);
    }

    #[test]
    fn effect_with_colors() {
        let expected = EffectRequest::new(EffectId::Snake)
            .with_snake_color("#00FF00")
            .with_static_color("blue");
        assert_eq!(
            parse("effect snake snake=#00FF00 static=blue"),
            Some(ConsoleInput::Send(Command::SetEffect(expected)))
        );
    }

    #[test]
    fn effect_unknown_name_passes_through() {
        assert_eq!(
            parse("effect sparkle"),
            Some(ConsoleInput::Send(Command::SetEffect(EffectRequest::new(
                EffectId::Unrecognized("sparkle".into())
            ))))
        );
    }

    #[test]
    fn effect_bad_argument_is_error() {
        assert!(parse_console_line("effect static color=red").is_err());
        assert!(parse_console_line("effect").is_err());
    }

    #[test]
    fn mode_and_reset() {
        assert_eq!(
            parse("mode monitoring"),
            Some(ConsoleInput::Send(Command::SetMode(DeviceMode::Monitoring)))
        );
        assert_eq!(
            parse("RESET"),
            Some(ConsoleInput::Send(Command::RequestReset))
        );
        assert!(parse_console_line("mode sleeping").is_err());
    }

    #[test]
    fn join_with_and_without_password() {
        assert_eq!(
            parse("join home secret"),
            Some(ConsoleInput::Send(Command::SubmitCredentials {
                ssid: "home".into(),
                password: "secret".into()
            }))
        );
        assert_eq!(
            parse("join cafe"),
            Some(ConsoleInput::Send(Command::SubmitCredentials {
                ssid: "cafe".into(),
                password: String::new()
            }))
        );
    }

    #[test]
    fn status_and_unknown() {
        assert_eq!(parse("status"), Some(ConsoleInput::Status));
        assert!(parse_console_line("dance").is_err());
    }
}
