// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hand-rolled argument parsing for the thin command surface.

use oc_core::session::Permissiveness;
use oc_launcher::LaunchSpec;
use std::path::PathBuf;

#[derive(Debug, PartialEq)]
pub enum Parsed {
    Help,
    Version,
    Launch(LaunchSpec),
    Send { name: String, text: String, enter: bool },
    Kill { name: String, cascade: bool },
    Restart { name: String },
    List { kill_untracked: bool },
    Status,
    Cleanup { include_done: bool },
    DaemonStart,
    DaemonStop,
    DaemonStatus,
    SupervisorStart,
    SupervisorStop,
    HookHandler,
}

pub fn parse(args: &[String]) -> Result<Parsed, String> {
    let mut iter = args.iter().map(String::as_str);
    match iter.next() {
        None | Some("--help") | Some("-h") | Some("help") => Ok(Parsed::Help),
        Some("--version") | Some("-V") => Ok(Parsed::Version),
        Some("launch") => parse_launch(&args[1..]),
        Some("send") => parse_send(&args[1..]),
        Some("kill") => {
            let name = required(&args[1..], "session name")?;
            Ok(Parsed::Kill {
                name,
                cascade: !args.contains(&"--no-cascade".to_string()),
            })
        }
        Some("restart") => Ok(Parsed::Restart {
            name: required(&args[1..], "session name")?,
        }),
        Some("list") => Ok(Parsed::List {
            kill_untracked: args.contains(&"--kill-untracked".to_string()),
        }),
        Some("status") => Ok(Parsed::Status),
        Some("cleanup") => Ok(Parsed::Cleanup {
            include_done: args.contains(&"--include-done".to_string()),
        }),
        Some("daemon") => match iter.next() {
            Some("start") => Ok(Parsed::DaemonStart),
            Some("stop") => Ok(Parsed::DaemonStop),
            Some("status") | None => Ok(Parsed::DaemonStatus),
            Some(other) => Err(format!("unknown daemon action '{other}'")),
        },
        Some("supervisor") => match iter.next() {
            Some("start") => Ok(Parsed::SupervisorStart),
            Some("stop") => Ok(Parsed::SupervisorStop),
            Some(other) => Err(format!("unknown supervisor action '{other}'")),
            None => Err("supervisor requires start|stop".to_string()),
        },
        Some("hook-handler") => Ok(Parsed::HookHandler),
        Some(other) => Err(format!("unknown command '{other}'")),
    }
}

fn parse_launch(rest: &[String]) -> Result<Parsed, String> {
    let mut spec = LaunchSpec::default();
    let mut iter = rest.iter();

    spec.name = iter
        .next()
        .filter(|arg| !arg.starts_with("--"))
        .ok_or("launch requires a session name")?
        .clone();

    while let Some(flag) = iter.next() {
        match flag.as_str() {
            "--dir" => {
                spec.start_directory =
                    Some(PathBuf::from(value_for(&mut iter, "--dir")?));
            }
            "--prompt" => spec.initial_prompt = Some(value_for(&mut iter, "--prompt")?),
            "--mode" => {
                let raw = value_for(&mut iter, "--mode")?;
                spec.permissiveness = raw
                    .parse::<Permissiveness>()
                    .map_err(|_| format!("unknown permissiveness mode '{raw}'"))?;
            }
            "--parent" => spec.parent = Some(value_for(&mut iter, "--parent")?),
            other => return Err(format!("unknown launch flag '{other}'")),
        }
    }
    Ok(Parsed::Launch(spec))
}

fn parse_send(rest: &[String]) -> Result<Parsed, String> {
    let mut words = Vec::new();
    let mut name = None;
    let mut enter = true;
    for arg in rest {
        match arg.as_str() {
            "--no-enter" => enter = false,
            _ if name.is_none() => name = Some(arg.clone()),
            _ => words.push(arg.clone()),
        }
    }
    let name = name.ok_or("send requires a session name")?;
    if words.is_empty() {
        return Err("send requires text or a key token".to_string());
    }
    Ok(Parsed::Send {
        name,
        text: words.join(" "),
        enter,
    })
}

fn required(rest: &[String], what: &str) -> Result<String, String> {
    rest.iter()
        .find(|arg| !arg.starts_with("--"))
        .cloned()
        .ok_or_else(|| format!("missing {what}"))
}

fn value_for<'a>(
    iter: &mut std::slice::Iter<'a, String>,
    flag: &str,
) -> Result<String, String> {
    iter.next()
        .cloned()
        .ok_or_else(|| format!("{flag} requires a value"))
}

#[cfg(test)]
#[path = "args_tests.rs"]
mod tests;
