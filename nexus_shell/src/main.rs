// /////////////////////////////////////////////////////////////////////////////
// Nexus Shell RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Shell Process Entry Point
//!
//! Wires bootstrap (CLI, environment, signals) to the kernel and runs a
//! plain line loop over stdin. The interactive line editor is an external
//! collaborator; this binary only reads lines, executes them, and prints
//! results or one-line kind-tagged errors (with a structured trace in
//! debug mode).
//!
//! Exit codes: 0 normal, 1 init failure, 130 on SIGINT after graceful
//! shutdown.

use nexus_shell::infrastructure::config::ShellConfig;
use nexus_shell::Kernel;
use nexus_shell_bootstrap::{
    parse_cli, platform_signals, validate_cli, Cli, EnvOverrides, ExitCode, ShutdownCoordinator,
    SystemSignals,
};
use nexus_shell_domain::{ShellError, Value};
use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

#[tokio::main]
async fn main() {
    let cli = parse_cli();
    let env = EnvOverrides::from_env();
    let debug = cli.debug || env.debug.unwrap_or(false);

    let subscriber = tracing_subscriber::FmtSubscriber::builder()
        .with_max_level(if debug {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_writer(std::io::stderr)
        .finish();
    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("warning: tracing subscriber already installed");
    }

    let code = match run(cli, env, debug).await {
        Ok(code) => code,
        Err(e) => {
            error!("Initialization failed: {:#}", e);
            eprintln!("nexus: {:#}", e);
            ExitCode::InitFailure
        }
    };
    std::process::exit(code.as_i32());
}

async fn run(cli: Cli, env: EnvOverrides, debug: bool) -> anyhow::Result<ExitCode> {
    validate_cli(&cli).map_err(|e| anyhow::anyhow!("usage: {}", e))?;
    let mut config = ShellConfig::load(cli.config.as_deref())?;
    config.apply_env(&env);
    if let Some(threads) = cli.threads {
        config.shell.thread_pool_size = threads;
    }
    if debug {
        config.shell.enable_debug = true;
    }

    let kernel = Kernel::init(config)?;

    // One-shot mode: execute the line and exit.
    if let Some(line) = &cli.command {
        let outcome = kernel.execute(line).await;
        report(&kernel, outcome, debug);
        kernel.shutdown().await?;
        return Ok(ExitCode::Success);
    }

    // Plain stdin line loop with graceful signal shutdown.
    let coordinator = Arc::new(ShutdownCoordinator::new(Duration::from_millis(200)));
    let token = coordinator.token();
    let interrupted = Arc::new(AtomicBool::new(false));
    {
        let interrupted = interrupted.clone();
        let coordinator = coordinator.clone();
        tokio::spawn(async move {
            let signals = platform_signals();
            signals
                .wait_for_signal(Box::new(move |was_interrupt| {
                    if was_interrupt {
                        interrupted.store(true, Ordering::SeqCst);
                    }
                }))
                .await;
            coordinator.initiate_shutdown();
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt();
        tokio::select! {
            _ = token.cancelled() => break,
            line = lines.next_line() => {
                match line {
                    Ok(Some(line)) => {
                        let line = line.trim().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        if line == "exit" || line == "quit" {
                            break;
                        }
                        let outcome = kernel.execute(&line).await;
                        report(&kernel, outcome, debug);
                    }
                    Ok(None) => break, // EOF
                    Err(e) => {
                        eprintln!("nexus: ExecutionFailure: stdin: {}", e);
                        break;
                    }
                }
            }
        }
        if interrupted.load(Ordering::SeqCst) {
            break;
        }
    }

    kernel.shutdown().await?;
    if interrupted.load(Ordering::SeqCst) {
        Ok(ExitCode::Interrupted)
    } else {
        Ok(ExitCode::Success)
    }
}

fn prompt() {
    print!("nexus> ");
    let _ = std::io::stdout().flush();
}

fn report(kernel: &Kernel, outcome: Result<Value, ShellError>, debug: bool) {
    match outcome {
        Ok(value) => {
            if !value.is_null() {
                println!("{}", value);
            }
        }
        Err(e) => {
            // One-line, kind-tagged; structured trace only in debug mode.
            eprintln!("nexus: {}: {}", e.kind(), e);
            if debug || kernel.config().shell.enable_debug {
                eprintln!("{:#?}", e);
            }
        }
    }
}
