//! gridmatch CLI entry point

use anyhow::{Context, Result};
use gridmatch::config::{cli::Cli, cli::ExecutionMode, Config};
use gridmatch::distributed::{Coordinator, WorkerService};
use std::sync::Arc;

fn main() -> Result<()> {
    println!("gridmatch v{}", env!("CARGO_PKG_VERSION"));
    println!("Distributed template matching for square integer grids");
    println!();

    let cli = Cli::parse_args();
    cli.validate()?;

    match cli.mode {
        ExecutionMode::Standalone => run_standalone(cli),
        ExecutionMode::Service => run_service(cli),
        ExecutionMode::Coordinator => run_coordinator(cli),
    }
}

/// Run in standalone mode: local worker services plus the coordinator
fn run_standalone(cli: Cli) -> Result<()> {
    let config = Config::resolve(&cli)?;

    let ports = find_available_ports(config.local_workers, cli.debug)?;

    // Auto-launch worker services on localhost
    let mut services = Vec::with_capacity(ports.len());
    for &port in &ports {
        services.push(launch_localhost_service(port, &cli)?);
    }

    // Give the services time to bind their listeners
    std::thread::sleep(std::time::Duration::from_millis(500));

    let worker_addresses: Vec<String> =
        ports.iter().map(|port| format!("localhost:{}", port)).collect();

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    let result = runtime.block_on(async {
        let coordinator = Coordinator::new(Arc::new(config), worker_addresses)
            .context("Failed to create coordinator")?;

        coordinator.run().await
    });

    for service in services {
        if let Err(e) = cleanup_service(service, cli.debug) {
            eprintln!("Warning: Failed to cleanup worker service: {}", e);
        }
    }

    result
}

/// Run in service mode: a worker on this host
fn run_service(cli: Cli) -> Result<()> {
    let config = Config::resolve(&cli)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let service = WorkerService::new(cli.listen_port, config.search)
            .context("Failed to create worker service")?;

        service.run().await
    })
}

/// Run in coordinator mode: orchestrate remote worker services
fn run_coordinator(cli: Cli) -> Result<()> {
    let worker_addresses = if let Some(ref host_list) = cli.host_list {
        host_list
            .split(',')
            .map(|s| {
                let addr = s.trim();
                if addr.contains(':') {
                    addr.to_string()
                } else {
                    format!("{}:{}", addr, cli.worker_port)
                }
            })
            .collect()
    } else if let Some(ref workers_file) = cli.workers_file {
        let content = std::fs::read_to_string(workers_file)
            .context("Failed to read workers file")?;

        content
            .lines()
            .filter(|line| !line.trim().is_empty() && !line.trim().starts_with('#'))
            .map(|line| {
                let addr = line.trim();
                if addr.contains(':') {
                    addr.to_string()
                } else {
                    format!("{}:{}", addr, cli.worker_port)
                }
            })
            .collect()
    } else {
        // validate() rejects this combination before we get here
        Vec::new()
    };

    let config = Config::resolve(&cli)?;

    let runtime = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;

    runtime.block_on(async {
        let coordinator = Coordinator::new(Arc::new(config), worker_addresses)
            .context("Failed to create coordinator")?;

        coordinator.run().await
    })
}

/// Find free localhost ports for the local worker services
fn find_available_ports(count: usize, debug: bool) -> Result<Vec<u16>> {
    use std::net::TcpListener;

    let mut ports = Vec::with_capacity(count);
    for port in 9900..10100 {
        if ports.len() == count {
            break;
        }
        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            drop(listener);
            if debug {
                eprintln!("DEBUG: Port {} is available", port);
            }
            ports.push(port);
        }
    }

    if ports.len() < count {
        anyhow::bail!(
            "Found only {} of {} free ports in range 9900-10099. \
             Close other gridmatch instances or run fewer local workers.",
            ports.len(),
            count
        );
    }

    Ok(ports)
}

/// Launch a localhost worker service in the background
fn launch_localhost_service(port: u16, cli: &Cli) -> Result<std::process::Child> {
    use std::process::{Command, Stdio};

    let exe_path = std::env::current_exe().context("Failed to get current executable path")?;

    let mut cmd = Command::new(&exe_path);
    cmd.arg("--mode").arg("service");
    cmd.arg("--listen-port").arg(port.to_string());

    if let Some(threads) = cli.search_threads {
        cmd.arg("--search-threads").arg(threads.to_string());
    }
    if let Some(devices) = cli.devices {
        cmd.arg("--devices").arg(devices.to_string());
    }
    if let Some(config) = &cli.config {
        cmd.arg("--config").arg(config);
    }
    if cli.debug {
        cmd.arg("--debug");
    }

    // Service output goes to /dev/null unless debugging
    if cli.debug {
        let log_path = format!("/tmp/gridmatch_service_{}.log", port);
        let log_file = std::fs::File::create(&log_path)
            .context("Failed to create service log file")?;
        cmd.stdout(Stdio::from(log_file.try_clone()?));
        cmd.stderr(Stdio::from(log_file));
        eprintln!("DEBUG: Service log: {}", log_path);
    } else {
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::null());
    }

    let child = cmd.spawn().context("Failed to spawn worker service process")?;

    if cli.debug {
        eprintln!("DEBUG: Service launched on port {} (PID: {})", port, child.id());
    }

    Ok(child)
}

/// Stop a local worker service process
///
/// The service keeps listening for further coordinator connections, so a
/// still-running process is expected and killed.
fn cleanup_service(mut child: std::process::Child, debug: bool) -> Result<()> {
    match child.try_wait()? {
        Some(status) => {
            if debug {
                eprintln!("DEBUG: Service already exited with status: {}", status);
            }
        }
        None => {
            child.kill()?;
            let status = child.wait()?;
            if debug {
                eprintln!("DEBUG: Service stopped (status: {})", status);
            }
        }
    }

    Ok(())
}
