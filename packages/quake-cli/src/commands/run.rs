use crate::cli::{LifecycleArg, RunArgs, SourceArgs};
use crate::exit_codes;
use crate::output;
use chrono::{DateTime, Utc};
use quake_rs::{
    create_source, save_wave_data, AlertConfig, AlertLifecycle, DetectionRun, Detector, DetectorConfig,
    HttpAlertClient, QuakeError, SourceConfig, Termination,
};
use serde::Serialize;
use std::sync::Arc;

#[derive(Serialize)]
struct RunSummary<'a> {
    source: String,
    completed_at: DateTime<Utc>,
    wave_data: Option<&'a str>,
    #[serde(flatten)]
    run: &'a DetectionRun,
}

pub async fn execute(args: RunArgs) -> i32 {
    let config = match build_config(&args) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let source_config = match build_source_config(&args) {
        Ok(s) => s,
        Err(msg) => {
            eprintln!("Error: {}", msg);
            return exit_codes::INPUT_ERROR;
        }
    };

    let mut detector = match Detector::new(config.clone()) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error: {}", e);
            return exit_codes::INPUT_ERROR;
        }
    };

    if let Some(alert) = &config.alert {
        match HttpAlertClient::new(alert) {
            Ok(client) => {
                log::info!("Reporting events to {}", client.endpoint());
                detector = detector.with_alert_service(Arc::new(client));
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                return exit_codes::EXECUTION_ERROR;
            }
        }
    } else {
        log::warn!("No alerting service configured; events will only be logged");
    }

    let mut source = create_source(source_config);
    let description = source.describe();

    let cancel = detector.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("Interrupt received, stopping");
            cancel.cancel();
        }
    });

    if !args.quiet {
        eprintln!("Monitoring {} (run {})...", description, detector.run_id());
    }

    let run = match detector.run(source.as_mut()).await {
        Ok(run) => run,
        Err(e @ QuakeError::CalibrationIncomplete { .. }) => {
            eprintln!("Error: {}", e);
            return exit_codes::CALIBRATION_INCOMPLETE;
        }
        Err(e @ QuakeError::SourceOpen(_)) => {
            eprintln!("Error: {}", e);
            return exit_codes::SOURCE_ERROR;
        }
        Err(e) => {
            eprintln!("Detection failed: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    let wave_data = match save_wave_data(&run, &args.output) {
        Ok(true) => Some(args.output.as_str()),
        Ok(false) => None,
        Err(e) => {
            eprintln!("Error: failed to write wave data: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    };

    if !args.quiet {
        print_outcome(&run, wave_data);
    }

    if let Some(target) = args.summary.as_deref() {
        let summary = RunSummary {
            source: description,
            completed_at: Utc::now(),
            wave_data,
            run: &run,
        };
        if let Err(e) = output::emit(&summary, args.compact, Some(target)) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    }

    match run.termination {
        Termination::Interrupted { .. } => exit_codes::INTERRUPTED,
        _ => exit_codes::SUCCESS,
    }
}

/// Config file (or defaults) with command-line overrides applied
fn build_config(args: &RunArgs) -> Result<DetectorConfig, String> {
    let mut config = match &args.config {
        Some(path) => DetectorConfig::from_json_file(path)
            .map_err(|e| format!("Failed to load config '{}': {}", path, e))?,
        None => DetectorConfig::default(),
    };

    if let Some(index) = args.calibration_index {
        config.calibration_index = index;
    }
    if let Some(threshold) = args.threshold {
        config.threshold = threshold;
    }
    if let Some(secs) = args.capture_secs {
        config.capture_duration_secs = secs;
    }
    if let Some(secs) = args.buffer_secs {
        config.buffer_time_secs = secs;
    }
    if let Some(secs) = args.swave_timeout_secs {
        config.swave_timeout_secs = Some(secs);
    }

    if let Some(url) = args.alerts_url.as_deref().filter(|u| !u.trim().is_empty()) {
        let alert = config.alert.get_or_insert_with(AlertConfig::default);
        alert.endpoint = url.to_string();
    }

    match config.alert.as_mut() {
        Some(alert) => {
            if let Some(id) = args.sensor_id {
                alert.sensor_id = id;
            }
            if let Some(lifecycle) = args.lifecycle {
                alert.lifecycle = match lifecycle {
                    LifecycleArg::Full => AlertLifecycle::Full,
                    LifecycleArg::Basic => AlertLifecycle::Basic,
                };
            }
            if let Some(secs) = args.deactivate_after_secs {
                alert.deactivate_after_secs = secs;
            }
        }
        None => {
            if args.sensor_id.is_some() || args.lifecycle.is_some() || args.deactivate_after_secs.is_some() {
                log::warn!("Alert options ignored: no alerting service URL configured");
            }
        }
    }

    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn build_source_config(args: &RunArgs) -> Result<SourceConfig, String> {
    let SourceArgs {
        serial,
        file,
        tcp,
        stdin,
    } = &args.source;

    if let Some(path) = file {
        if !std::path::Path::new(path).is_file() {
            return Err(format!("File not found: {}", path));
        }
        return Ok(SourceConfig::File {
            path: path.clone(),
            line_delay_ms: args.line_delay_ms,
        });
    }

    if let Some(address) = tcp {
        let (host, port) = parse_host_port(address)?;
        return Ok(SourceConfig::Tcp { host, port });
    }

    if *stdin {
        return Ok(SourceConfig::Stdin);
    }

    match serial {
        Some(port) => serial_config(port, args),
        None => Err("One of --serial, --file, --tcp or --stdin is required".to_string()),
    }
}

#[cfg(target_family = "unix")]
fn serial_config(port: &str, args: &RunArgs) -> Result<SourceConfig, String> {
    if !args.settle_secs.is_finite() || args.settle_secs < 0.0 {
        return Err(format!("Invalid --settle-secs: {}", args.settle_secs));
    }
    Ok(SourceConfig::Serial {
        port: port.to_string(),
        baud_rate: args.baud,
        settle_secs: args.settle_secs,
    })
}

#[cfg(not(target_family = "unix"))]
fn serial_config(_port: &str, _args: &RunArgs) -> Result<SourceConfig, String> {
    Err("Serial input is only supported on Unix".to_string())
}

fn parse_host_port(address: &str) -> Result<(String, u16), String> {
    let (host, port) = address
        .rsplit_once(':')
        .ok_or_else(|| format!("Expected HOST:PORT, got '{}'", address))?;
    if host.is_empty() {
        return Err(format!("Missing host in '{}'", address));
    }
    let port = port
        .parse::<u16>()
        .map_err(|_| format!("Invalid port in '{}'", address))?;
    Ok((host.to_string(), port))
}

fn print_outcome(run: &DetectionRun, wave_data: Option<&str>) {
    match run.termination {
        Termination::Completed => {
            if let (Some(p), Some(s)) = (run.p_wave, run.s_wave) {
                eprintln!("Earthquake detected: P wave {} / S wave {}", p.amplitude, s.amplitude);
            }
            if let (Some(distance), Some(delta)) = (run.distance_km, run.time_delta_secs) {
                eprintln!("  Distance from sensor: {:.2} km (P-S delay {:.3}s)", distance, delta);
            }
            if let Some(alert) = &run.alert {
                match alert.alert_id {
                    Some(id) if alert.deactivated => eprintln!("  Alert {} created and deactivated", id),
                    Some(id) => eprintln!("  Alert {} created", id),
                    None => eprintln!("  Alert was not created"),
                }
                for error in &alert.errors {
                    eprintln!("  Alert error: {}", error);
                }
            }
        }
        Termination::Interrupted { phase } => eprintln!("Interrupted during {}", phase),
        Termination::StreamEnded { phase } => eprintln!("Stream ended during {}", phase),
        Termination::SWaveTimedOut => eprintln!("No S wave before the time limit"),
    }

    if let Some(path) = wave_data {
        eprintln!("Wave data written to {}", path);
    }
}
