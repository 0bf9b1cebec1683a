use crate::cli::DistanceArgs;
use crate::exit_codes;
use crate::output;
use quake_rs::detection::{P_WAVE_VELOCITY_KM_S, S_WAVE_VELOCITY_KM_S};
use quake_rs::epicentral_distance_km;
use serde::Serialize;

#[derive(Serialize)]
struct DistanceOutput {
    delta_secs: f64,
    distance_km: f64,
    p_velocity_km_s: f64,
    s_velocity_km_s: f64,
}

pub fn execute(args: DistanceArgs) -> i32 {
    if !args.delta.is_finite() || args.delta < 0.0 {
        eprintln!("Error: --delta must be a non-negative number of seconds");
        return exit_codes::INPUT_ERROR;
    }

    let result = DistanceOutput {
        delta_secs: args.delta,
        distance_km: epicentral_distance_km(args.delta),
        p_velocity_km_s: P_WAVE_VELOCITY_KM_S,
        s_velocity_km_s: S_WAVE_VELOCITY_KM_S,
    };

    if args.json {
        if let Err(e) = output::emit(&result, false, None) {
            eprintln!("Error: {}", e);
            return exit_codes::EXECUTION_ERROR;
        }
    } else {
        println!("{:.2} km", result.distance_km);
    }

    exit_codes::SUCCESS
}
