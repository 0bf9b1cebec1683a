/// P-wave propagation speed (km/s)
pub const P_WAVE_VELOCITY_KM_S: f64 = 6.0;

/// S-wave propagation speed (km/s)
pub const S_WAVE_VELOCITY_KM_S: f64 = 4.0;

/// Source distance from the P-to-S arrival delay: `Vp·Vs·Δt / (Vp − Vs)`.
pub fn epicentral_distance_km(delta_secs: f64) -> f64 {
    (P_WAVE_VELOCITY_KM_S * S_WAVE_VELOCITY_KM_S * delta_secs)
        / (P_WAVE_VELOCITY_KM_S - S_WAVE_VELOCITY_KM_S)
}
