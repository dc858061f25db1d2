use crate::config::SamplingConfig;
use crate::types::SamplePoint;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Generate the fixed set of sample points.
///
/// All latitudes are drawn first, then all longitudes, so the sequence for a
/// given seed does not depend on how the pairs are consumed.
pub fn generate_sample_points(config: &SamplingConfig) -> Vec<SamplePoint> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let [lat_lo, lat_hi] = config.lat_range;
    let [lon_lo, lon_hi] = config.lon_range;

    let lats: Vec<f64> = (0..config.count).map(|_| uniform(&mut rng, lat_lo, lat_hi)).collect();
    let lons: Vec<f64> = (0..config.count).map(|_| uniform(&mut rng, lon_lo, lon_hi)).collect();

    lats.into_iter()
        .zip(lons)
        .enumerate()
        .map(|(i, (lat, lon))| SamplePoint { id: i as u32, lat, lon })
        .collect()
}

fn uniform(rng: &mut StdRng, lo: f64, hi: f64) -> f64 {
    // gen_range panics on an empty range
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}
