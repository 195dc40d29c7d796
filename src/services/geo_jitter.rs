//! 坐标抖动
//!
//! 在半径范围内的圆盘上均匀取点：方位角均匀分布，距离取 `r * sqrt(u)`，
//! 再按大圆公式计算目标点。

use rand::Rng;
use std::f64::consts::PI;

/// 地球平均半径（米）
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// 在 `(lat, lon)` 周围 `radius_m` 米内随机取一点，返回 (纬度, 经度)
pub fn jittered_point<R: Rng>(lat: f64, lon: f64, radius_m: f64, rng: &mut R) -> (f64, f64) {
    let bearing = rng.gen_range(0.0..2.0 * PI);
    let distance = radius_m * rng.gen_range(0.0f64..1.0).sqrt();
    destination(lat, lon, bearing, distance)
}

/// 从起点沿方位角 `bearing`（弧度）走 `distance_m` 米后的位置
pub fn destination(lat: f64, lon: f64, bearing: f64, distance_m: f64) -> (f64, f64) {
    let delta = distance_m / EARTH_RADIUS_M;
    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let sin_phi2 = phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * bearing.cos();
    let phi2 = sin_phi2.clamp(-1.0, 1.0).asin();
    let lambda2 = lambda1
        + (bearing.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * sin_phi2);

    // 经度归一到 [-180, 180)
    let lon2 = (lambda2.to_degrees() + 540.0).rem_euclid(360.0) - 180.0;
    (phi2.to_degrees(), lon2)
}

/// 两点间的大圆距离（米）
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2)
        + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_points_stay_inside_radius() {
        let mut rng = StdRng::seed_from_u64(42);
        let (lat, lon, radius) = (-6.7711, -79.8431, 5.0);

        for _ in 0..2_000 {
            let (plat, plon) = jittered_point(lat, lon, radius, &mut rng);
            let d = haversine_distance_m(lat, lon, plat, plon);
            assert!(d <= radius + 1e-4, "distance {} exceeds radius", d);
        }
    }

    #[test]
    fn test_same_seed_same_point() {
        let a = jittered_point(10.0, 20.0, 50.0, &mut StdRng::seed_from_u64(7));
        let b = jittered_point(10.0, 20.0, 50.0, &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);
    }

    #[test]
    fn test_distribution_is_uniform_over_disk() {
        // 均匀圆盘上，落在半径一半以内的比例约为 1/4，
        // 而按半径均匀取点会接近 1/2
        let mut rng = StdRng::seed_from_u64(1234);
        let (lat, lon, radius) = (-33.45, -70.66, 100.0);
        let samples = 4_000;

        let inner = (0..samples)
            .filter(|_| {
                let (plat, plon) = jittered_point(lat, lon, radius, &mut rng);
                haversine_distance_m(lat, lon, plat, plon) < radius / 2.0
            })
            .count();

        let ratio = inner as f64 / samples as f64;
        assert!((0.2..0.3).contains(&ratio), "inner ratio {}", ratio);
    }

    #[test]
    fn test_destination_round_trip_distance() {
        let (lat, lon) = destination(0.0, 0.0, PI / 2.0, 1_000.0);
        assert!((haversine_distance_m(0.0, 0.0, lat, lon) - 1_000.0).abs() < 1e-3);
        assert!(lat.abs() < 1e-9);
        assert!(lon > 0.0);
    }

    #[test]
    fn test_longitude_wraps_at_antimeridian() {
        let (_, lon) = destination(0.0, 179.99999, PI / 2.0, 10.0);
        assert!((-180.0..180.0).contains(&lon));
    }
}
