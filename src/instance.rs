//! Delivery stops and the routing instance shared by every optimizer.
//!
//! An instance borrows the caller's stop list, optionally prepends a depot at
//! index 0, and precomputes symmetric haversine distance and travel-time
//! matrices once per optimization run.

use serde::{Deserialize, Serialize};

use crate::error::OptimizeError;

/// Mean Earth radius in kilometers, used by the haversine formula.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Default assumed vehicle speed when the request does not override it.
pub const DEFAULT_SPEED_KMH: f64 = 50.0;

/// Great-circle distance in kilometers between two coordinate pairs.
pub fn haversine_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let dlat = (lat2 - lat1).to_radians();
    let dlng = (lng2 - lng1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    EARTH_RADIUS_KM * c
}

/// Time window for a stop, in minutes from midnight.
///
/// Windows are carried through to results but are not enforced as a search
/// constraint; the route summary reports capacity and max-time feasibility only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub earliest_minutes: f64,
    pub latest_minutes: f64,
}

/// A delivery stop supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stop {
    /// Unique, stable identifier reported back in the optimized route order.
    pub id: String,
    /// Latitude in degrees, must lie in [-90, 90].
    pub lat: f64,
    /// Longitude in degrees, must lie in [-180, 180].
    pub lng: f64,
    /// On-site service duration in minutes.
    #[serde(default)]
    pub service_minutes: f64,
    /// Demand in load units. Missing demand counts as 1.0 for fleet sizing.
    #[serde(default)]
    pub demand: Option<f64>,
    /// Optional delivery time window.
    #[serde(default)]
    pub time_window: Option<TimeWindow>,
}

impl Stop {
    pub fn new(id: impl Into<String>, lat: f64, lng: f64) -> Self {
        Stop {
            id: id.into(),
            lat,
            lng,
            service_minutes: 0.0,
            demand: None,
            time_window: None,
        }
    }

    /// Demand used for fleet sizing; stops without an explicit demand count as one unit.
    #[inline]
    pub fn effective_demand(&self) -> f64 {
        self.demand.unwrap_or(1.0)
    }

    /// Reject non-finite or out-of-range fields before any matrix is built.
    pub fn validate(&self) -> Result<(), OptimizeError> {
        validate_coordinates(&self.id, self.lat, self.lng)?;

        if !self.service_minutes.is_finite() || self.service_minutes < 0.0 {
            return Err(OptimizeError::InvalidStop {
                id: self.id.clone(),
                detail: format!("service_minutes {} must be finite and >= 0", self.service_minutes),
            });
        }
        if let Some(demand) = self.demand {
            if !demand.is_finite() || demand < 0.0 {
                return Err(OptimizeError::InvalidStop {
                    id: self.id.clone(),
                    detail: format!("demand {} must be finite and >= 0", demand),
                });
            }
        }
        if let Some(window) = self.time_window {
            if !window.earliest_minutes.is_finite()
                || !window.latest_minutes.is_finite()
                || window.earliest_minutes < 0.0
                || window.latest_minutes < window.earliest_minutes
            {
                return Err(OptimizeError::InvalidStop {
                    id: self.id.clone(),
                    detail: format!(
                        "time_window [{}, {}] must be finite, non-negative and ordered",
                        window.earliest_minutes, window.latest_minutes
                    ),
                });
            }
        }

        Ok(())
    }
}

/// Route start point. When present it occupies index 0 of the instance and is
/// pinned at tour position 0 by every operator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Depot {
    pub lat: f64,
    pub lng: f64,
}

impl Depot {
    pub fn new(lat: f64, lng: f64) -> Self {
        Depot { lat, lng }
    }

    pub fn validate(&self) -> Result<(), OptimizeError> {
        validate_coordinates("depot", self.lat, self.lng)
    }
}

fn validate_coordinates(id: &str, lat: f64, lng: f64) -> Result<(), OptimizeError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(OptimizeError::InvalidStop {
            id: id.to_string(),
            detail: format!("latitude {} outside [-90, 90]", lat),
        });
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(OptimizeError::InvalidStop {
            id: id.to_string(),
            detail: format!("longitude {} outside [-180, 180]", lng),
        });
    }
    Ok(())
}

/// A validated routing instance: borrowed stops, optional depot, and the
/// distance/travel-time matrices every search reads from.
#[derive(Debug, Clone)]
pub struct RoutingInstance<'a> {
    stops: &'a [Stop],
    depot: Option<Depot>,
    average_speed_kmh: f64,
    distance_matrix: Vec<Vec<f64>>,
    time_matrix: Vec<Vec<f64>>,
}

impl<'a> RoutingInstance<'a> {
    /// Validate every location and build both matrices.
    ///
    /// Matrices are symmetric with a zero diagonal by construction; travel time
    /// between two locations is `distance / speed * 60` minutes. On-site service
    /// minutes are added at the tour level, not here.
    pub fn new(
        stops: &'a [Stop],
        depot: Option<Depot>,
        average_speed_kmh: f64,
    ) -> Result<Self, OptimizeError> {
        if !average_speed_kmh.is_finite() || average_speed_kmh <= 0.0 {
            return Err(OptimizeError::ConstraintValidation {
                problems: vec![format!(
                    "average_speed_kmh {} must be positive and finite",
                    average_speed_kmh
                )],
            });
        }
        for stop in stops {
            stop.validate()?;
        }
        if let Some(depot) = &depot {
            depot.validate()?;
        }

        let mut points: Vec<(f64, f64)> = Vec::with_capacity(stops.len() + 1);
        if let Some(depot) = &depot {
            points.push((depot.lat, depot.lng));
        }
        points.extend(stops.iter().map(|s| (s.lat, s.lng)));

        let (distance_matrix, time_matrix) = Self::compute_matrices(&points, average_speed_kmh);

        log::debug!(
            "built routing instance: {} locations ({} stops{}), speed {:.1} km/h",
            points.len(),
            stops.len(),
            if depot.is_some() { " + depot" } else { "" },
            average_speed_kmh
        );

        Ok(RoutingInstance {
            stops,
            depot,
            average_speed_kmh,
            distance_matrix,
            time_matrix,
        })
    }

    fn compute_matrices(points: &[(f64, f64)], speed_kmh: f64) -> (Vec<Vec<f64>>, Vec<Vec<f64>>) {
        let n = points.len();
        let mut distance = vec![vec![0.0; n]; n];
        let mut time = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let km = haversine_km(points[i].0, points[i].1, points[j].0, points[j].1);
                let minutes = km / speed_kmh * 60.0;
                distance[i][j] = km;
                distance[j][i] = km;
                time[i][j] = minutes;
                time[j][i] = minutes;
            }
        }

        (distance, time)
    }

    /// Number of locations in the instance (stops plus the depot when present).
    #[inline]
    pub fn len(&self) -> usize {
        self.stops.len() + usize::from(self.depot.is_some())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn has_depot(&self) -> bool {
        self.depot.is_some()
    }

    #[inline]
    pub fn average_speed_kmh(&self) -> f64 {
        self.average_speed_kmh
    }

    /// Distance in kilometers between two location indices.
    #[inline]
    pub fn distance(&self, i: usize, j: usize) -> f64 {
        self.distance_matrix[i][j]
    }

    /// Travel time in minutes between two location indices (service excluded).
    #[inline]
    pub fn travel_time(&self, i: usize, j: usize) -> f64 {
        self.time_matrix[i][j]
    }

    /// Identifier reported for a location index; the depot reports as "depot".
    pub fn stop_id(&self, index: usize) -> &str {
        match self.stop_at(index) {
            Some(stop) => &stop.id,
            None => "depot",
        }
    }

    /// Service duration at a location; the depot has none.
    #[inline]
    pub fn service_minutes(&self, index: usize) -> f64 {
        self.stop_at(index).map_or(0.0, |s| s.service_minutes)
    }

    /// Fleet-sizing demand at a location; the depot has none.
    #[inline]
    pub fn effective_demand(&self, index: usize) -> f64 {
        self.stop_at(index).map_or(0.0, Stop::effective_demand)
    }

    /// Sum of effective demand across all stops.
    pub fn total_demand(&self) -> f64 {
        self.stops.iter().map(Stop::effective_demand).sum()
    }

    fn stop_at(&self, index: usize) -> Option<&Stop> {
        if self.depot.is_some() {
            if index == 0 {
                None
            } else {
                Some(&self.stops[index - 1])
            }
        } else {
            Some(&self.stops[index])
        }
    }

    /// Summary figures for the analyze command.
    pub fn statistics(&self) -> InstanceStatistics {
        let n = self.len();
        let mut sum = 0.0;
        let mut max = 0.0f64;
        let mut pairs = 0usize;
        for i in 0..n {
            for j in (i + 1)..n {
                let d = self.distance(i, j);
                sum += d;
                max = max.max(d);
                pairs += 1;
            }
        }
        let avg_distance_km = if pairs > 0 { sum / pairs as f64 } else { 0.0 };

        InstanceStatistics {
            stop_count: self.stops.len(),
            has_depot: self.has_depot(),
            total_demand: self.total_demand(),
            total_service_minutes: self.stops.iter().map(|s| s.service_minutes).sum(),
            avg_distance_km,
            max_distance_km: max,
        }
    }
}

/// Aggregate figures describing a routing instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceStatistics {
    pub stop_count: usize,
    pub has_depot: bool,
    pub total_demand: f64,
    pub total_service_minutes: f64,
    pub avg_distance_km: f64,
    pub max_distance_km: f64,
}

impl std::fmt::Display for InstanceStatistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "Locations: {}{}",
            self.stop_count,
            if self.has_depot { " stops + depot" } else { " stops" }
        )?;
        writeln!(f, "  Total demand: {:.1}", self.total_demand)?;
        writeln!(f, "  Total service time: {:.1} min", self.total_service_minutes)?;
        writeln!(f, "  Avg pairwise distance: {:.2} km", self.avg_distance_km)?;
        writeln!(f, "  Max pairwise distance: {:.2} km", self.max_distance_km)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_haversine_equator_degree() {
        // one degree of longitude along the equator
        let d = haversine_km(0.0, 0.0, 0.0, 1.0);
        assert!((d - 111.1949).abs() < 1e-3);
    }

    #[test]
    fn test_haversine_symmetry_and_triangle() {
        let delhi = (28.6139, 77.2090);
        let mumbai = (19.0760, 72.8777);
        let bangalore = (12.9716, 77.5946);

        let dm = haversine_km(delhi.0, delhi.1, mumbai.0, mumbai.1);
        let db = haversine_km(delhi.0, delhi.1, bangalore.0, bangalore.1);
        let mb = haversine_km(mumbai.0, mumbai.1, bangalore.0, bangalore.1);

        assert!(dm > 1100.0 && dm < 1200.0);
        assert!(db > 1650.0 && db < 1800.0);
        assert!(mb > 750.0 && mb < 900.0);

        assert_eq!(dm, haversine_km(mumbai.0, mumbai.1, delhi.0, delhi.1));
        assert!(dm + mb >= db);
        assert_eq!(haversine_km(delhi.0, delhi.1, delhi.0, delhi.1), 0.0);
    }

    #[test]
    fn test_matrix_symmetry_and_travel_time() {
        let stops = vec![Stop::new("a", 0.0, 0.0), Stop::new("b", 0.0, 1.0)];
        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();

        assert_eq!(inst.len(), 2);
        assert_eq!(inst.distance(0, 0), 0.0);
        assert_eq!(inst.distance(0, 1), inst.distance(1, 0));
        // 111.195 km at 50 km/h
        let expected = inst.distance(0, 1) / 50.0 * 60.0;
        assert!((inst.travel_time(0, 1) - expected).abs() < 1e-9);
    }

    #[test]
    fn test_depot_occupies_index_zero() {
        let stops = vec![Stop::new("s1", 10.0, 10.0), Stop::new("s2", 11.0, 11.0)];
        let inst = RoutingInstance::new(&stops, Some(Depot::new(9.0, 9.0)), 50.0).unwrap();

        assert_eq!(inst.len(), 3);
        assert!(inst.has_depot());
        assert_eq!(inst.stop_id(0), "depot");
        assert_eq!(inst.stop_id(1), "s1");
        assert_eq!(inst.service_minutes(0), 0.0);
        assert_eq!(inst.effective_demand(0), 0.0);
        assert_eq!(inst.effective_demand(1), 1.0);
    }

    #[test]
    fn test_rejects_out_of_range_latitude() {
        let stops = vec![Stop::new("bad", 91.0, 0.0), Stop::new("ok", 0.0, 0.0)];
        let err = RoutingInstance::new(&stops, None, 50.0).unwrap_err();
        match err {
            OptimizeError::InvalidStop { id, .. } => assert_eq!(id, "bad"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_non_finite_coordinates() {
        let stops = vec![Stop::new("nan", f64::NAN, 0.0)];
        assert!(RoutingInstance::new(&stops, None, 50.0).is_err());

        let stops = vec![Stop::new("inf", 0.0, f64::INFINITY)];
        assert!(RoutingInstance::new(&stops, None, 50.0).is_err());
    }

    #[test]
    fn test_rejects_bad_service_and_window() {
        let mut stop = Stop::new("s", 0.0, 0.0);
        stop.service_minutes = -1.0;
        assert!(stop.validate().is_err());

        let mut stop = Stop::new("s", 0.0, 0.0);
        stop.time_window = Some(TimeWindow {
            earliest_minutes: 600.0,
            latest_minutes: 540.0,
        });
        assert!(stop.validate().is_err());

        let mut stop = Stop::new("s", 0.0, 0.0);
        stop.demand = Some(f64::NAN);
        assert!(stop.validate().is_err());
    }

    #[test]
    fn test_rejects_non_positive_speed() {
        let stops = vec![Stop::new("a", 0.0, 0.0), Stop::new("b", 1.0, 1.0)];
        assert!(RoutingInstance::new(&stops, None, 0.0).is_err());
        assert!(RoutingInstance::new(&stops, None, f64::NAN).is_err());
    }

    #[test]
    fn test_statistics() {
        let mut a = Stop::new("a", 0.0, 0.0);
        a.demand = Some(3.0);
        a.service_minutes = 5.0;
        let b = Stop::new("b", 0.0, 1.0);
        let stops = vec![a, b];

        let inst = RoutingInstance::new(&stops, None, 50.0).unwrap();
        let stats = inst.statistics();
        assert_eq!(stats.stop_count, 2);
        assert!((stats.total_demand - 4.0).abs() < 1e-12);
        assert!((stats.total_service_minutes - 5.0).abs() < 1e-12);
        assert!(stats.max_distance_km > 100.0);
    }
}
