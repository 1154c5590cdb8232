//! Construction heuristics producing the starting tours every driver improves.

use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

use crate::instance::RoutingInstance;
use crate::solution::Tour;

pub trait ConstructionHeuristic {
    fn construct(&self, instance: &RoutingInstance) -> Tour;
    fn name(&self) -> &str;
}

/// Which cost a greedy construction minimizes when choosing the next stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    /// Kilometers to the candidate.
    Distance,
    /// Travel minutes to the candidate plus its on-site service time.
    Time,
}

/// Nearest-neighbor construction from position 0.
///
/// Deterministic by default: candidates are ranked by the chosen metric and
/// ties fall to the lowest index. The randomized variant picks uniformly among
/// the top `top_k` candidates and seeds population-based drivers.
pub struct NearestNeighbor {
    pub metric: Metric,
    pub randomized: bool,
    pub top_k: usize,
    pub seed: u64,
}

impl NearestNeighbor {
    pub fn new() -> Self {
        NearestNeighbor {
            metric: Metric::Distance,
            randomized: false,
            top_k: 3,
            seed: 42,
        }
    }

    /// Greedy on travel minutes and service time instead of kilometers.
    pub fn time_focused() -> Self {
        NearestNeighbor {
            metric: Metric::Time,
            ..Self::new()
        }
    }

    pub fn randomized(seed: u64) -> Self {
        NearestNeighbor {
            randomized: true,
            seed,
            ..Self::new()
        }
    }

    fn cost_to(&self, instance: &RoutingInstance, from: usize, to: usize) -> f64 {
        match self.metric {
            Metric::Distance => instance.distance(from, to),
            Metric::Time => instance.travel_time(from, to) + instance.service_minutes(to),
        }
    }

    fn find_next(
        &self,
        instance: &RoutingInstance,
        current: usize,
        visited: &[bool],
        rng: &mut ChaCha8Rng,
    ) -> Option<usize> {
        let mut candidates: Vec<(usize, f64)> = (0..instance.len())
            .filter(|&n| !visited[n])
            .map(|n| (n, self.cost_to(instance, current, n)))
            .collect();

        if candidates.is_empty() {
            return None;
        }

        // stable sort keeps ascending index on equal cost, so ties fall to
        // the lowest index
        candidates.sort_by_key(|&(_, c)| OrderedFloat(c));

        if self.randomized && candidates.len() > 1 {
            let top_k = candidates.len().min(self.top_k.max(1));
            let idx = rng.gen_range(0..top_k);
            Some(candidates[idx].0)
        } else {
            Some(candidates[0].0)
        }
    }
}

impl Default for NearestNeighbor {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for NearestNeighbor {
    fn construct(&self, instance: &RoutingInstance) -> Tour {
        let n = instance.len();
        if n == 0 {
            return Tour::new(Vec::new());
        }

        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        let mut order = Vec::with_capacity(n);
        let mut visited = vec![false; n];

        order.push(0);
        visited[0] = true;
        let mut current = 0;

        while order.len() < n {
            match self.find_next(instance, current, &visited, &mut rng) {
                Some(next) => {
                    order.push(next);
                    visited[next] = true;
                    current = next;
                }
                None => break,
            }
        }

        Tour::new(order)
    }

    fn name(&self) -> &str {
        match (self.randomized, self.metric) {
            (true, _) => "NearestNeighbor-Randomized",
            (false, Metric::Time) => "NearestNeighbor-Time",
            (false, Metric::Distance) => "NearestNeighbor",
        }
    }
}

/// Farthest-insertion construction.
///
/// Starts with the stop farthest from position 0, then repeatedly takes the
/// unvisited stop farthest from the tour and inserts it where it lengthens
/// the open path least. Produces well-spread starting tours for restarts.
pub struct FarthestInsertion;

impl FarthestInsertion {
    pub fn new() -> Self {
        FarthestInsertion
    }

    /// Cost of inserting `node` before `order[pos]`; appending costs one new leg.
    fn insertion_cost(instance: &RoutingInstance, order: &[usize], node: usize, pos: usize) -> f64 {
        if pos == order.len() {
            return instance.distance(order[order.len() - 1], node);
        }
        let prev = order[pos - 1];
        let next = order[pos];
        instance.distance(prev, node) + instance.distance(node, next)
            - instance.distance(prev, next)
    }
}

impl Default for FarthestInsertion {
    fn default() -> Self {
        Self::new()
    }
}

impl ConstructionHeuristic for FarthestInsertion {
    fn construct(&self, instance: &RoutingInstance) -> Tour {
        let n = instance.len();
        if n == 0 {
            return Tour::new(Vec::new());
        }

        let mut order = vec![0];
        let mut unvisited: Vec<usize> = (1..n).collect();

        if let Some(pos) = (0..unvisited.len())
            .max_by_key(|&k| OrderedFloat(instance.distance(0, unvisited[k])))
        {
            order.push(unvisited.swap_remove(pos));
        }

        while !unvisited.is_empty() {
            // farthest from the tour: maximize the distance to the closest
            // tour member
            let farthest_idx = (0..unvisited.len())
                .max_by_key(|&k| {
                    let node = unvisited[k];
                    let closest = order
                        .iter()
                        .map(|&t| instance.distance(t, node))
                        .fold(f64::INFINITY, f64::min);
                    OrderedFloat(closest)
                })
                .unwrap_or(0);
            let node = unvisited.swap_remove(farthest_idx);

            let best_pos = (1..=order.len())
                .min_by_key(|&pos| OrderedFloat(Self::insertion_cost(instance, &order, node, pos)))
                .unwrap_or(order.len());

            if best_pos == order.len() {
                order.push(node);
            } else {
                order.insert(best_pos, node);
            }
        }

        Tour::new(order)
    }

    fn name(&self) -> &str {
        "FarthestInsertion"
    }
}
