//! Forced-arc analysis.
//!
//! When a node has exactly one admissible successor besides the depot, cannot
//! return to the depot itself, and is that successor's only admissible
//! predecessor, every feasible route traverses the arc between them. Such
//! nodes are chained into visit units that the search moves as a whole.

use super::model::RoutingModel;

pub(crate) fn build_units(model: &RoutingModel) -> Vec<Vec<usize>> {
    let n = model.node_count();
    let depot = model.depot();

    let mut forced: Vec<Option<usize>> = vec![None; n];
    let mut has_forced_pred = vec![false; n];

    for u in (0..n).filter(|&u| u != depot) {
        if model.is_arc_allowed(u, depot) {
            continue;
        }
        let mut successors = (0..n).filter(|&v| v != depot && v != u && model.is_arc_allowed(u, v));
        let (Some(v), None) = (successors.next(), successors.next()) else {
            continue;
        };
        let predecessors = (0..n).filter(|&w| w != v && model.is_arc_allowed(w, v)).count();
        if predecessors == 1 && !has_forced_pred[v] {
            forced[u] = Some(v);
            has_forced_pred[v] = true;
        }
    }

    let mut visited = vec![false; n];
    visited[depot] = true;
    let mut units = Vec::new();

    let heads: Vec<usize> = (0..n).filter(|&u| u != depot && !has_forced_pred[u]).collect();
    // Forced cycles have no head; they are cut at their lowest node.
    let leftovers = (0..n).filter(|&u| u != depot);
    for head in heads.into_iter().chain(leftovers) {
        if visited[head] {
            continue;
        }
        let mut unit = Vec::new();
        let mut current = Some(head);
        while let Some(node) = current {
            if visited[node] {
                break;
            }
            visited[node] = true;
            unit.push(node);
            current = forced[node];
        }
        units.push(unit);
    }

    units
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::UNREACHABLE;

    #[test]
    fn test_split_pairs_become_units() {
        // depot 0, pairs (1,2) and (3,4): odd nodes only lead to their partner
        let mut model = RoutingModel::new(5, 1, 0).unwrap();
        let cost = model.register_transit_callback(|from, to| {
            let odd = |i: usize| i % 2 == 1;
            match (from, to) {
                (f, t) if odd(f) => if t == f + 1 { 1 } else { UNREACHABLE },
                (_, t) if t != 0 && !odd(t) => UNREACHABLE,
                _ => 10,
            }
        });
        model.set_arc_cost_evaluator_of_all_vehicles(cost).unwrap();

        let units = build_units(&model);
        assert_eq!(units, vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn test_free_nodes_are_singletons() {
        let mut model = RoutingModel::new(4, 1, 0).unwrap();
        let cost = model.register_transit_callback(|_, _| 1);
        model.set_arc_cost_evaluator_of_all_vehicles(cost).unwrap();

        assert_eq!(build_units(&model), vec![vec![1], vec![2], vec![3]]);
    }
}
