use super::snapshot;
use codegraph_core::{AlgorithmConfig, GraphStore, NodeRef, Result};
use std::collections::HashMap;

/// A community assignment over the graph, plus the modularity score of
/// the partition it was computed from (§4.I).
#[derive(Debug, Clone, Default)]
pub struct Community {
    pub assignments: HashMap<NodeRef, usize>,
    pub modularity: f64,
}

struct Undirected {
    /// `adj[i]` = (neighbor index, combined weight), self-loops excluded.
    adj: Vec<Vec<(usize, f64)>>,
    /// Weighted degree, with self-loops counted twice as convention
    /// requires so `sum(degree) == 2m`.
    degree: Vec<f64>,
    self_loop: Vec<f64>,
    two_m: f64,
}

fn build_undirected(nodes_len: usize, directed: &[(usize, usize, f64)]) -> Undirected {
    let mut combined: HashMap<(usize, usize), f64> = HashMap::new();
    let mut self_loop = vec![0.0f64; nodes_len];

    for &(u, v, w) in directed {
        if u == v {
            self_loop[u] += w;
            continue;
        }
        let key = if u < v { (u, v) } else { (v, u) };
        *combined.entry(key).or_insert(0.0) += w;
    }

    let mut adj = vec![Vec::new(); nodes_len];
    let mut degree = vec![0.0f64; nodes_len];
    for (&(u, v), &w) in combined.iter() {
        adj[u].push((v, w));
        adj[v].push((u, w));
        degree[u] += w;
        degree[v] += w;
    }
    for i in 0..nodes_len {
        degree[i] += 2.0 * self_loop[i];
    }
    let two_m: f64 = degree.iter().sum();

    Undirected {
        adj,
        degree,
        self_loop,
        two_m,
    }
}

/// Single-level Louvain community detection (§4.I). Greedily moves each
/// node to whichever neighboring community maximizes modularity gain,
/// repeating passes until the total gain in a pass drops below
/// `louvain_min_improvement` or `louvain_max_iterations` is reached.
pub async fn louvain(store: &dyn GraphStore, config: &AlgorithmConfig) -> Result<Community> {
    let snap = snapshot(store, None).await?;
    let n = snap.len();
    if n == 0 {
        return Ok(Community::default());
    }

    let directed: Vec<(usize, usize, f64)> = snap
        .out
        .iter()
        .enumerate()
        .flat_map(|(i, edges)| edges.iter().map(move |&(j, w)| (i, j, w)))
        .collect();
    let graph = build_undirected(n, &directed);

    let mut comm_of: Vec<usize> = (0..n).collect();
    let mut comm_tot: Vec<f64> = graph.degree.clone();
    let resolution = config.louvain_resolution;
    let two_m = graph.two_m.max(f64::MIN_POSITIVE);

    for _pass in 0..config.louvain_max_iterations {
        let mut total_gain = 0.0f64;

        for i in 0..n {
            let ci = comm_of[i];
            comm_tot[ci] -= graph.degree[i];

            let mut weight_by_comm: HashMap<usize, f64> = HashMap::new();
            for &(j, w) in &graph.adj[i] {
                *weight_by_comm.entry(comm_of[j]).or_insert(0.0) += w;
            }

            let gain_of = |comm: usize, k_in: f64| -> f64 {
                k_in - resolution * comm_tot[comm] * graph.degree[i] / two_m
            };

            let mut best_comm = ci;
            let mut best_gain = gain_of(ci, *weight_by_comm.get(&ci).unwrap_or(&0.0));

            for (&comm, &k_in) in weight_by_comm.iter() {
                let gain = gain_of(comm, k_in);
                if gain > best_gain {
                    best_gain = gain;
                    best_comm = comm;
                }
            }

            comm_tot[best_comm] += graph.degree[i];
            if best_comm != ci {
                total_gain += best_gain - gain_of(ci, *weight_by_comm.get(&ci).unwrap_or(&0.0));
            }
            comm_of[i] = best_comm;
        }

        if total_gain.abs() < config.louvain_min_improvement {
            break;
        }
    }

    // Renumber communities to a dense 0..k range for a stable, compact result.
    let mut relabel: HashMap<usize, usize> = HashMap::new();
    for &c in &comm_of {
        let next = relabel.len();
        relabel.entry(c).or_insert(next);
    }
    let comm_of: Vec<usize> = comm_of.iter().map(|c| relabel[c]).collect();

    let mut internal_single = HashMap::new();
    for &(u, v, w) in &directed {
        if comm_of[u] == comm_of[v] {
            *internal_single.entry(comm_of[u]).or_insert(0.0) += w;
        }
    }
    let mut comm_tot_final: HashMap<usize, f64> = HashMap::new();
    for i in 0..n {
        *comm_tot_final.entry(comm_of[i]).or_insert(0.0) += graph.degree[i];
    }

    let modularity: f64 = comm_tot_final
        .iter()
        .map(|(c, tot)| {
            let sigma_in = 2.0 * internal_single.get(c).copied().unwrap_or(0.0);
            sigma_in / two_m - resolution * (tot / two_m).powi(2)
        })
        .sum();

    let assignments = snap
        .nodes
        .into_iter()
        .zip(comm_of)
        .collect::<HashMap<_, _>>();

    Ok(Community {
        assignments,
        modularity,
    })
}

/// Synchronous label propagation (§4.I): every node adopts the label
/// held by the plurality of its neighbors, breaking ties toward the
/// smallest label id for determinism. Runs until a full pass produces no
/// changes or `label_propagation_max_iterations` is reached.
pub async fn label_propagation(
    store: &dyn GraphStore,
    config: &AlgorithmConfig,
) -> Result<HashMap<NodeRef, usize>> {
    let snap = snapshot(store, None).await?;
    let n = snap.len();
    if n == 0 {
        return Ok(HashMap::new());
    }

    let directed: Vec<(usize, usize, f64)> = snap
        .out
        .iter()
        .enumerate()
        .flat_map(|(i, edges)| edges.iter().map(move |&(j, w)| (i, j, w)))
        .collect();
    let graph = build_undirected(n, &directed);

    let mut labels: Vec<usize> = (0..n).collect();
    for _ in 0..config.label_propagation_max_iterations {
        let mut changed = false;
        for i in 0..n {
            let mut votes: HashMap<usize, f64> = HashMap::new();
            for &(j, w) in &graph.adj[i] {
                *votes.entry(labels[j]).or_insert(0.0) += w;
            }
            if let Some((&best_label, _)) = votes
                .iter()
                .max_by(|a, b| a.1.partial_cmp(b.1).unwrap().then(b.0.cmp(a.0)))
            {
                if best_label != labels[i] {
                    labels[i] = best_label;
                    changed = true;
                }
            }
        }
        if !changed {
            break;
        }
    }

    Ok(snap
        .nodes
        .into_iter()
        .zip(labels)
        .collect::<HashMap<_, _>>())
}
